//! In-process fake of the teacher backend.
//!
//! Serves the REST API under `/api`, the event socket at `/ws` and the
//! screen-view socket at `/ws/screen/view` on an ephemeral local port.
//! Every REST call is recorded so tests can assert on what was sent.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::{
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    extract::{RawQuery, State},
    http::{Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::{any, get},
    Json, Router,
};
use bytes::Bytes;
use classwatch_common::{StudentList, TeacherConfig, ViolationList};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

use crate::fixtures;

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub method: String,
    /// Raw request path, still percent-encoded.
    pub path: String,
    pub query: Option<String>,
    /// Parsed JSON body, `Null` when empty or not JSON.
    pub body: Value,
}

struct FakeState {
    students: StudentList,
    violations: ViolationList,
    config: Mutex<TeacherConfig>,
    requests: Mutex<Vec<RecordedRequest>>,
    failing: AtomicBool,
    event_connections: AtomicUsize,
    screen_connections: AtomicUsize,
    kick: Notify,
}

type Shared = Arc<FakeState>;

pub struct FakeBackend {
    addr: SocketAddr,
    state: Shared,
    handle: JoinHandle<()>,
}

impl FakeBackend {
    /// Start a backend seeded with the [`fixtures`] data.
    pub async fn spawn() -> Self {
        let state = Arc::new(FakeState {
            students: fixtures::sample_students(),
            violations: fixtures::sample_violations(),
            config: Mutex::new(fixtures::sample_config()),
            requests: Mutex::new(Vec::new()),
            failing: AtomicBool::new(false),
            event_connections: AtomicUsize::new(0),
            screen_connections: AtomicUsize::new(0),
            kick: Notify::new(),
        });

        let app = Router::new()
            .route("/api/{*rest}", any(rest_api))
            .route("/ws", get(events_socket))
            .route("/ws/screen/view", get(screen_socket))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind fake backend");
        let addr = listener.local_addr().expect("fake backend address");
        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!("fake backend stopped: {}", e);
            }
        });

        Self { addr, state, handle }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Origin, e.g. `http://127.0.0.1:41234`.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// REST root, `{origin}/api`.
    pub fn api_url(&self) -> String {
        format!("http://{}/api", self.addr)
    }

    pub fn ws_url(&self, path: &str) -> String {
        format!("ws://{}{}", self.addr, path)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn current_config(&self) -> TeacherConfig {
        self.state.config.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// While set, every REST call answers `503`.
    pub fn set_failing(&self, failing: bool) {
        self.state.failing.store(failing, Ordering::SeqCst);
    }

    pub fn event_connections(&self) -> usize {
        self.state.event_connections.load(Ordering::SeqCst)
    }

    pub fn screen_connections(&self) -> usize {
        self.state.screen_connections.load(Ordering::SeqCst)
    }

    /// Close every open socket from the server side.
    pub fn kick_sockets(&self) {
        self.state.kick.notify_waiters();
    }
}

impl Drop for FakeBackend {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

// ---------------------------------------------------------------------------
// REST
// ---------------------------------------------------------------------------

async fn rest_api(
    State(state): State<Shared>,
    method: Method,
    uri: Uri,
    RawQuery(query): RawQuery,
    body: Bytes,
) -> Response {
    let recorded = RecordedRequest {
        method: method.to_string(),
        path: uri.path().to_string(),
        query: query.clone(),
        body: serde_json::from_slice(&body).unwrap_or(Value::Null),
    };
    if let Ok(mut log) = state.requests.lock() {
        log.push(recorded);
    }

    if state.failing.load(Ordering::SeqCst) {
        return (StatusCode::SERVICE_UNAVAILABLE, Json(json!({"error": "backend down"}))).into_response();
    }

    let rest = uri.path().trim_start_matches("/api");
    let segments: Vec<&str> = rest.split('/').filter(|s| !s.is_empty()).collect();

    match (method.as_str(), segments.as_slice()) {
        ("GET", ["students"]) => Json(state.students.clone()).into_response(),
        ("GET", ["students", "active"]) => {
            let students: Vec<_> = state.students.students.iter().filter(|s| s.active).cloned().collect();
            Json(StudentList { count: students.len(), students }).into_response()
        }
        ("GET", ["students", hostname]) => match fixtures::sample_detail(hostname) {
            Some(detail) => Json(detail).into_response(),
            None => not_found(),
        },
        ("GET", ["violations"]) => {
            Json(filter_violations(&state.violations, query.as_deref())).into_response()
        }
        ("GET", ["config"]) => match state.config.lock() {
            Ok(config) => Json(config.clone()).into_response(),
            Err(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        },
        ("PUT", ["config"]) => match serde_json::from_slice::<TeacherConfig>(&body) {
            Ok(new_config) => {
                if let Ok(mut config) = state.config.lock() {
                    *config = new_config;
                }
                Json(json!({"ok": true})).into_response()
            }
            Err(e) => (StatusCode::BAD_REQUEST, Json(json!({"error": e.to_string()}))).into_response(),
        },
        ("POST", ["students", hostname, "lock" | "open-url"]) => {
            if state.students.find(hostname).is_some() {
                Json(json!({"ok": true})).into_response()
            } else {
                not_found()
            }
        }
        ("POST", ["broadcast", "open-url"]) => Json(json!({"ok": true})).into_response(),
        ("GET", ["apps", hostname]) => {
            if state.students.find(hostname).is_some() {
                Json(fixtures::sample_apps()).into_response()
            } else {
                not_found()
            }
        }
        _ => not_found(),
    }
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(json!({"error": "not found"}))).into_response()
}

fn filter_violations(all: &ViolationList, query: Option<&str>) -> ViolationList {
    let mut hostname = None;
    let mut count = usize::MAX;
    for (key, value) in url::form_urlencoded::parse(query.unwrap_or("").as_bytes()) {
        match key.as_ref() {
            "hostname" => hostname = Some(value.into_owned()),
            "count" => count = value.parse().unwrap_or(count),
            _ => {}
        }
    }
    ViolationList {
        violations: all
            .violations
            .iter()
            .filter(|v| hostname.as_deref().map_or(true, |h| v.hostname == h))
            .take(count)
            .cloned()
            .collect(),
    }
}

// ---------------------------------------------------------------------------
// Sockets
// ---------------------------------------------------------------------------

/// Script played on every `/ws` connection: one violation, two messages the
/// dashboard must ignore, then one notification.
pub fn event_script() -> Vec<String> {
    vec![
        json!({
            "type": "violation",
            "hostname": "pc-01",
            "rule": "banned_process",
            "detail": "steam.exe",
            "severity": "high",
            "timestamp": "2026-10-19T09:00:00Z"
        })
        .to_string(),
        "not json at all".to_string(),
        json!({"type": "heartbeat"}).to_string(),
        json!({"type": "notification", "hostname": "pc-02", "message": "agent restarted"}).to_string(),
    ]
}

/// Script played on every `/ws/screen/view` connection. Applied in order it
/// leaves `pc-01` streaming and `pc-03` waiting; `pc-02` disconnects and the
/// truncated frame is dropped.
pub fn screen_script() -> Vec<Message> {
    let mut frame = vec![5u8];
    frame.extend_from_slice(b"pc-01");
    frame.extend_from_slice(fixtures::JPEG);

    let mut control = vec![0u8];
    control.extend_from_slice(json!({"type": "student_connected", "hostname": "pc-03"}).to_string().as_bytes());

    vec![
        Message::Text(json!({"type": "student_list", "students": ["pc-01", "pc-02"]}).to_string().into()),
        Message::Binary(Bytes::from(frame)),
        Message::Binary(Bytes::from(control)),
        Message::Binary(Bytes::from_static(&[9, b'p', b'c'])),
        Message::Text(json!({"type": "student_disconnected", "hostname": "pc-02"}).to_string().into()),
    ]
}

async fn events_socket(State(state): State<Shared>, ws: WebSocketUpgrade) -> Response {
    state.event_connections.fetch_add(1, Ordering::SeqCst);
    let script = event_script().into_iter().map(|t| Message::Text(t.into())).collect();
    ws.on_upgrade(move |socket| play(socket, script, state))
}

async fn screen_socket(State(state): State<Shared>, ws: WebSocketUpgrade) -> Response {
    state.screen_connections.fetch_add(1, Ordering::SeqCst);
    ws.on_upgrade(move |socket| play(socket, screen_script(), state))
}

/// Send `script`, then echo text messages back as `echo:<text>` until the
/// peer closes or the backend kicks the socket.
async fn play(mut socket: WebSocket, script: Vec<Message>, state: Shared) {
    for msg in script {
        if socket.send(msg).await.is_err() {
            return;
        }
    }
    loop {
        tokio::select! {
            _ = state.kick.notified() => {
                let _ = socket.send(Message::Close(None)).await;
                return;
            }
            msg = socket.recv() => match msg {
                Some(Ok(Message::Text(text))) => {
                    let reply = format!("echo:{}", text.as_str());
                    if socket.send(Message::Text(reply.into())).await.is_err() {
                        return;
                    }
                }
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => return,
                Some(Ok(_)) => {}
            }
        }
    }
}
