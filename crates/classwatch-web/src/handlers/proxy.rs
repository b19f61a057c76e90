//! Same-origin proxy to the teacher backend.
//!
//! `ANY {proxy_prefix}/*path` is relayed to `{backend}/api/*path`, and the
//! `/ws` and `/ws/screen/view` sockets are piped to their backend
//! counterparts frame by frame.

use axum::{
    body::Bytes,
    extract::ws::{self, WebSocket, WebSocketUpgrade},
    extract::State,
    http::{header, HeaderValue, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
};
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::{
    connect_async,
    tungstenite::protocol::{frame::coding::CloseCode, CloseFrame, Message as UpstreamMessage},
};
use tracing::{debug, info, warn};
use url::Url;

use crate::error::ApiError;
use crate::state::SharedState;

pub async fn proxy_rest(
    State(state): State<SharedState>,
    method: Method,
    uri: Uri,
    headers: axum::http::HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let prefix = state.config.server.proxy_prefix.trim_end_matches('/');
    let tail = uri.path().strip_prefix(prefix).unwrap_or(uri.path());

    let Some(forwarder) = &state.forwarder else {
        return Err(ApiError::Upstream("proxy disabled".to_string()));
    };

    let content_type = headers.get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok());
    debug!(%method, tail, "proxying");
    let upstream = forwarder
        .forward(method, tail, uri.query(), content_type, body)
        .await?;

    let status = StatusCode::from_u16(upstream.status).unwrap_or(StatusCode::BAD_GATEWAY);
    let mut response = (status, upstream.body).into_response();
    let response_headers = response.headers_mut();
    match upstream.content_type.as_deref().and_then(|ct| HeaderValue::from_str(ct).ok()) {
        Some(ct) => {
            response_headers.insert(header::CONTENT_TYPE, ct);
        }
        None => {
            response_headers.remove(header::CONTENT_TYPE);
        }
    }
    Ok(response)
}

pub async fn ws_events(
    State(state): State<SharedState>,
    ws: WebSocketUpgrade,
) -> Result<Response, ApiError> {
    let upstream = state
        .config
        .events_ws_url()
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(ws.on_upgrade(move |socket| pipe(socket, upstream)))
}

pub async fn ws_screens(
    State(state): State<SharedState>,
    ws: WebSocketUpgrade,
) -> Result<Response, ApiError> {
    let upstream = state
        .config
        .screen_ws_url()
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(ws.on_upgrade(move |socket| pipe(socket, upstream)))
}

/// Relay frames both ways until either side closes.
async fn pipe(mut browser: WebSocket, upstream: Url) {
    let remote = match connect_async(upstream.as_str()).await {
        Ok((remote, _response)) => remote,
        Err(e) => {
            warn!("Passthrough to {} failed: {}", upstream, e);
            let _ = browser.send(ws::Message::Close(None)).await;
            return;
        }
    };
    info!("Passthrough opened: {}", upstream);

    let (mut browser_tx, mut browser_rx) = browser.split();
    let (mut remote_tx, mut remote_rx) = remote.split();

    let browser_to_backend = async {
        while let Some(Ok(msg)) = browser_rx.next().await {
            let closing = matches!(msg, ws::Message::Close(_));
            if remote_tx.send(to_upstream(msg)).await.is_err() || closing {
                break;
            }
        }
    };
    let backend_to_browser = async {
        while let Some(Ok(msg)) = remote_rx.next().await {
            let Some(msg) = to_browser(msg) else { continue };
            let closing = matches!(msg, ws::Message::Close(_));
            if browser_tx.send(msg).await.is_err() || closing {
                break;
            }
        }
    };

    tokio::select! {
        _ = browser_to_backend => {}
        _ = backend_to_browser => {}
    }
    info!("Passthrough closed: {}", upstream);
}

fn to_upstream(msg: ws::Message) -> UpstreamMessage {
    match msg {
        ws::Message::Text(text) => UpstreamMessage::Text(text.as_str().to_string().into()),
        ws::Message::Binary(data) => UpstreamMessage::Binary(data),
        ws::Message::Ping(data) => UpstreamMessage::Ping(data),
        ws::Message::Pong(data) => UpstreamMessage::Pong(data),
        ws::Message::Close(frame) => UpstreamMessage::Close(frame.map(|f| CloseFrame {
            code: CloseCode::from(f.code),
            reason: f.reason.as_str().to_string().into(),
        })),
    }
}

fn to_browser(msg: UpstreamMessage) -> Option<ws::Message> {
    Some(match msg {
        UpstreamMessage::Text(text) => ws::Message::Text(text.as_str().to_string().into()),
        UpstreamMessage::Binary(data) => ws::Message::Binary(data),
        UpstreamMessage::Ping(data) => ws::Message::Ping(data),
        UpstreamMessage::Pong(data) => ws::Message::Pong(data),
        UpstreamMessage::Close(frame) => ws::Message::Close(frame.map(|f| ws::CloseFrame {
            code: u16::from(f.code),
            reason: f.reason.as_str().to_string().into(),
        })),
        UpstreamMessage::Frame(_) => return None,
    })
}
