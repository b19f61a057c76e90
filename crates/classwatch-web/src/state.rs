//! Shared application state for the web server.

use std::sync::Arc;

use chrono::Utc;
use classwatch_client::{
    spawn_poller, BackgroundTask, PollState, Poller, ScreenWall, SharedWall, TeacherApi,
    TeacherClient, ViolationQuery,
};
use classwatch_common::{RealtimeEvent, StudentList, TeacherConfig, ViolationList};
use classwatch_config::{Config, PollingConfig};
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, warn};

use crate::components::{MetricsHistory, RealtimeAlerts};
use crate::render::Renderer;

/// The three resources every page shares.
#[derive(Clone)]
pub struct Pollers {
    pub students: Poller<StudentList>,
    pub violations: Poller<ViolationList>,
    pub config: Poller<TeacherConfig>,
}

impl Pollers {
    /// Start live pollers. The returned tasks stop them when dropped.
    pub fn spawn(api: Arc<dyn TeacherApi>, polling: &PollingConfig) -> (Self, Vec<BackgroundTask>) {
        let students_api = api.clone();
        let (students, students_task) = spawn_poller(
            "students",
            Config::poll_interval(polling.students_ms),
            move || {
                let api = students_api.clone();
                async move { api.students().await }
            },
        );

        let violations_api = api.clone();
        let query = ViolationQuery { hostname: None, count: polling.violations_count };
        let (violations, violations_task) = spawn_poller(
            "violations",
            Config::poll_interval(polling.violations_ms),
            move || {
                let api = violations_api.clone();
                let query = query.clone();
                async move { api.violations(&query).await }
            },
        );

        let (config, config_task) = spawn_poller(
            "config",
            Config::poll_interval(polling.config_ms),
            move || {
                let api = api.clone();
                async move { api.config().await }
            },
        );

        (
            Self { students, violations, config },
            vec![students_task, violations_task, config_task],
        )
    }

    /// Pollers frozen at the given states.
    pub fn fixed(
        students: PollState<StudentList>,
        violations: PollState<ViolationList>,
        config: PollState<TeacherConfig>,
    ) -> Self {
        Self {
            students: Poller::fixed(students),
            violations: Poller::fixed(violations),
            config: Poller::fixed(config),
        }
    }
}

/// Shared state injected into every Axum handler.
pub struct AppState {
    pub config: Config,
    pub api: Arc<dyn TeacherApi>,
    /// Raw client used by the REST proxy; `None` disables proxying.
    pub forwarder: Option<TeacherClient>,
    pub pollers: Pollers,
    pub alerts: RwLock<RealtimeAlerts>,
    pub history: RwLock<MetricsHistory>,
    pub screens: SharedWall,
    /// Broadcast channel for SSE push events
    pub event_tx: broadcast::Sender<RealtimeEvent>,
    pub renderer: Renderer,
}

impl AppState {
    pub fn new(
        config: Config,
        api: Arc<dyn TeacherApi>,
        forwarder: Option<TeacherClient>,
        pollers: Pollers,
    ) -> Result<Self, minijinja::Error> {
        let (event_tx, _) = broadcast::channel(256);
        Ok(Self {
            alerts: RwLock::new(RealtimeAlerts::new(config.realtime.alert_buffer)),
            history: RwLock::new(MetricsHistory::new(config.realtime.metrics_history)),
            screens: ScreenWall::shared(),
            renderer: Renderer::new()?,
            config,
            api,
            forwarder,
            pollers,
            event_tx,
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RealtimeEvent> {
        self.event_tx.subscribe()
    }
}

pub type SharedState = Arc<AppState>;

/// Tasks that fold live data into the in-memory buffers: realtime violations
/// into the alert buffer, students polls into the metrics history.
pub fn spawn_feeders(state: &SharedState) -> Vec<BackgroundTask> {
    let alerts_state = state.clone();
    let mut events = state.subscribe();
    let alerts = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    if let Some(v) = event.as_violation() {
                        debug!(hostname = %v.hostname, "realtime violation");
                        alerts_state.alerts.write().await.push(v.clone());
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("Alert feeder lagged, skipped {} events", n);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    let history_state = state.clone();
    let mut students = state.pollers.students.subscribe();
    let history = tokio::spawn(async move {
        while students.changed().await.is_ok() {
            let fresh = {
                let snap = students.borrow_and_update();
                match (&snap.data, &snap.error) {
                    (Some(list), None) => Some(list.clone()),
                    _ => None,
                }
            };
            if let Some(list) = fresh {
                history_state.history.write().await.record(&list, Utc::now());
            }
        }
    });

    vec![
        BackgroundTask::new("alert-feeder", alerts),
        BackgroundTask::new("history-feeder", history),
    ]
}
