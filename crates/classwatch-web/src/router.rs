//! Axum router — maps all URL paths to handlers.

use axum::{
    routing::{any, get, post},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::CorsLayer,
    services::ServeDir,
    trace::TraceLayer,
};

use crate::handlers::{
    activity::activity_page,
    alerts::alerts_page,
    commands::{broadcast_open_url, lock_student, open_url},
    dashboard::dashboard,
    processes::processes_page,
    proxy::{proxy_rest, ws_events, ws_screens},
    screens::{api_screens, screen_frame, screen_fullscreen, screens_page},
    settings::{settings_page, settings_save},
    students::{student_detail, students_page},
    system::health,
};
use crate::sse::sse_handler;
use crate::state::SharedState;

/// Build and return the full Axum router.
pub fn build_router(state: SharedState) -> Router {
    let proxy_route = format!(
        "{}/{{*path}}",
        state.config.server.proxy_prefix.trim_end_matches('/')
    );
    let static_dir = ServeDir::new(&state.config.server.static_dir);

    Router::new()
        // Pages
        .route("/",                             get(dashboard))
        .route("/students",                     get(students_page))
        .route("/students/{hostname}",          get(student_detail))
        .route("/alerts",                       get(alerts_page))
        .route("/activity",                     get(activity_page))
        .route("/processes",                    get(processes_page))
        .route("/screens",                      get(screens_page))
        .route("/screens/{hostname}",           get(screen_fullscreen))
        .route("/screens/{hostname}/frame.jpg", get(screen_frame))
        .route("/settings",                     get(settings_page).post(settings_save))

        // Commands
        .route("/students/{hostname}/lock",     post(lock_student))
        .route("/students/{hostname}/open-url", post(open_url))
        .route("/broadcast/open-url",           post(broadcast_open_url))

        // SSE streaming
        .route("/api/events", get(sse_handler))

        // API endpoints
        .route("/api/screens", get(api_screens))
        .route("/health",      get(health))

        // Backend passthrough
        .route(&proxy_route,      any(proxy_rest))
        .route("/ws",             get(ws_events))
        .route("/ws/screen/view", get(ws_screens))

        // Static files
        .nest_service("/static", static_dir)

        // Middleware
        .layer(CorsLayer::permissive())
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
