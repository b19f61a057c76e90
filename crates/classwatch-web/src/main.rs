//! Classwatch dashboard server
//!
//! Run with: cargo run -p classwatch-web

use std::sync::Arc;

use anyhow::Context;
use classwatch_client::{EventStream, ScreenRelay, TeacherApi, TeacherClient};
use classwatch_config::Config;
use classwatch_web::router::build_router;
use classwatch_web::state::{spawn_feeders, AppState, Pollers};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("classwatch=debug,info")),
        )
        .init();

    info!("Starting Classwatch dashboard...");

    let config = Config::load().context("loading configuration")?;
    let api_base = config.api_base()?;
    let events_url = config.events_ws_url()?;
    let screen_url = config.screen_ws_url()?;
    info!("Teacher backend: {}", api_base);

    let client = TeacherClient::new(api_base)?;
    let api: Arc<dyn TeacherApi> = Arc::new(client.clone());

    let (pollers, mut tasks) = Pollers::spawn(api.clone(), &config.polling);
    let state = Arc::new(AppState::new(config.clone(), api, Some(client), pollers)?);
    tasks.extend(spawn_feeders(&state));

    tasks.push(
        EventStream::new(events_url, state.event_tx.clone())
            .with_reconnect_delay(Config::poll_interval(config.realtime.events_reconnect_ms))
            .spawn(),
    );
    tasks.push(
        ScreenRelay::new(screen_url, state.screens.clone())
            .with_reconnect_delay(Config::poll_interval(config.realtime.screen_reconnect_ms))
            .spawn(),
    );
    info!("Started {} background tasks", tasks.len());

    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.server.bind)
        .await
        .with_context(|| format!("binding {}", config.server.bind))?;
    info!("Server listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    drop(tasks);
    info!("Classwatch stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}
