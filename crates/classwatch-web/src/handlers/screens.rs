//! Live screen grid, fullscreen view and the per-host JPEG endpoint.

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::error::ApiError;
use crate::handlers::render_page;
use crate::render::{esc, seg};
use crate::state::SharedState;

/// How often the browser re-requests tile images.
const FRAME_REFRESH_MS: u64 = 1_000;
/// Full grid reload, picks up tiles added or removed since the last render.
const GRID_REFRESH_SECS: u64 = 10;

pub async fn screens_page(State(state): State<SharedState>) -> Result<Html<String>, ApiError> {
    let wall = state.screens.read().await;

    let status = if wall.is_connected() {
        r#"<span class="badge badge-success">Connected</span>"#
    } else {
        r#"<span class="badge badge-outline">Connecting…</span>"#
    };

    let tiles: String = if wall.is_empty() {
        r#"<div class="card text-center text-muted">No computers are streaming yet.</div>"#.to_string()
    } else {
        wall.tiles()
            .map(|tile| {
                let img = if tile.frame.is_some() {
                    format!(
                        r#"<img class="live-frame" data-src="/screens/{}/frame.jpg" src="/screens/{}/frame.jpg" alt="">"#,
                        seg(&tile.hostname),
                        seg(&tile.hostname)
                    )
                } else {
                    r#"<div class="tile-waiting text-muted">Waiting for frames…</div>"#.to_string()
                };
                format!(
                    r#"<a class="screen-tile" href="/screens/{href}">
                {img}
                <div class="tile-caption">{host}</div>
            </a>"#,
                    href = seg(&tile.hostname),
                    host = esc(&tile.hostname),
                )
            })
            .collect()
    };

    let body = format!(
        r#"<div class="page-header">
        <div>
            <h1 class="page-title">Screens</h1>
            <p class="text-muted">{status} {streaming} of {total} streaming</p>
        </div>
    </div>
    <div class="screen-grid">{tiles}</div>
    {script}"#,
        streaming = wall.streaming_count(),
        total = wall.len(),
        script = frame_refresh_script(),
    );
    drop(wall);

    render_page(&state, "Screens", "/screens", body, Some(GRID_REFRESH_SECS))
}

fn frame_refresh_script() -> String {
    format!(
        r#"<script>
    setInterval(function () {{
        document.querySelectorAll('img.live-frame').forEach(function (img) {{
            img.src = img.dataset.src + '?t=' + Date.now();
        }});
    }}, {FRAME_REFRESH_MS});
    </script>"#
    )
}

pub async fn screen_fullscreen(
    State(state): State<SharedState>,
    Path(hostname): Path<String>,
) -> Result<Response, ApiError> {
    let known = state.screens.read().await.tile(&hostname).is_some();
    let path = format!("/screens/{}", seg(&hostname));
    let content = if known {
        format!(
            r#"<img class="live-frame fullscreen-frame" data-src="/screens/{0}/frame.jpg" src="/screens/{0}/frame.jpg" alt="Screen of {1}">"#,
            seg(&hostname),
            esc(&hostname)
        )
    } else {
        r#"<div class="card text-center text-muted">This computer is not streaming.</div>"#.to_string()
    };
    let body = format!(
        r#"<div class="page-header">
        <div>
            <a href="/screens" class="text-muted small">&larr; Screens</a>
            <h1 class="page-title">{host}</h1>
        </div>
        <a href="/students/{href}" class="btn btn-outline">Computer details</a>
    </div>
    <div class="fullscreen">{content}</div>
    {script}"#,
        host = esc(&hostname),
        href = seg(&hostname),
        script = frame_refresh_script(),
    );
    let page = render_page(&state, &hostname, &path, body, None)?;
    let code = if known { StatusCode::OK } else { StatusCode::NOT_FOUND };
    Ok((code, page).into_response())
}

/// Latest JPEG for `hostname`; 404 when the host has no frame yet.
pub async fn screen_frame(
    State(state): State<SharedState>,
    Path(hostname): Path<String>,
) -> Response {
    let frame = state
        .screens
        .read()
        .await
        .tile(&hostname)
        .and_then(|tile| tile.frame.clone());

    match frame {
        Some(jpeg) => (
            [(header::CONTENT_TYPE, "image/jpeg"), (header::CACHE_CONTROL, "no-store")],
            jpeg,
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// JSON snapshot of the grid.
pub async fn api_screens(State(state): State<SharedState>) -> Json<serde_json::Value> {
    let wall = state.screens.read().await;
    Json(json!({
        "connected": wall.is_connected(),
        "streaming": wall.streaming_count(),
        "tiles": wall.snapshot(),
    }))
}
