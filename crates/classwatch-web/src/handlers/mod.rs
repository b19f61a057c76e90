//! HTTP handlers for all web routes.

pub mod activity;
pub mod alerts;
pub mod commands;
pub mod dashboard;
pub mod processes;
pub mod proxy;
pub mod screens;
pub mod settings;
pub mod students;
pub mod system;

use axum::response::Html;
use serde::Deserialize;

use crate::error::ApiError;
use crate::render::Page;
use crate::state::AppState;

/// Flash parameters appended by the command redirects.
#[derive(Debug, Default, Deserialize)]
pub struct Flash {
    pub status: Option<String>,
    pub level: Option<String>,
}

impl Flash {
    pub fn html(&self) -> String {
        crate::render::flash(self.status.as_deref(), self.level.as_deref())
    }
}

pub(crate) fn render_page(
    state: &AppState,
    title: &str,
    path: &str,
    body: String,
    refresh: Option<u64>,
) -> Result<Html<String>, ApiError> {
    Ok(Html(state.renderer.page(Page { title, path, body, refresh })?))
}
