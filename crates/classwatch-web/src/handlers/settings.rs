//! Settings page: banned processes, banned domains and SAU mode.

use axum::{
    extract::{Query, State},
    response::{Html, Redirect},
    Form,
};
use classwatch_common::{ClasswatchError, TeacherConfig};
use serde::Deserialize;
use tracing::{info, warn};

use crate::error::ApiError;
use crate::handlers::commands::redirect_with;
use crate::handlers::{render_page, Flash};
use crate::render::{esc, poll_notice};
use crate::state::{AppState, SharedState};

#[derive(Debug, Default, Deserialize)]
pub struct SettingsForm {
    #[serde(default)]
    pub banned_processes: String,
    #[serde(default)]
    pub banned_domains: String,
    /// Present only when the checkbox is ticked.
    pub sau_mode: Option<String>,
}

/// One entry per line; surrounding whitespace trimmed, blank lines dropped.
pub fn parse_lines(raw: &str) -> Vec<String> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect()
}

impl SettingsForm {
    /// Apply the form on top of `base`, keeping keys the form does not edit.
    pub fn apply(&self, base: TeacherConfig) -> TeacherConfig {
        TeacherConfig {
            banned_processes: parse_lines(&self.banned_processes),
            banned_domains: parse_lines(&self.banned_domains),
            sau_mode: self.sau_mode.as_deref().is_some_and(|v| !v.is_empty()),
            ..base
        }
    }
}

/// The backend config to edit: the poller's copy, or a direct fetch when the
/// poller has nothing yet. Never a default, since `PUT /config` replaces the
/// whole object.
async fn current_config(state: &AppState) -> Result<TeacherConfig, ClasswatchError> {
    if let Some(config) = state.pollers.config.snapshot().data {
        return Ok(config);
    }
    Ok(state.api.config().await?)
}

pub async fn settings_page(
    State(state): State<SharedState>,
    Query(flash): Query<Flash>,
) -> Result<Html<String>, ApiError> {
    let (current, disabled, notice) = match current_config(&state).await {
        Ok(current) => {
            // Only the stale strip applies; a fresh direct fetch needs no notice.
            let snapshot = state.pollers.config.snapshot();
            let notice = if snapshot.data.is_some() { poll_notice(&snapshot) } else { String::new() };
            (current, "", notice)
        }
        Err(e) => {
            warn!(error = %e, "settings unavailable");
            let notice = format!(r#"<div class="card notice-error">{}</div>"#, esc(&e.user_message()));
            (TeacherConfig::default(), " disabled", notice)
        }
    };

    let body = format!(
        r#"<div class="page-header">
        <div>
            <h1 class="page-title">Settings</h1>
            <p class="text-muted">Monitoring rules pushed to every computer</p>
        </div>
    </div>
    {flash}
    {notice}
    <form method="post" action="/settings" class="settings-grid">
        <div class="card">
            <div class="settings-section-title">Banned processes</div>
            <textarea name="banned_processes" rows="8" class="form-control mono">{processes}</textarea>
            <p class="help-text">One process name per line, e.g. <code>steam.exe</code>. Matching ignores case and the .exe suffix.</p>
        </div>
        <div class="card">
            <div class="settings-section-title">Banned domains</div>
            <textarea name="banned_domains" rows="8" class="form-control mono">{domains}</textarea>
            <p class="help-text">One domain per line, e.g. <code>vk.com</code>.</p>
        </div>
        <div class="card">
            <label class="checkbox-container"><input type="checkbox" name="sau_mode" value="on"{sau}> SAU mode</label>
            <p class="help-text">Runs the exam companion process on student computers.</p>
            <button type="submit" class="btn btn-primary"{disabled}>Save</button>
        </div>
    </form>"#,
        flash = flash.html(),
        processes = esc(&current.banned_processes.join("\n")),
        domains = esc(&current.banned_domains.join("\n")),
        sau = if current.sau_mode { " checked" } else { "" },
    );

    render_page(&state, "Settings", "/settings", body, None)
}

pub async fn settings_save(
    State(state): State<SharedState>,
    Form(form): Form<SettingsForm>,
) -> Redirect {
    let base = match current_config(&state).await {
        Ok(base) => base,
        Err(e) => {
            warn!(error = %e, "config save skipped, current config unknown");
            return redirect_with("/settings", &format!("Save failed: {}", e.user_message()), false);
        }
    };
    let updated = form.apply(base);

    match state.api.put_config(&updated).await {
        Ok(()) => {
            info!(
                processes = updated.banned_processes.len(),
                domains = updated.banned_domains.len(),
                sau_mode = updated.sau_mode,
                "config saved"
            );
            state.pollers.config.refetch();
            redirect_with("/settings", "Settings saved", true)
        }
        Err(e) => {
            warn!(error = %e, "config save failed");
            let err: ClasswatchError = e.into();
            redirect_with("/settings", &format!("Save failed: {}", err.user_message()), false)
        }
    }
}
