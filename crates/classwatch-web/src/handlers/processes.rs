//! Processes page: running applications of every online computer.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    response::Html,
};
use classwatch_client::TeacherApi;
use classwatch_common::{AppsSnapshot, Application, TeacherConfig};
use futures_util::future::join_all;
use serde::Deserialize;
use tracing::debug;

use crate::error::ApiError;
use crate::handlers::render_page;
use crate::render::{esc, poll_notice, refresh_secs, seg};
use crate::state::SharedState;

#[derive(Debug, Default, Deserialize)]
pub struct ProcessesQuery {
    pub host: Option<String>,
    /// Checkbox; any non-empty value enables it.
    pub banned: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProcessRow {
    pub hostname: String,
    pub app: Application,
    pub banned: bool,
}

/// Fetch `/apps/:hostname` for every host concurrently. Hosts whose fetch
/// fails are left out.
pub async fn collect_apps(api: Arc<dyn TeacherApi>, hosts: Vec<String>) -> Vec<(String, AppsSnapshot)> {
    let fetches = hosts.into_iter().map(|host| {
        let api = api.clone();
        async move {
            match api.apps(&host).await {
                Ok(apps) => Some((host, apps)),
                Err(e) => {
                    debug!(hostname = %host, error = %e, "skipping apps");
                    None
                }
            }
        }
    });
    join_all(fetches).await.into_iter().flatten().collect()
}

/// Flatten, flag and sort (memory descending).
pub fn build_rows(snapshots: &[(String, AppsSnapshot)], config: Option<&TeacherConfig>) -> Vec<ProcessRow> {
    let mut rows: Vec<ProcessRow> = snapshots
        .iter()
        .flat_map(|(host, snap)| {
            snap.applications.iter().map(move |app| ProcessRow {
                hostname: host.clone(),
                app: app.clone(),
                banned: config.is_some_and(|c| c.is_banned_process(&app.name)),
            })
        })
        .collect();
    rows.sort_by(|a, b| b.app.memory_mb.total_cmp(&a.app.memory_mb));
    rows
}

pub async fn processes_page(
    State(state): State<SharedState>,
    Query(query): Query<ProcessesQuery>,
) -> Result<Html<String>, ApiError> {
    let students = state.pollers.students.snapshot();
    let config = state.pollers.config.snapshot();

    let hosts: Vec<String> = students
        .data
        .as_ref()
        .map(|list| list.students.iter().filter(|s| s.active).map(|s| s.hostname.clone()).collect())
        .unwrap_or_default();

    let snapshots = collect_apps(state.api.clone(), hosts.clone()).await;
    let rows = build_rows(&snapshots, config.data.as_ref());

    let host_filter = query.host.as_deref().filter(|h| !h.is_empty());
    let banned_only = query.banned.as_deref().is_some_and(|b| !b.is_empty());
    let in_host: Vec<&ProcessRow> = rows
        .iter()
        .filter(|r| host_filter.map_or(true, |h| r.hostname == h))
        .collect();
    let banned_count = in_host.iter().filter(|r| r.banned).count();
    let shown: Vec<&ProcessRow> = in_host.into_iter().filter(|r| !banned_only || r.banned).collect();

    let host_options: String = std::iter::once(String::from(r#"<option value="">All computers</option>"#))
        .chain(hosts.iter().map(|h| {
            let selected = if host_filter == Some(h.as_str()) { " selected" } else { "" };
            format!(r#"<option value="{0}"{selected}>{0}</option>"#, esc(h))
        }))
        .collect();

    let table_rows: String = if shown.is_empty() {
        r#"<tr><td colspan="4" class="text-center text-muted">No processes to show.</td></tr>"#.to_string()
    } else {
        shown
            .iter()
            .map(|r| {
                format!(
                    r#"<tr class="{class}">
                <td><a href="/students/{href}" class="host-link">{host}</a></td>
                <td>{name} {flag}</td>
                <td class="mono">{pid}</td>
                <td>{mem:.1} MB</td>
            </tr>"#,
                    class = if r.banned { "row-banned" } else { "" },
                    href = seg(&r.hostname),
                    host = esc(&r.hostname),
                    name = esc(&r.app.name),
                    flag = if r.banned { r#"<span class="badge badge-danger">Banned</span>"# } else { "" },
                    pid = r.app.pid,
                    mem = r.app.memory_mb,
                )
            })
            .collect()
    };

    let body = format!(
        r#"<div class="page-header">
        <div>
            <h1 class="page-title">Processes</h1>
            <p class="text-muted">{total} processes on {hosts} computers · <span class="text-danger">{banned_count} banned</span></p>
        </div>
    </div>
    {notice}
    <div class="card">
        <form method="get" action="/processes" class="filter-bar">
            <select name="host" class="form-control">{host_options}</select>
            <label class="checkbox-container"><input type="checkbox" name="banned" value="1"{checked}> Banned only</label>
            <button type="submit" class="btn btn-outline">Filter</button>
        </form>
        <div class="table-container">
            <table class="table">
                <thead><tr><th>Host</th><th>Process</th><th>PID</th><th>Memory</th></tr></thead>
                <tbody>{table_rows}</tbody>
            </table>
        </div>
    </div>"#,
        total = rows.len(),
        hosts = snapshots.len(),
        notice = poll_notice(&students),
        checked = if banned_only { " checked" } else { "" },
    );

    render_page(&state, "Processes", "/processes", body, Some(refresh_secs(state.config.polling.students_ms)))
}
