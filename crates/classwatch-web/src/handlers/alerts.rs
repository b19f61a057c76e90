//! Violations page: polled violations with rule and hostname filters.

use axum::{
    extract::{Query, State},
    response::Html,
};
use chrono::{DateTime, Utc};
use classwatch_common::format::format_time_ago_at;
use classwatch_common::{Rule, Violation};
use serde::Deserialize;

use crate::components::{rule_badge, severity_badge};
use crate::error::ApiError;
use crate::handlers::render_page;
use crate::render::{esc, poll_notice, refresh_secs, seg};
use crate::state::SharedState;

#[derive(Debug, Default, Deserialize)]
pub struct AlertsQuery {
    /// `all`, `banned_process` or `banned_domain`.
    pub rule: Option<String>,
    pub hostname: Option<String>,
}

pub fn filter_violations<'a>(
    violations: &'a [Violation],
    rule: Option<&str>,
    hostname: Option<&str>,
) -> Vec<&'a Violation> {
    let rule = rule.filter(|r| !r.is_empty() && *r != "all");
    let hostname = hostname.map(str::trim).filter(|h| !h.is_empty());
    violations
        .iter()
        .filter(|v| rule.map_or(true, |r| v.rule.as_str() == r))
        .filter(|v| hostname.map_or(true, |h| v.hostname == h))
        .collect()
}

pub async fn alerts_page(
    State(state): State<SharedState>,
    Query(query): Query<AlertsQuery>,
) -> Result<Html<String>, ApiError> {
    let violations = state.pollers.violations.snapshot();
    let all = violations.data.as_ref().map(|v| v.violations.as_slice()).unwrap_or(&[]);
    let shown = filter_violations(all, query.rule.as_deref(), query.hostname.as_deref());

    let body = format!(
        r#"<div class="page-header">
        <div>
            <h1 class="page-title">Violations</h1>
            <p class="text-muted">{shown_count} of {total} shown</p>
        </div>
    </div>
    {notice}
    <div class="card">
        <form method="get" action="/alerts" class="filter-bar">
            <select name="rule" class="form-control">{rule_options}</select>
            <input type="text" name="hostname" value="{hostname}" placeholder="Hostname" class="form-control">
            <button type="submit" class="btn btn-outline">Filter</button>
        </form>
        <div class="table-container">
            <table class="table">
                <thead><tr><th>Severity</th><th>Host</th><th>Rule</th><th>Detail</th><th>When</th></tr></thead>
                <tbody>{rows}</tbody>
            </table>
        </div>
    </div>"#,
        shown_count = shown.len(),
        total = all.len(),
        notice = poll_notice(&violations),
        rule_options = rule_options(query.rule.as_deref()),
        hostname = esc(query.hostname.as_deref().unwrap_or("")),
        rows = violation_rows(&shown, Utc::now()),
    );

    render_page(&state, "Violations", "/alerts", body, Some(refresh_secs(state.config.polling.violations_ms)))
}

fn rule_options(current: Option<&str>) -> String {
    let current = current.unwrap_or("all");
    [("all", "All rules"), (Rule::BannedProcess.as_str(), "Processes"), (Rule::BannedDomain.as_str(), "Domains")]
        .iter()
        .map(|(value, label)| {
            let selected = if *value == current { " selected" } else { "" };
            format!(r#"<option value="{value}"{selected}>{label}</option>"#)
        })
        .collect()
}

fn violation_rows(violations: &[&Violation], now: DateTime<Utc>) -> String {
    if violations.is_empty() {
        return r#"<tr><td colspan="5" class="text-center text-muted">No violations match the filter.</td></tr>"#.to_string();
    }
    violations
        .iter()
        .map(|v| {
            format!(
                r#"<tr>
                <td>{}</td>
                <td><a href="/students/{}" class="host-link">{}</a></td>
                <td>{}</td>
                <td>{}</td>
                <td class="text-muted small">{}</td>
            </tr>"#,
                severity_badge(v.severity),
                seg(&v.hostname),
                esc(&v.hostname),
                rule_badge(v.rule),
                esc(&v.detail),
                esc(&format_time_ago_at(&v.timestamp, now)),
            )
        })
        .collect()
}
