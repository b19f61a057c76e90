//! Dashboard handler: landing page with the classroom overview.

use axum::{extract::State, response::Html};
use chrono::{DateTime, Utc};
use classwatch_client::PollState;
use classwatch_common::format::{format_percent, format_time_ago_at};
use classwatch_common::{StudentList, Violation};

use crate::components::{icons, rule_badge, severity_badge, stat_card, status_badge, Tone};
use crate::error::ApiError;
use crate::handlers::render_page;
use crate::render::{esc, poll_notice, refresh_secs, seg};
use crate::state::SharedState;

pub const PREVIEW_ROWS: usize = 6;

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardStats {
    pub online: usize,
    pub total: usize,
    pub violations: usize,
    pub critical: usize,
    pub avg_cpu: f64,
    pub avg_ram: f64,
}

impl DashboardStats {
    pub fn compute(students: Option<&StudentList>, violations: &[Violation]) -> Self {
        let (online, total, avg_cpu, avg_ram) = match students {
            Some(list) => {
                let online: Vec<_> = list.students.iter().filter(|s| s.active).collect();
                let n = online.len();
                let avg = |f: fn(&classwatch_common::StudentSummary) -> f64| {
                    if n == 0 { 0.0 } else { online.iter().map(|s| f(s)).sum::<f64>() / n as f64 }
                };
                (list.online_count(), list.total(), avg(|s| s.cpu_usage), avg(|s| s.ram_usage))
            }
            None => (0, 0, 0.0, 0.0),
        };
        Self {
            online,
            total,
            violations: violations.len(),
            critical: violations.iter().filter(|v| v.severity.is_critical()).count(),
            avg_cpu,
            avg_ram,
        }
    }
}

pub async fn dashboard(State(state): State<SharedState>) -> Result<Html<String>, ApiError> {
    let students = state.pollers.students.snapshot();
    let violations = state.pollers.violations.snapshot();
    let polled = violations.data.as_ref().map(|v| v.violations.as_slice()).unwrap_or(&[]);
    let merged = state.alerts.read().await.merge(polled);

    let body = render_dashboard(&students, &merged, Utc::now());
    render_page(&state, "Dashboard", "/", body, Some(refresh_secs(state.config.polling.students_ms)))
}

pub fn render_dashboard(
    students: &PollState<StudentList>,
    merged: &[Violation],
    now: DateTime<Utc>,
) -> String {
    let stats = DashboardStats::compute(students.data.as_ref(), merged);

    let critical_banner = if stats.critical > 0 {
        format!(
            r#"<div class="critical-banner">{} <strong>{} critical violation(s)</strong> need attention. <a href="/alerts">Review</a></div>"#,
            icons::ALERT,
            stats.critical
        )
    } else {
        String::new()
    };

    let offline = stats.total - stats.online;
    let cards = [
        stat_card(
            icons::MONITOR,
            "Computers online",
            &format!("{} / {}", stats.online, stats.total),
            Some((&format!("{offline} offline"), Tone::Muted)),
        ),
        stat_card(icons::ALERT, "Violations", &stats.violations.to_string(), None),
        stat_card(
            icons::SHIELD,
            "Critical",
            &stats.critical.to_string(),
            Some(if stats.critical > 0 { ("Action required", Tone::Danger) } else { ("All clear", Tone::Success) }),
        ),
        stat_card(
            icons::CPU,
            "Average load",
            &format!("{}%", format_percent(stats.avg_cpu)),
            Some((&format!("RAM {}%", format_percent(stats.avg_ram)), Tone::Muted)),
        ),
    ]
    .join("\n");

    let student_rows: String = match &students.data {
        Some(list) if !list.students.is_empty() => list
            .students
            .iter()
            .take(PREVIEW_ROWS)
            .map(|s| {
                format!(
                    r#"<tr>
                <td><a href="/students/{href}" class="host-link">{host}</a></td>
                <td>{badge}</td>
                <td class="text-muted">{user}</td>
                <td>{cpu}%</td>
                <td>{ram}%</td>
                <td>{count}</td>
            </tr>"#,
                    href = seg(&s.hostname),
                    host = esc(&s.hostname),
                    badge = status_badge(s.active),
                    user = esc(&s.username),
                    cpu = format_percent(s.cpu_usage),
                    ram = format_percent(s.ram_usage),
                    count = s.violation_count,
                )
            })
            .collect(),
        Some(_) => r#"<tr><td colspan="6" class="text-center text-muted">No computers registered yet.</td></tr>"#.to_string(),
        None => String::new(),
    };

    let violation_rows: String = if merged.is_empty() {
        r#"<li class="text-muted">No violations recorded.</li>"#.to_string()
    } else {
        merged
            .iter()
            .take(PREVIEW_ROWS)
            .map(|v| {
                format!(
                    r#"<li class="violation-item">{sev} <a href="/students/{href}" class="host-link">{host}</a> {rule} <span class="detail">{detail}</span> <span class="text-muted small">{ago}</span></li>"#,
                    sev = severity_badge(v.severity),
                    href = seg(&v.hostname),
                    host = esc(&v.hostname),
                    rule = rule_badge(v.rule),
                    detail = esc(&v.detail),
                    ago = esc(&format_time_ago_at(&v.timestamp, now)),
                )
            })
            .collect()
    };

    format!(
        r#"<div class="page-header">
        <div>
            <h1 class="page-title">Dashboard</h1>
            <p class="text-muted">Live overview of the classroom</p>
        </div>
    </div>
    {notice}
    {critical_banner}
    <div class="stats-grid">
        {cards}
    </div>
    <div class="grid-2">
        <div class="card">
            <div class="card-header"><div>Computers</div><a href="/students" class="btn btn-outline btn-sm">All computers</a></div>
            <div class="table-container">
                <table class="table">
                    <thead><tr><th>Host</th><th>Status</th><th>User</th><th>CPU</th><th>RAM</th><th>Violations</th></tr></thead>
                    <tbody>{student_rows}</tbody>
                </table>
            </div>
        </div>
        <div class="card">
            <div class="card-header"><div>Recent violations</div><a href="/alerts" class="btn btn-outline btn-sm">All violations</a></div>
            <ul class="violation-list">{violation_rows}</ul>
        </div>
    </div>"#,
        notice = poll_notice(students),
    )
}
