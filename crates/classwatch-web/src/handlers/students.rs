//! Computers list and per-student detail pages.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use classwatch_common::format::{format_percent, format_time_ago_at};
use classwatch_common::{ClasswatchError, StudentDetail, StudentList, StudentSummary};
use serde::Deserialize;
use tracing::warn;

use crate::components::{icons, metrics_chart, rule_badge, severity_badge, stat_card, status_badge, Sample};
use crate::error::ApiError;
use crate::handlers::render_page;
use crate::render::{esc, flash, poll_notice, refresh_secs, seg};
use crate::state::SharedState;

pub const DETAIL_PROCESS_ROWS: usize = 20;
pub const DETAIL_VIOLATION_ROWS: usize = 10;

// ── Computers list ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatusFilter {
    #[default]
    All,
    Online,
    Offline,
}

impl StatusFilter {
    /// Missing, empty or unknown values fall back to `All`.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some("online") => StatusFilter::Online,
            Some("offline") => StatusFilter::Offline,
            _ => StatusFilter::All,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct StudentsQuery {
    pub q: Option<String>,
    pub show: Option<String>,
    pub status: Option<String>,
    pub level: Option<String>,
}

/// Case-insensitive search on hostname, username and IP, then the status filter.
pub fn filter_students<'a>(
    list: &'a StudentList,
    search: &str,
    show: StatusFilter,
) -> Vec<&'a StudentSummary> {
    let needle = search.trim().to_lowercase();
    list.students
        .iter()
        .filter(|s| {
            needle.is_empty()
                || s.hostname.to_lowercase().contains(&needle)
                || s.username.to_lowercase().contains(&needle)
                || s.ip.to_lowercase().contains(&needle)
        })
        .filter(|s| match show {
            StatusFilter::All => true,
            StatusFilter::Online => s.active,
            StatusFilter::Offline => !s.active,
        })
        .collect()
}

pub async fn students_page(
    State(state): State<SharedState>,
    Query(query): Query<StudentsQuery>,
) -> Result<Html<String>, ApiError> {
    let students = state.pollers.students.snapshot();
    let search = query.q.clone().unwrap_or_default();
    let show = StatusFilter::parse(query.show.as_deref());
    let now = Utc::now();

    let (header, rows) = match &students.data {
        Some(list) => {
            let matched = filter_students(list, &search, show);
            let rows: String = if matched.is_empty() {
                r#"<tr><td colspan="8" class="text-center text-muted">No computers match the filter.</td></tr>"#.to_string()
            } else {
                matched.iter().map(|s| student_row(s, now)).collect()
            };
            (format!("{} of {} online", list.online_count(), list.total()), rows)
        }
        None => (String::new(), String::new()),
    };

    let option = |value: &str, label: &str, current: StatusFilter, this: StatusFilter| {
        let selected = if current == this { " selected" } else { "" };
        format!(r#"<option value="{value}"{selected}>{label}</option>"#)
    };

    let body = format!(
        r#"<div class="page-header">
        <div>
            <h1 class="page-title">Computers</h1>
            <p class="text-muted">{header}</p>
        </div>
    </div>
    {flash}
    {notice}
    <div class="card">
        <form method="get" action="/students" class="filter-bar">
            <input type="search" name="q" value="{search}" placeholder="Search by host, user or IP" class="form-control">
            <select name="show" class="form-control">
                {all}{online}{offline}
            </select>
            <button type="submit" class="btn btn-outline">Filter</button>
        </form>
        <div class="table-container">
            <table class="table">
                <thead><tr><th>Host</th><th>Status</th><th>User</th><th>OS</th><th>IP</th><th>CPU / RAM</th><th>Violations</th><th>Last seen</th></tr></thead>
                <tbody>{rows}</tbody>
            </table>
        </div>
    </div>
    <div class="card">
        <div class="card-header"><div>Open a page on every computer</div></div>
        <form method="post" action="/broadcast/open-url" class="inline-form">
            <input type="url" name="url" placeholder="https://" class="form-control">
            <button type="submit" class="btn btn-primary">Send to all</button>
        </form>
    </div>"#,
        flash = flash(query.status.as_deref(), query.level.as_deref()),
        notice = poll_notice(&students),
        search = esc(&search),
        all = option("all", "All", show, StatusFilter::All),
        online = option("online", "Online", show, StatusFilter::Online),
        offline = option("offline", "Offline", show, StatusFilter::Offline),
    );

    render_page(&state, "Computers", "/students", body, Some(refresh_secs(state.config.polling.students_ms)))
}

fn student_row(s: &StudentSummary, now: DateTime<Utc>) -> String {
    let last_seen = s
        .last_seen
        .as_deref()
        .map(|ts| format_time_ago_at(ts, now))
        .unwrap_or_else(|| "never".to_string());
    format!(
        r#"<tr>
            <td><a href="/students/{href}" class="host-link">{host}</a></td>
            <td>{badge}</td>
            <td>{user}</td>
            <td class="text-muted">{os}</td>
            <td class="mono">{ip}</td>
            <td>{cpu}% / {ram}%</td>
            <td>{count}</td>
            <td class="text-muted small">{last_seen}</td>
        </tr>"#,
        href = seg(&s.hostname),
        host = esc(&s.hostname),
        badge = status_badge(s.active),
        user = esc(&s.username),
        os = esc(&s.os),
        ip = esc(&s.ip),
        cpu = format_percent(s.cpu_usage),
        ram = format_percent(s.ram_usage),
        count = s.violation_count,
        last_seen = esc(&last_seen),
    )
}

// ── Student detail ────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct DetailQuery {
    pub status: Option<String>,
    pub level: Option<String>,
}

pub async fn student_detail(
    State(state): State<SharedState>,
    Path(hostname): Path<String>,
    Query(query): Query<DetailQuery>,
) -> Result<Response, ApiError> {
    let path = format!("/students/{}", seg(&hostname));
    match state.api.student_detail(&hostname).await {
        Ok(detail) => {
            let history = state.history.read().await.samples(&hostname);
            let body = render_detail(
                &detail,
                &history,
                &state.config.server.proxy_prefix,
                &flash(query.status.as_deref(), query.level.as_deref()),
                state.config.polling.detail_ms,
                Utc::now(),
            );
            Ok(render_page(&state, &detail.summary.hostname, &path, body, None)?.into_response())
        }
        Err(e) => {
            warn!(hostname = %hostname, error = %e, "student detail fetch failed");
            let err = ClasswatchError::from(e);
            let code = match err {
                ClasswatchError::StudentNotFound(_) => StatusCode::NOT_FOUND,
                _ => StatusCode::BAD_GATEWAY,
            };
            let body = format!(
                r#"<div class="card notice-error">
            <p>{}</p>
            <a href="/students" class="btn btn-outline">Back to computers</a>
        </div>"#,
                esc(&err.user_message())
            );
            Ok((code, render_page(&state, &hostname, &path, body, None)?).into_response())
        }
    }
}

/// Backend-relative screenshot paths are served through the REST proxy.
pub fn screenshot_src(image_url: &str, proxy_prefix: &str) -> String {
    match image_url.strip_prefix("/api/") {
        Some(rest) => format!("{}/{}", proxy_prefix.trim_end_matches('/'), rest),
        None => image_url.to_string(),
    }
}

pub fn render_detail(
    detail: &StudentDetail,
    history: &[Sample],
    proxy_prefix: &str,
    flash_html: &str,
    refresh_ms: u64,
    now: DateTime<Utc>,
) -> String {
    let s = &detail.summary;
    let host_seg = seg(&s.hostname);
    let apps = detail.apps.clone().unwrap_or_default();

    let cards = [
        stat_card(icons::CPU, "CPU", &format!("{}%", format_percent(s.cpu_usage)), None),
        stat_card(icons::MONITOR, "RAM", &format!("{}%", format_percent(s.ram_usage)), None),
        stat_card(icons::DASHBOARD, "Applications", &apps.applications.len().to_string(), None),
        stat_card(icons::ALERT, "Violations", &s.violation_count.to_string(), None),
    ]
    .join("\n");

    let screenshot = match &detail.screenshot {
        Some(shot) => format!(
            r#"<div class="card">
            <div class="card-header"><div>Screenshot</div><span class="text-muted small">{ago}</span></div>
            <img class="screenshot" src="{src}" alt="Screenshot of {host}">
        </div>"#,
            ago = esc(&format_time_ago_at(&shot.timestamp, now)),
            src = esc(&screenshot_src(&shot.image_url, proxy_prefix)),
            host = esc(&s.hostname),
        ),
        None => String::new(),
    };

    let process_rows: String = {
        let sorted = apps.by_memory_desc();
        if sorted.is_empty() {
            r#"<tr><td colspan="3" class="text-center text-muted">No applications reported.</td></tr>"#.to_string()
        } else {
            sorted
                .into_iter()
                .take(DETAIL_PROCESS_ROWS)
                .map(|a| {
                    format!(
                        r#"<tr><td>{}</td><td class="mono">{}</td><td>{:.1} MB</td></tr>"#,
                        esc(&a.name),
                        a.pid,
                        a.memory_mb
                    )
                })
                .collect()
        }
    };

    let violation_rows: String = if detail.violations.is_empty() {
        r#"<li class="text-muted">No violations for this computer.</li>"#.to_string()
    } else {
        detail
            .violations
            .iter()
            .take(DETAIL_VIOLATION_ROWS)
            .map(|v| {
                format!(
                    r#"<li class="violation-item">{} {} <span class="detail">{}</span> <span class="text-muted small">{}</span></li>"#,
                    severity_badge(v.severity),
                    rule_badge(v.rule),
                    esc(&v.detail),
                    esc(&format_time_ago_at(&v.timestamp, now)),
                )
            })
            .collect()
    };

    let tab_rows: String = if apps.browser_tabs.is_empty() {
        r#"<tr><td colspan="3" class="text-center text-muted">No open tabs.</td></tr>"#.to_string()
    } else {
        apps.browser_tabs
            .iter()
            .map(|t| {
                format!(
                    r#"<tr><td>{}</td><td>{}</td><td class="mono small">{}</td></tr>"#,
                    esc(&t.browser),
                    esc(&t.title),
                    esc(&t.url)
                )
            })
            .collect()
    };

    let last_seen = s
        .last_seen
        .as_deref()
        .map(|ts| format_time_ago_at(ts, now))
        .unwrap_or_else(|| "never".to_string());

    format!(
        r#"<div class="page-header">
        <div>
            <a href="/students" class="text-muted small">&larr; Computers</a>
            <h1 class="page-title">{host} {badge}</h1>
            <p class="text-muted">{user} · {os} · <span class="mono">{ip}:{port}</span> · last seen {last_seen}</p>
        </div>
        <div class="d-flex gap-3">
            <form method="post" action="/students/{host_seg}/lock"><input type="hidden" name="mode" value="soft"><button class="btn btn-outline">Soft lock</button></form>
            <form method="post" action="/students/{host_seg}/lock"><input type="hidden" name="mode" value="hard"><button class="btn btn-danger">Hard lock</button></form>
        </div>
    </div>
    {flash_html}
    <div class="stats-grid">
        {cards}
    </div>
    <div class="grid-2">
        <div class="card">
            <div class="card-header"><div>CPU and RAM history</div></div>
            {chart}
        </div>
        <div class="card">
            <div class="card-header"><div>Open a page</div></div>
            <form method="post" action="/students/{host_seg}/open-url" class="inline-form">
                <input type="url" name="url" placeholder="https://" class="form-control">
                <button type="submit" class="btn btn-primary">Open</button>
            </form>
        </div>
    </div>
    {screenshot}
    <div class="grid-2">
        <div class="card">
            <div class="card-header"><div>Processes</div><span class="text-muted small">top {DETAIL_PROCESS_ROWS} by memory</span></div>
            <table class="table">
                <thead><tr><th>Name</th><th>PID</th><th>Memory</th></tr></thead>
                <tbody>{process_rows}</tbody>
            </table>
        </div>
        <div class="card">
            <div class="card-header"><div>Latest violations</div></div>
            <ul class="violation-list">{violation_rows}</ul>
        </div>
    </div>
    <div class="card">
        <div class="card-header"><div>Browser tabs</div></div>
        <table class="table">
            <thead><tr><th>Browser</th><th>Title</th><th>URL</th></tr></thead>
            <tbody>{tab_rows}</tbody>
        </table>
    </div>
    <script>
    setInterval(function () {{
        var el = document.activeElement;
        if (el && el.tagName === 'INPUT') return;
        location.reload();
    }}, {refresh_ms});
    </script>"#,
        host = esc(&s.hostname),
        badge = status_badge(s.active),
        user = esc(&s.username),
        os = esc(&s.os),
        ip = esc(&s.ip),
        port = s.port,
        last_seen = esc(&last_seen),
        chart = metrics_chart(history),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use classwatch_common::{AppsSnapshot, Application, Rule, Severity, Violation};
    use pretty_assertions::assert_eq;

    fn summary(host: &str, user: &str, ip: &str, active: bool) -> StudentSummary {
        StudentSummary {
            hostname: host.into(),
            active,
            os: "Windows 11".into(),
            username: user.into(),
            ip: ip.into(),
            port: 9000,
            last_seen: None,
            cpu_usage: 10.0,
            ram_usage: 20.0,
            violation_count: 0,
        }
    }

    fn list() -> StudentList {
        StudentList {
            count: 3,
            students: vec![
                summary("PC-Lab-01", "aigerim", "10.0.0.11", true),
                summary("pc-lab-02", "daniyar", "10.0.0.12", false),
                summary("teacher-pc", "admin", "10.0.1.1", true),
            ],
        }
    }

    #[test]
    fn test_search_is_case_insensitive_across_fields() {
        let list = list();
        let hosts = |found: Vec<&StudentSummary>| found.iter().map(|s| s.hostname.clone()).collect::<Vec<_>>();

        assert_eq!(hosts(filter_students(&list, "pc-lab", StatusFilter::All)), vec!["PC-Lab-01", "pc-lab-02"]);
        assert_eq!(hosts(filter_students(&list, "DANIYAR", StatusFilter::All)), vec!["pc-lab-02"]);
        assert_eq!(hosts(filter_students(&list, "10.0.1.", StatusFilter::All)), vec!["teacher-pc"]);
        assert_eq!(filter_students(&list, "", StatusFilter::All).len(), 3);
    }

    #[test]
    fn test_status_filter() {
        let list = list();
        assert_eq!(filter_students(&list, "", StatusFilter::Online).len(), 2);
        let offline = filter_students(&list, "lab", StatusFilter::Offline);
        assert_eq!(offline.len(), 1);
        assert_eq!(offline[0].hostname, "pc-lab-02");
    }

    #[test]
    fn test_status_filter_parse_falls_back_to_all() {
        assert_eq!(StatusFilter::parse(Some("online")), StatusFilter::Online);
        assert_eq!(StatusFilter::parse(Some("offline")), StatusFilter::Offline);
        assert_eq!(StatusFilter::parse(Some("")), StatusFilter::All);
        assert_eq!(StatusFilter::parse(Some("asleep")), StatusFilter::All);
        assert_eq!(StatusFilter::parse(None), StatusFilter::All);
    }

    #[test]
    fn test_screenshot_src_goes_through_proxy() {
        assert_eq!(screenshot_src("/api/screenshots/pc-01.jpg", "/api/teacher"), "/api/teacher/screenshots/pc-01.jpg");
        assert_eq!(screenshot_src("http://cdn.lan/x.jpg", "/api/teacher"), "http://cdn.lan/x.jpg");
    }

    #[test]
    fn test_detail_limits_and_orders_rows() {
        let applications = (0..25)
            .map(|i| Application { pid: i, name: format!("app-{i:02}"), memory_mb: i as f64 })
            .collect();
        let violations = (0..12)
            .map(|i| Violation {
                hostname: "pc-01".into(),
                rule: Rule::BannedDomain,
                detail: format!("site-{i:02}.com"),
                severity: Severity::Low,
                timestamp: String::new(),
            })
            .collect();
        let detail = StudentDetail {
            summary: summary("pc-01", "u", "10.0.0.1", true),
            apps: Some(AppsSnapshot { applications, browser_tabs: vec![] }),
            violations,
            screenshot: None,
        };

        let html = render_detail(&detail, &[], "/api/teacher", "", 3000, Utc::now());
        assert!(html.contains("app-24"));
        assert!(html.contains("app-05"));
        assert!(!html.contains("app-04"), "only the 20 largest processes are listed");
        assert!(html.find("app-24").unwrap() < html.find("app-23").unwrap());
        assert!(html.contains("site-09.com"));
        assert!(!html.contains("site-10.com"));
        assert!(html.contains("}, 3000);"));
    }
}
