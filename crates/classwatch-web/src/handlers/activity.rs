//! Activity timeline: violations and connection events, newest first.

use axum::{extract::State, response::Html};
use chrono::{DateTime, Utc};
use classwatch_common::format::{format_time_ago_at, parse_timestamp};
use classwatch_common::{StudentList, Violation};

use crate::components::{rule_badge, severity_badge};
use crate::error::ApiError;
use crate::handlers::render_page;
use crate::render::{esc, poll_notice, refresh_secs, seg};
use crate::state::SharedState;

#[derive(Debug, Clone, PartialEq)]
pub enum ActivityKind {
    Violation(Violation),
    Connected,
    Disconnected,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActivityEvent {
    pub hostname: String,
    /// Raw backend timestamp, shown as-is when it does not parse.
    pub timestamp: String,
    pub at: Option<DateTime<Utc>>,
    pub kind: ActivityKind,
}

/// Merge violations with one connection event per student. Events without
/// a parsable timestamp sort last.
pub fn build_timeline(students: Option<&StudentList>, violations: &[Violation]) -> Vec<ActivityEvent> {
    let mut events: Vec<ActivityEvent> = violations
        .iter()
        .map(|v| ActivityEvent {
            hostname: v.hostname.clone(),
            timestamp: v.timestamp.clone(),
            at: parse_timestamp(&v.timestamp),
            kind: ActivityKind::Violation(v.clone()),
        })
        .collect();

    if let Some(list) = students {
        events.extend(list.students.iter().map(|s| {
            let timestamp = s.last_seen.clone().unwrap_or_default();
            ActivityEvent {
                hostname: s.hostname.clone(),
                at: parse_timestamp(&timestamp),
                timestamp,
                kind: if s.active { ActivityKind::Connected } else { ActivityKind::Disconnected },
            }
        }));
    }

    // Stable sort keeps backend order among equal timestamps.
    events.sort_by(|a, b| b.at.cmp(&a.at));
    events
}

pub async fn activity_page(State(state): State<SharedState>) -> Result<Html<String>, ApiError> {
    let students = state.pollers.students.snapshot();
    let violations = state.pollers.violations.snapshot();
    let polled = violations.data.as_ref().map(|v| v.violations.as_slice()).unwrap_or(&[]);
    let timeline = build_timeline(students.data.as_ref(), polled);
    let now = Utc::now();

    let items: String = if timeline.is_empty() {
        r#"<li class="text-muted">No activity yet.</li>"#.to_string()
    } else {
        timeline.iter().map(|e| timeline_item(e, now)).collect()
    };

    let body = format!(
        r#"<div class="page-header">
        <div>
            <h1 class="page-title">Activity</h1>
            <p class="text-muted">Connections and violations across the classroom</p>
        </div>
    </div>
    {students_notice}
    {violations_notice}
    <div class="card">
        <ul class="timeline">{items}</ul>
    </div>"#,
        students_notice = poll_notice(&students),
        violations_notice = poll_notice(&violations),
    );

    render_page(&state, "Activity", "/activity", body, Some(refresh_secs(state.config.polling.violations_ms)))
}

fn timeline_item(event: &ActivityEvent, now: DateTime<Utc>) -> String {
    let (dot, what) = match &event.kind {
        ActivityKind::Violation(v) => (
            "dot-danger",
            format!("{} {} <span class=\"detail\">{}</span>", severity_badge(v.severity), rule_badge(v.rule), esc(&v.detail)),
        ),
        ActivityKind::Connected => ("dot-success", "connected".to_string()),
        ActivityKind::Disconnected => ("dot-muted", "disconnected".to_string()),
    };
    let when = if event.timestamp.is_empty() {
        String::new()
    } else {
        format_time_ago_at(&event.timestamp, now)
    };
    format!(
        r#"<li class="timeline-item"><span class="dot {dot}"></span><a href="/students/{href}" class="host-link">{host}</a> {what} <span class="text-muted small">{when}</span></li>"#,
        href = seg(&event.hostname),
        host = esc(&event.hostname),
        when = esc(&when),
    )
}
