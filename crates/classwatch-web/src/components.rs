//! Reusable page fragments and the in-memory buffers behind them.

use std::collections::{HashMap, HashSet, VecDeque};

use chrono::{DateTime, Utc};
use classwatch_common::{Rule, Severity, StudentList, Violation};
use serde::Serialize;


pub mod icons {
    pub const DASHBOARD: &str = r#"<svg width="18" height="18" xmlns="http://www.w3.org/2000/svg" viewBox="0 0 24 24"><path d="M3 13h8V3H3v10zm0 8h8v-6H3v6zm10 0h8V11h-8v10zm0-18v6h8V3h-8z"/></svg>"#;
    pub const MONITOR: &str = r#"<svg width="18" height="18" xmlns="http://www.w3.org/2000/svg" viewBox="0 0 24 24"><path d="M21 2H3c-1.1 0-2 .9-2 2v12c0 1.1.9 2 2 2h7v2H8v2h8v-2h-2v-2h7c1.1 0 2-.9 2-2V4c0-1.1-.9-2-2-2zm0 14H3V4h18v12z"/></svg>"#;
    pub const ALERT: &str = r#"<svg width="18" height="18" xmlns="http://www.w3.org/2000/svg" viewBox="0 0 24 24"><path d="M1 21h22L12 2 1 21zm12-3h-2v-2h2v2zm0-4h-2v-4h2v4z"/></svg>"#;
    pub const ACTIVITY: &str = r#"<svg width="18" height="18" xmlns="http://www.w3.org/2000/svg" viewBox="0 0 24 24"><path d="M22 12h-4l-3 9L9 3l-3 9H2" fill="none" stroke="currentColor" stroke-width="2"/></svg>"#;
    pub const CPU: &str = r#"<svg width="18" height="18" xmlns="http://www.w3.org/2000/svg" viewBox="0 0 24 24"><path d="M15 9H9v6h6V9zm-2 4h-2v-2h2v2zm8-2V9h-2V7c0-1.1-.9-2-2-2h-2V3h-2v2h-2V3H9v2H7c-1.1 0-2 .9-2 2v2H3v2h2v2H3v2h2v2c0 1.1.9 2 2 2h2v2h2v-2h2v2h2v-2h2c1.1 0 2-.9 2-2v-2h2v-2h-2v-2h2zm-4 6H7V7h10v10z"/></svg>"#;
    pub const SCREEN: &str = r#"<svg width="18" height="18" xmlns="http://www.w3.org/2000/svg" viewBox="0 0 24 24"><path d="M20 18c1.1 0 1.99-.9 1.99-2L22 6c0-1.11-.9-2-2-2H4c-1.11 0-2 .89-2 2v10c0 1.1.89 2 2 2H0v2h24v-2h-4zM4 16V6h16v10.01L4 16zm9-6.87V7l4 3.73-4 3.74v-2.2c-2.78 0-4.61.85-6 2.72.56-2.67 2.11-5.33 6-5.86z"/></svg>"#;
    pub const SETTINGS: &str = r#"<svg width="18" height="18" xmlns="http://www.w3.org/2000/svg" viewBox="0 0 24 24"><path d="M19.14 12.94c.04-.3.06-.61.06-.94 0-.32-.02-.64-.07-.94l2.03-1.58a.49.49 0 00.12-.61l-1.92-3.32a.488.488 0 00-.59-.22l-2.39.96c-.5-.38-1.03-.7-1.62-.94l-.36-2.54a.484.484 0 00-.48-.41h-3.84c-.24 0-.43.17-.47.41l-.36 2.54c-.59.24-1.13.57-1.62.94l-2.39-.96c-.22-.08-.47 0-.59.22L2.74 8.87c-.12.21-.08.47.12.61l2.03 1.58c-.05.3-.09.63-.09.94s.02.64.07.94l-2.03 1.58a.49.49 0 00-.12.61l1.92 3.32c.12.22.37.29.59.22l2.39-.96c.5.38 1.03.7 1.62.94l.36 2.54c.05.24.24.41.48.41h3.84c.24 0 .44-.17.47-.41l.36-2.54c.59-.24 1.13-.56 1.62-.94l2.39.96c.22.08.47 0 .59-.22l1.92-3.32c.12-.22.07-.47-.12-.61l-2.01-1.58zM12 15.6c-1.98 0-3.6-1.62-3.6-3.6s1.62-3.6 3.6-3.6 3.6 1.62 3.6 3.6-1.62 3.6-3.6 3.6z"/></svg>"#;
    pub const SHIELD: &str = r#"<svg width="18" height="18" xmlns="http://www.w3.org/2000/svg" viewBox="0 0 24 24"><path d="M12 1L3 5v6c0 5.55 3.84 10.74 9 12 5.16-1.26 9-6.45 9-12V5l-9-4z"/></svg>"#;
}

// ── Stat cards and badges ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Success,
    Warning,
    Danger,
    Muted,
}

impl Tone {
    pub fn class(&self) -> &'static str {
        match self {
            Tone::Success => "text-success",
            Tone::Warning => "text-warning",
            Tone::Danger => "text-danger",
            Tone::Muted => "text-muted",
        }
    }
}

/// `value` and `sub` are inserted as-is; escape backend text before passing it.
pub fn stat_card(icon: &str, label: &str, value: &str, sub: Option<(&str, Tone)>) -> String {
    let sub_html = match sub {
        Some((text, tone)) => format!(r#"<div class="stat-sub {}">{}</div>"#, tone.class(), text),
        None => String::new(),
    };
    format!(
        r#"<div class="stat-card">
            <div class="stat-label">{icon}<span>{label}</span></div>
            <div class="stat-value">{value}</div>
            {sub_html}
        </div>"#
    )
}

pub fn severity_badge(severity: Severity) -> &'static str {
    match severity {
        Severity::High => r#"<span class="badge badge-danger">Critical</span>"#,
        Severity::Medium => r#"<span class="badge badge-warning">Medium</span>"#,
        Severity::Low => r#"<span class="badge badge-outline">Low</span>"#,
        Severity::Unknown => r#"<span class="badge badge-outline">Warning</span>"#,
    }
}

pub fn rule_badge(rule: Rule) -> String {
    let class = match rule {
        Rule::BannedProcess => "badge-process",
        Rule::BannedDomain => "badge-domain",
        Rule::Other => "badge-outline",
    };
    format!(r#"<span class="badge {}">{}</span>"#, class, rule.label())
}

pub fn status_badge(active: bool) -> &'static str {
    if active {
        r#"<span class="badge badge-success">Online</span>"#
    } else {
        r#"<span class="badge badge-outline">Offline</span>"#
    }
}

// ── Realtime alert buffer ─────────────────────────────────────────────────────

/// Violations pushed over the event socket, newest first.
#[derive(Debug, Clone)]
pub struct RealtimeAlerts {
    cap: usize,
    items: VecDeque<Violation>,
}

impl RealtimeAlerts {
    pub fn new(cap: usize) -> Self {
        Self { cap, items: VecDeque::with_capacity(cap) }
    }

    pub fn push(&mut self, violation: Violation) {
        self.items.push_front(violation);
        self.items.truncate(self.cap);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Realtime alerts followed by `polled`, keeping the first occurrence of
    /// each `hostname:timestamp` key.
    pub fn merge(&self, polled: &[Violation]) -> Vec<Violation> {
        let mut seen = HashSet::new();
        self.items
            .iter()
            .chain(polled.iter())
            .filter(|v| seen.insert(v.dedup_key()))
            .cloned()
            .collect()
    }
}

// ── Metrics history + chart ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Sample {
    pub at: DateTime<Utc>,
    pub cpu: f64,
    pub ram: f64,
}

/// Per-host ring of CPU/RAM samples, fed from the students poller.
#[derive(Debug, Clone)]
pub struct MetricsHistory {
    cap: usize,
    hosts: HashMap<String, VecDeque<Sample>>,
}

impl MetricsHistory {
    pub fn new(cap: usize) -> Self {
        Self { cap, hosts: HashMap::new() }
    }

    /// One sample per online host. Hosts no longer in the list lose their ring;
    /// listed offline hosts keep theirs.
    pub fn record(&mut self, students: &StudentList, at: DateTime<Utc>) {
        self.hosts.retain(|hostname, _| students.find(hostname).is_some());
        for s in students.students.iter().filter(|s| s.active) {
            let ring = self.hosts.entry(s.hostname.clone()).or_default();
            ring.push_back(Sample { at, cpu: s.cpu_usage, ram: s.ram_usage });
            while ring.len() > self.cap {
                ring.pop_front();
            }
        }
    }

    pub fn host_count(&self) -> usize {
        self.hosts.len()
    }

    pub fn samples(&self, hostname: &str) -> Vec<Sample> {
        self.hosts
            .get(hostname)
            .map(|ring| ring.iter().copied().collect())
            .unwrap_or_default()
    }
}

pub const CHART_POINTS: usize = 30;

const CHART_W: f64 = 600.0;
const CHART_H: f64 = 200.0;
const PAD_LEFT: f64 = 40.0;
const PAD_TOP: f64 = 10.0;
const PAD_BOTTOM: f64 = 20.0;

fn chart_points(samples: &[Sample], value: impl Fn(&Sample) -> f64) -> String {
    let plot_w = CHART_W - PAD_LEFT - 10.0;
    let plot_h = CHART_H - PAD_TOP - PAD_BOTTOM;
    let step = if samples.len() > 1 { plot_w / (samples.len() - 1) as f64 } else { 0.0 };

    samples
        .iter()
        .enumerate()
        .map(|(i, s)| {
            let x = if samples.len() > 1 { PAD_LEFT + step * i as f64 } else { PAD_LEFT + plot_w / 2.0 };
            let v = value(s).clamp(0.0, 100.0);
            let y = PAD_TOP + plot_h * (1.0 - v / 100.0);
            format!("{x:.1},{y:.1}")
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Inline SVG of CPU and RAM for the last [`CHART_POINTS`] samples, y axis
/// fixed to 0..100 %.
pub fn metrics_chart(samples: &[Sample]) -> String {
    if samples.is_empty() {
        return r#"<div class="chart-empty text-muted">No samples yet</div>"#.to_string();
    }
    let recent = &samples[samples.len().saturating_sub(CHART_POINTS)..];
    let plot_h = CHART_H - PAD_TOP - PAD_BOTTOM;

    let grid: String = [0.0, 25.0, 50.0, 75.0, 100.0]
        .iter()
        .map(|pct: &f64| {
            let y = PAD_TOP + plot_h * (1.0 - pct / 100.0);
            format!(
                r##"<line x1="{PAD_LEFT}" y1="{y:.1}" x2="{:.1}" y2="{y:.1}" stroke="#e5e7eb" stroke-dasharray="3 3"/><text x="4" y="{:.1}" class="chart-tick">{pct}%</text>"##,
                CHART_W - 10.0,
                y + 4.0
            )
        })
        .collect();

    let first = recent[0].at.format("%H:%M");
    let last = recent[recent.len() - 1].at.format("%H:%M");

    format!(
        r##"<svg class="metrics-chart" viewBox="0 0 {CHART_W} {CHART_H}" preserveAspectRatio="none" xmlns="http://www.w3.org/2000/svg">
    {grid}
    <polyline class="series-cpu" fill="none" stroke="#3b82f6" stroke-width="2" points="{cpu}"/>
    <polyline class="series-ram" fill="none" stroke="#22c55e" stroke-width="2" points="{ram}"/>
    <text x="{PAD_LEFT}" y="{bottom}" class="chart-tick">{first}</text>
    <text x="{right}" y="{bottom}" class="chart-tick" text-anchor="end">{last}</text>
</svg>
<div class="chart-legend"><span class="legend-cpu">CPU (%)</span><span class="legend-ram">RAM (%)</span></div>"##,
        cpu = chart_points(recent, |s| s.cpu),
        ram = chart_points(recent, |s| s.ram),
        bottom = CHART_H - 4.0,
        right = CHART_W - 10.0,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use classwatch_common::StudentSummary;
    use pretty_assertions::assert_eq;

    fn v(host: &str, ts: &str) -> Violation {
        Violation {
            hostname: host.into(),
            rule: Rule::BannedDomain,
            detail: "vk.com".into(),
            severity: Severity::Medium,
            timestamp: ts.into(),
        }
    }

    #[test]
    fn test_alert_buffer_caps_and_orders_newest_first() {
        let mut alerts = RealtimeAlerts::new(50);
        for i in 0..60 {
            alerts.push(v("pc-01", &format!("t{i}")));
        }
        assert_eq!(alerts.len(), 50);
        let merged = alerts.merge(&[]);
        assert_eq!(merged[0].timestamp, "t59");
        assert_eq!(merged[49].timestamp, "t10");
    }

    #[test]
    fn test_merge_dedups_on_host_and_timestamp() {
        let mut alerts = RealtimeAlerts::new(50);
        let mut live = v("pc-01", "t2");
        live.severity = Severity::High;
        alerts.push(live);

        let polled = vec![v("pc-01", "t2"), v("pc-02", "t2"), v("pc-01", "t1")];
        let merged = alerts.merge(&polled);

        let keys: Vec<String> = merged.iter().map(|v| v.dedup_key()).collect();
        assert_eq!(keys, vec!["pc-01:t2", "pc-02:t2", "pc-01:t1"]);
        assert_eq!(merged[0].severity, Severity::High, "first occurrence wins");
    }

    fn list(cpu: f64) -> StudentList {
        let mk = |host: &str, active| StudentSummary {
            hostname: host.into(),
            active,
            os: String::new(),
            username: String::new(),
            ip: String::new(),
            port: 0,
            last_seen: None,
            cpu_usage: cpu,
            ram_usage: 50.0,
            violation_count: 0,
        };
        StudentList { count: 2, students: vec![mk("pc-01", true), mk("pc-02", false)] }
    }

    #[test]
    fn test_history_ring_is_capped_and_skips_offline_hosts() {
        let mut history = MetricsHistory::new(3);
        let t0 = Utc.with_ymd_and_hms(2026, 10, 19, 9, 0, 0).unwrap();
        for i in 0..5 {
            history.record(&list(i as f64 * 10.0), t0 + chrono::Duration::seconds(i));
        }
        let samples = history.samples("pc-01");
        assert_eq!(samples.len(), 3);
        assert_eq!(samples[0].cpu, 20.0);
        assert_eq!(samples[2].cpu, 40.0);
        assert!(history.samples("pc-02").is_empty());
    }

    #[test]
    fn test_history_forgets_hosts_that_leave_the_list() {
        let mut history = MetricsHistory::new(3);
        let t0 = Utc.with_ymd_and_hms(2026, 10, 19, 9, 0, 0).unwrap();
        history.record(&list(10.0), t0);
        assert_eq!(history.host_count(), 1);

        // Still listed but offline: the ring survives.
        let mut offline = list(10.0);
        offline.students[0].active = false;
        history.record(&offline, t0 + chrono::Duration::seconds(5));
        assert_eq!(history.samples("pc-01").len(), 1);

        let mut gone = list(10.0);
        gone.students.retain(|s| s.hostname != "pc-01");
        history.record(&gone, t0 + chrono::Duration::seconds(10));
        assert!(history.samples("pc-01").is_empty());
        assert_eq!(history.host_count(), 0);
    }

    #[test]
    fn test_chart_uses_last_thirty_points_and_clamps() {
        let t0 = Utc.with_ymd_and_hms(2026, 10, 19, 9, 0, 0).unwrap();
        let samples: Vec<Sample> = (0..40)
            .map(|i| Sample { at: t0 + chrono::Duration::seconds(i), cpu: 150.0, ram: -5.0 })
            .collect();
        let svg = metrics_chart(&samples);

        let cpu_line = svg.lines().find(|l| l.contains("series-cpu")).unwrap();
        let points = cpu_line.split("points=\"").nth(1).unwrap().trim_end_matches("\"/>");
        assert_eq!(points.split(' ').count(), CHART_POINTS);
        // 150 % clamps to the top of the plot area.
        assert!(points.starts_with("40.0,10.0"));

        let ram_line = svg.lines().find(|l| l.contains("series-ram")).unwrap();
        assert!(ram_line.contains("40.0,180.0"), "negative values clamp to 0 %");
    }

    #[test]
    fn test_chart_without_samples() {
        assert!(metrics_chart(&[]).contains("No samples yet"));
    }

    #[test]
    fn test_stat_card_sub_line() {
        let html = stat_card(icons::MONITOR, "Online", "2 / 3", Some(("1 offline", Tone::Muted)));
        assert!(html.contains("2 / 3"));
        assert!(html.contains(r#"class="stat-sub text-muted""#));
    }
}
