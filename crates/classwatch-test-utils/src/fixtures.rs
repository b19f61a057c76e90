//! Canned backend data. Three hosts: `pc-01` and `pc-02` online, `pc-03`
//! offline since the morning.

use classwatch_common::{
    AppsSnapshot, Application, BrowserTab, Rule, Screenshot, Severity, StudentDetail, StudentList,
    StudentSummary, TeacherConfig, Violation, ViolationList,
};
use serde_json::json;

pub fn student(hostname: &str, active: bool, cpu: f64, ram: f64) -> StudentSummary {
    StudentSummary {
        hostname: hostname.to_string(),
        active,
        os: "Windows 11".to_string(),
        username: format!("user-{hostname}"),
        ip: "10.10.64.20".to_string(),
        port: 9000,
        last_seen: Some("2026-10-19T08:00:00Z".to_string()),
        cpu_usage: cpu,
        ram_usage: ram,
        violation_count: 0,
    }
}

pub fn sample_students() -> StudentList {
    let mut students = vec![
        student("pc-01", true, 40.0, 60.0),
        student("pc-02", true, 20.0, 30.0),
        student("pc-03", false, 0.0, 0.0),
    ];
    students[0].violation_count = 2;
    students[0].ip = "10.10.64.21".to_string();
    students[1].ip = "10.10.64.22".to_string();
    students[2].ip = "10.10.64.23".to_string();
    students[2].last_seen = Some("2026-10-19T07:15:00Z".to_string());
    StudentList { count: students.len(), students }
}

pub fn violation(hostname: &str, rule: Rule, detail: &str, severity: Severity, ts: &str) -> Violation {
    Violation {
        hostname: hostname.to_string(),
        rule,
        detail: detail.to_string(),
        severity,
        timestamp: ts.to_string(),
    }
}

pub fn sample_violations() -> ViolationList {
    ViolationList {
        violations: vec![
            violation("pc-01", Rule::BannedProcess, "steam.exe", Severity::High, "2026-10-19T08:30:00Z"),
            violation("pc-01", Rule::BannedDomain, "vk.com", Severity::Medium, "2026-10-19T08:20:00Z"),
            violation("pc-02", Rule::BannedDomain, "youtube.com", Severity::Low, "2026-10-19T08:10:00Z"),
        ],
    }
}

pub fn sample_apps() -> AppsSnapshot {
    AppsSnapshot {
        applications: vec![
            Application { pid: 101, name: "chrome.exe".into(), memory_mb: 512.0 },
            Application { pid: 202, name: "steam.exe".into(), memory_mb: 300.5 },
            Application { pid: 303, name: "notepad.exe".into(), memory_mb: 12.0 },
        ],
        browser_tabs: vec![BrowserTab {
            browser: "chrome".into(),
            title: "Lesson 4 <intro>".into(),
            url: "https://school.lan/lesson/4".into(),
        }],
    }
}

pub fn sample_detail(hostname: &str) -> Option<StudentDetail> {
    let summary = sample_students().find(hostname)?.clone();
    let violations = sample_violations()
        .violations
        .into_iter()
        .filter(|v| v.hostname == hostname)
        .collect();
    Some(StudentDetail {
        summary,
        apps: Some(sample_apps()),
        violations,
        screenshot: Some(Screenshot {
            image_url: format!("/api/screenshots/{hostname}.jpg"),
            timestamp: "2026-10-19T08:31:00Z".into(),
        }),
    })
}

/// Includes a key the dashboard does not model, to check it survives a PUT.
pub fn sample_config() -> TeacherConfig {
    let mut extra = serde_json::Map::new();
    extra.insert("scan_interval".to_string(), json!(3));
    TeacherConfig {
        banned_processes: vec!["steam.exe".into(), "Discord".into()],
        banned_domains: vec!["vk.com".into(), "youtube.com".into()],
        sau_mode: false,
        extra,
    }
}

/// A tiny but well-formed JPEG (SOI + EOI).
pub const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xD9];
