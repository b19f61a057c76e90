//! Data model of the teacher backend API.
//! Every type here is a read-only view rebuilt from each poll response; the
//! only value the dashboard writes back is [`TeacherConfig`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ClasswatchError;

// ---------------------------------------------------------------------------
// Students
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentSummary {
    pub hostname: String,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub os: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub ip: String,
    #[serde(default)]
    pub port: u16,
    #[serde(default)]
    pub last_seen: Option<String>,
    #[serde(default)]
    pub cpu_usage: f64,
    #[serde(default)]
    pub ram_usage: f64,
    #[serde(default)]
    pub violation_count: u64,
}

/// `GET /students` and `GET /students/active`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StudentList {
    #[serde(default)]
    pub count: usize,
    #[serde(default)]
    pub students: Vec<StudentSummary>,
}

impl StudentList {
    /// Number of students currently reporting as active.
    pub fn online_count(&self) -> usize {
        self.students.iter().filter(|s| s.active).count()
    }

    pub fn total(&self) -> usize {
        self.students.len()
    }

    pub fn find(&self, hostname: &str) -> Option<&StudentSummary> {
        self.students.iter().find(|s| s.hostname == hostname)
    }
}

// ---------------------------------------------------------------------------
// Violations
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    BannedProcess,
    BannedDomain,
    #[default]
    #[serde(other)]
    Other,
}

impl Rule {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rule::BannedProcess => "banned_process",
            Rule::BannedDomain => "banned_domain",
            Rule::Other => "other",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Rule::BannedProcess => "Process",
            Rule::BannedDomain => "Domain",
            Rule::Other => "Other",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    High,
    Medium,
    Low,
    #[default]
    #[serde(other)]
    Unknown,
}

impl Severity {
    /// `high` is critical; every other level renders as a warning.
    pub fn is_critical(&self) -> bool {
        matches!(self, Severity::High)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    pub hostname: String,
    #[serde(default)]
    pub rule: Rule,
    #[serde(default)]
    pub detail: String,
    #[serde(default)]
    pub severity: Severity,
    #[serde(default)]
    pub timestamp: String,
}

impl Violation {
    /// Identity used when merging realtime alerts with polled violations.
    pub fn dedup_key(&self) -> String {
        format!("{}:{}", self.hostname, self.timestamp)
    }
}

/// `GET /violations`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ViolationList {
    #[serde(default)]
    pub violations: Vec<Violation>,
}

// ---------------------------------------------------------------------------
// Applications / browser tabs / screenshots
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub pid: u32,
    pub name: String,
    #[serde(default)]
    pub memory_mb: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrowserTab {
    #[serde(default)]
    pub browser: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
}

/// `GET /apps/:hostname`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppsSnapshot {
    #[serde(default)]
    pub applications: Vec<Application>,
    #[serde(default)]
    pub browser_tabs: Vec<BrowserTab>,
}

impl AppsSnapshot {
    /// Applications sorted by resident memory, largest first.
    pub fn by_memory_desc(&self) -> Vec<&Application> {
        let mut apps: Vec<&Application> = self.applications.iter().collect();
        apps.sort_by(|a, b| b.memory_mb.total_cmp(&a.memory_mb));
        apps
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Screenshot {
    pub image_url: String,
    #[serde(default)]
    pub timestamp: String,
}

/// `GET /students/:hostname`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentDetail {
    pub summary: StudentSummary,
    #[serde(default)]
    pub apps: Option<AppsSnapshot>,
    #[serde(default)]
    pub violations: Vec<Violation>,
    #[serde(default)]
    pub screenshot: Option<Screenshot>,
}

// ---------------------------------------------------------------------------
// Config + commands
// ---------------------------------------------------------------------------

/// Backend config object. Overwritten wholesale by `PUT /config`, so keys the
/// dashboard does not model are carried through in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TeacherConfig {
    #[serde(default)]
    pub banned_processes: Vec<String>,
    #[serde(default)]
    pub banned_domains: Vec<String>,
    #[serde(default)]
    pub sau_mode: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TeacherConfig {
    /// Case-insensitive match against `banned_processes`, ignoring a
    /// trailing `.exe` on either side.
    pub fn is_banned_process(&self, name: &str) -> bool {
        let needle = normalise_process_name(name);
        self.banned_processes
            .iter()
            .any(|banned| normalise_process_name(banned) == needle)
    }
}

fn normalise_process_name(name: &str) -> String {
    let lower = name.trim().to_lowercase();
    match lower.strip_suffix(".exe") {
        Some(stem) => stem.to_string(),
        None => lower,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LockMode {
    Soft,
    Hard,
}

impl LockMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            LockMode::Soft => "soft",
            LockMode::Hard => "hard",
        }
    }
}

impl std::str::FromStr for LockMode {
    type Err = ClasswatchError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim() {
            "soft" => Ok(LockMode::Soft),
            "hard" => Ok(LockMode::Hard),
            other => Err(ClasswatchError::InvalidInput(format!("unknown lock mode '{other}'"))),
        }
    }
}

// ---------------------------------------------------------------------------
// Realtime events
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    #[serde(default)]
    pub hostname: Option<String>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// Messages pushed on the backend event socket. Only these two types are
/// accepted; anything else is dropped by [`RealtimeEvent::parse`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RealtimeEvent {
    Violation(Violation),
    Notification(Notification),
}

impl RealtimeEvent {
    /// Parse one text message. Non-JSON input and unknown `type`s yield `None`.
    pub fn parse(text: &str) -> Option<Self> {
        serde_json::from_str(text).ok()
    }

    pub fn as_violation(&self) -> Option<&Violation> {
        match self {
            RealtimeEvent::Violation(v) => Some(v),
            RealtimeEvent::Notification(_) => None,
        }
    }
}
