//! classwatch-common — Shared types, errors, and display helpers used across all Classwatch crates.

pub mod error;
pub mod model;
pub mod format;

// Re-export commonly used types
pub use error::{ClasswatchError, Result};
pub use model::{
    AppsSnapshot, Application, BrowserTab, LockMode, RealtimeEvent, Rule, Screenshot, Severity,
    StudentDetail, StudentList, StudentSummary, TeacherConfig, Violation, ViolationList,
};
