//! classwatch-web — Classroom monitoring dashboard
//! Provides a server-rendered UI over the teacher backend with:
//!   - Classroom overview and per-computer detail
//!   - Violations feed and activity timeline
//!   - Process inventory with banned-process flags
//!   - Live screen grid
//!   - Monitoring rule settings and remote commands

pub mod components;
pub mod error;
pub mod handlers;
pub mod render;
pub mod router;
pub mod sse;
pub mod state;
