//! classwatch-test-utils — fixtures and a fake teacher backend for tests.

pub mod backend;
pub mod fixtures;

pub use backend::{FakeBackend, RecordedRequest};
