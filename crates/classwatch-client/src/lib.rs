//! classwatch-client — everything that talks to the teacher backend.
//!
//!   - `api`    — REST calls behind the `TeacherApi` trait
//!   - `poll`   — fixed-interval pollers publishing `PollState` snapshots
//!   - `events` — realtime violation/notification socket
//!   - `screen` — live screen relay: frame codec, wall state, relay task

pub mod api;
pub mod error;
pub mod events;
pub mod poll;
pub mod screen;
pub mod task;

pub use api::{ForwardedResponse, TeacherApi, TeacherClient, ViolationQuery};
pub use error::ClientError;
pub use events::EventStream;
pub use poll::{spawn_poller, PollState, Poller};
pub use screen::{ScreenRelay, ScreenWall, SharedWall};
pub use task::BackgroundTask;
