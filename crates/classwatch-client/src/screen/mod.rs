//! Live screen relay: wire codec, grid state and the upstream socket task.

pub mod frame;
pub mod relay;
pub mod wall;

pub use frame::{ControlMessage, FrameError, ScreenMessage};
pub use relay::ScreenRelay;
pub use wall::{ScreenTile, ScreenWall, SharedWall, TileInfo};
