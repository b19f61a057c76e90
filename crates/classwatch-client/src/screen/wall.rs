use std::collections::BTreeMap;
use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;

use super::frame::{ControlMessage, ScreenMessage};

pub type SharedWall = Arc<RwLock<ScreenWall>>;

#[derive(Debug, Clone, PartialEq)]
pub struct ScreenTile {
    pub hostname: String,
    pub frame: Option<Bytes>,
    pub last_update: Option<DateTime<Utc>>,
}

impl ScreenTile {
    fn empty(hostname: &str) -> Self {
        Self { hostname: hostname.to_string(), frame: None, last_update: None }
    }
}

/// Serializable view of a tile, without the image bytes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TileInfo {
    pub hostname: String,
    pub streaming: bool,
    pub last_update: Option<DateTime<Utc>>,
    pub frame_bytes: usize,
}

/// State of the live screen grid: one tile per known host, ordered by hostname.
#[derive(Debug, Default)]
pub struct ScreenWall {
    tiles: BTreeMap<String, ScreenTile>,
    connected: bool,
}

impl ScreenWall {
    pub fn shared() -> SharedWall {
        Arc::new(RwLock::new(Self::default()))
    }

    pub fn apply(&mut self, msg: ScreenMessage, now: DateTime<Utc>) {
        match msg {
            ScreenMessage::Control(control) => self.apply_control(control),
            ScreenMessage::Frame { hostname, jpeg } => {
                let tile = self
                    .tiles
                    .entry(hostname.clone())
                    .or_insert_with(|| ScreenTile::empty(&hostname));
                tile.frame = Some(jpeg);
                tile.last_update = Some(now);
            }
        }
    }

    pub fn apply_control(&mut self, control: ControlMessage) {
        match control {
            ControlMessage::StudentList { students } => {
                for hostname in students {
                    self.ensure(&hostname);
                }
            }
            ControlMessage::StudentConnected { hostname } => self.ensure(&hostname),
            ControlMessage::StudentDisconnected { hostname } => {
                self.tiles.remove(&hostname);
            }
            ControlMessage::Unknown => {}
        }
    }

    fn ensure(&mut self, hostname: &str) {
        if !self.tiles.contains_key(hostname) {
            self.tiles.insert(hostname.to_string(), ScreenTile::empty(hostname));
        }
    }

    pub fn set_connected(&mut self, connected: bool) {
        self.connected = connected;
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn tiles(&self) -> impl Iterator<Item = &ScreenTile> {
        self.tiles.values()
    }

    pub fn tile(&self, hostname: &str) -> Option<&ScreenTile> {
        self.tiles.get(hostname)
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Tiles currently holding a frame.
    pub fn streaming_count(&self) -> usize {
        self.tiles.values().filter(|t| t.frame.is_some()).count()
    }

    pub fn snapshot(&self) -> Vec<TileInfo> {
        self.tiles
            .values()
            .map(|t| TileInfo {
                hostname: t.hostname.clone(),
                streaming: t.frame.is_some(),
                last_update: t.last_update,
                frame_bytes: t.frame.as_ref().map_or(0, |f| f.len()),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn t(sec: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 9, 0, sec).unwrap()
    }

    fn frame(host: &str, bytes: &'static [u8]) -> ScreenMessage {
        ScreenMessage::Frame { hostname: host.into(), jpeg: Bytes::from_static(bytes) }
    }

    #[test]
    fn test_student_list_adds_missing_tiles_only() {
        let mut wall = ScreenWall::default();
        wall.apply(frame("pc-02", b"old"), t(1));
        wall.apply_control(ControlMessage::StudentList {
            students: vec!["pc-01".into(), "pc-02".into()],
        });

        assert_eq!(wall.len(), 2);
        assert_eq!(wall.tile("pc-02").unwrap().frame.as_deref(), Some(&b"old"[..]));
        assert!(wall.tile("pc-01").unwrap().frame.is_none());
        assert_eq!(wall.streaming_count(), 1);
    }

    #[test]
    fn test_frame_replaces_previous_image() {
        let mut wall = ScreenWall::default();
        wall.apply(frame("pc-01", b"first"), t(1));
        wall.apply(frame("pc-01", b"second"), t(2));

        let tile = wall.tile("pc-01").unwrap();
        assert_eq!(tile.frame.as_deref(), Some(&b"second"[..]));
        assert_eq!(tile.last_update, Some(t(2)));
        assert_eq!(wall.len(), 1);
    }

    #[test]
    fn test_connect_keeps_frame_and_disconnect_removes_tile() {
        let mut wall = ScreenWall::default();
        wall.apply(frame("pc-01", b"img"), t(1));
        wall.apply_control(ControlMessage::StudentConnected { hostname: "pc-01".into() });
        assert_eq!(wall.streaming_count(), 1);

        wall.apply_control(ControlMessage::StudentDisconnected { hostname: "pc-01".into() });
        assert!(wall.is_empty());
        assert_eq!(wall.streaming_count(), 0);

        // Disconnect of an unknown host is a no-op.
        wall.apply_control(ControlMessage::StudentDisconnected { hostname: "ghost".into() });
        assert!(wall.is_empty());
    }

    #[test]
    fn test_tiles_are_ordered_by_hostname() {
        let mut wall = ScreenWall::default();
        for host in ["pc-10", "pc-02", "lab-a"] {
            wall.apply_control(ControlMessage::StudentConnected { hostname: host.into() });
        }
        let order: Vec<&str> = wall.tiles().map(|t| t.hostname.as_str()).collect();
        assert_eq!(order, vec!["lab-a", "pc-02", "pc-10"]);
    }

    #[test]
    fn test_snapshot_omits_image_bytes() {
        let mut wall = ScreenWall::default();
        wall.apply(frame("pc-01", b"12345"), t(3));
        wall.apply_control(ControlMessage::StudentConnected { hostname: "pc-02".into() });

        let snap = wall.snapshot();
        assert_eq!(snap[0], TileInfo {
            hostname: "pc-01".into(),
            streaming: true,
            last_update: Some(t(3)),
            frame_bytes: 5,
        });
        assert!(!snap[1].streaming);
    }
}
