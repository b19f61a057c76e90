//! Upstream screen-view socket.
//!
//! One task per dashboard process: it keeps a single connection to the
//! backend's screen endpoint, applies every decoded message to the shared
//! [`ScreenWall`] and reconnects after a fixed delay when the socket drops.

use std::time::Duration;

use chrono::Utc;
use futures_util::StreamExt;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};
use tracing::{debug, info, warn};
use url::Url;

use super::frame::{decode_binary, decode_text, FrameError, ScreenMessage};
use super::wall::SharedWall;
use crate::task::BackgroundTask;

pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(3);

pub struct ScreenRelay {
    url: Url,
    reconnect_delay: Duration,
    wall: SharedWall,
}

impl ScreenRelay {
    pub fn new(url: Url, wall: SharedWall) -> Self {
        Self { url, reconnect_delay: DEFAULT_RECONNECT_DELAY, wall }
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    pub fn spawn(self) -> BackgroundTask {
        BackgroundTask::new("screen", tokio::spawn(self.run()))
    }

    async fn run(self) {
        loop {
            info!("Connecting to screen relay: {}", self.url);
            match connect_async(self.url.as_str()).await {
                Ok((mut ws, _response)) => {
                    info!("Screen relay connected");
                    self.wall.write().await.set_connected(true);

                    while let Some(msg) = ws.next().await {
                        let decoded = match msg {
                            Ok(Message::Text(text)) => {
                                decode_text(text.as_str()).map(ScreenMessage::Control)
                            }
                            Ok(Message::Binary(data)) => decode_binary(data),
                            Ok(Message::Close(frame)) => {
                                debug!(?frame, "Screen relay closed by server");
                                break;
                            }
                            Ok(_) => continue,
                            Err(e) => {
                                warn!("Screen relay receive error: {}", e);
                                break;
                            }
                        };
                        self.apply(decoded).await;
                    }

                    self.wall.write().await.set_connected(false);
                    info!("Screen relay disconnected");
                }
                Err(e) => warn!("Screen relay connection failed: {}", e),
            }
            tokio::time::sleep(self.reconnect_delay).await;
        }
    }

    async fn apply(&self, decoded: Result<ScreenMessage, FrameError>) {
        match decoded {
            Ok(msg) => self.wall.write().await.apply(msg, Utc::now()),
            Err(e) => debug!("Skipping screen message: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::screen::wall::ScreenWall;
    use bytes::Bytes;

    #[tokio::test]
    async fn test_bad_messages_leave_wall_untouched() {
        let wall = ScreenWall::shared();
        let relay = ScreenRelay::new(Url::parse("ws://localhost:8080/ws/screen/view").unwrap(), wall.clone());

        relay.apply(decode_binary(Bytes::from_static(&[40, b'x']))).await;
        relay.apply(decode_text("{").map(ScreenMessage::Control)).await;
        assert!(wall.read().await.is_empty());

        relay
            .apply(decode_text(r#"{"type":"student_connected","hostname":"pc-01"}"#).map(ScreenMessage::Control))
            .await;
        assert_eq!(wall.read().await.len(), 1);
    }
}
