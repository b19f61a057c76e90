//! Realtime violation / notification socket.
//!
//! Connects to the backend event endpoint, forwards every accepted
//! [`RealtimeEvent`] on a broadcast channel and reconnects after a fixed
//! delay whenever the socket closes or fails. No backoff, no retry limit.

use std::time::Duration;

use classwatch_common::RealtimeEvent;
use futures_util::StreamExt;
use tokio::sync::broadcast;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};
use tracing::{debug, info, warn};
use url::Url;

use crate::task::BackgroundTask;

pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(4);

pub struct EventStream {
    url: Url,
    reconnect_delay: Duration,
    tx: broadcast::Sender<RealtimeEvent>,
}

impl EventStream {
    pub fn new(url: Url, tx: broadcast::Sender<RealtimeEvent>) -> Self {
        Self { url, reconnect_delay: DEFAULT_RECONNECT_DELAY, tx }
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    pub fn spawn(self) -> BackgroundTask {
        BackgroundTask::new("events", tokio::spawn(self.run()))
    }

    async fn run(self) {
        loop {
            info!("Connecting to event stream: {}", self.url);
            match connect_async(self.url.as_str()).await {
                Ok((mut ws, _response)) => {
                    info!("Event stream connected");
                    while let Some(msg) = ws.next().await {
                        match msg {
                            Ok(Message::Text(text)) => self.forward(text.as_str()),
                            Ok(Message::Close(frame)) => {
                                debug!(?frame, "Event stream closed by server");
                                break;
                            }
                            Ok(_) => {}
                            Err(e) => {
                                warn!("Event stream receive error: {}", e);
                                break;
                            }
                        }
                    }
                    info!("Event stream disconnected");
                }
                Err(e) => warn!("Event stream connection failed: {}", e),
            }
            tokio::time::sleep(self.reconnect_delay).await;
        }
    }

    fn forward(&self, text: &str) {
        match RealtimeEvent::parse(text) {
            // No receivers just means no page is listening right now.
            Some(event) => {
                let _ = self.tx.send(event);
            }
            None => debug!("Ignoring event message: {}", text),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_filters_unknown_messages() {
        let (tx, mut rx) = broadcast::channel(8);
        let stream = EventStream::new(Url::parse("ws://localhost:8080/ws").unwrap(), tx);

        stream.forward("garbage");
        stream.forward(r#"{"type":"screen_frame"}"#);
        stream.forward(r#"{"type":"notification","message":"hello"}"#);

        let event = rx.try_recv().unwrap();
        assert!(matches!(event, RealtimeEvent::Notification(ref n) if n.message == "hello"));
        assert!(rx.try_recv().is_err());
    }
}
