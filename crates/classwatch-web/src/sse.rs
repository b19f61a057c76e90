//! `/api/events`: the backend's realtime feed re-published to browsers.
//!
//! Each `RealtimeEvent` becomes one named SSE event (`violation` or
//! `notification`) whose `data:` line is the event JSON.

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use classwatch_common::RealtimeEvent;
use futures_util::Stream;
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};
use tokio_stream::StreamExt;
use tracing::{debug, warn};

use crate::state::SharedState;

pub const KEEP_ALIVE: Duration = Duration::from_secs(15);

/// SSE event name for `event`.
pub fn event_name(event: &RealtimeEvent) -> &'static str {
    match event {
        RealtimeEvent::Violation(_) => "violation",
        RealtimeEvent::Notification(_) => "notification",
    }
}

pub fn to_sse(event: &RealtimeEvent) -> Option<Event> {
    match Event::default().event(event_name(event)).json_data(event) {
        Ok(sse) => Some(sse),
        Err(e) => {
            warn!("Dropping unserialisable realtime event: {}", e);
            None
        }
    }
}

pub async fn sse_handler(
    State(state): State<SharedState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = BroadcastStream::new(state.subscribe()).filter_map(|result| match result {
        Ok(event) => to_sse(&event).map(Ok),
        // A slow browser misses events rather than stalling the feed.
        Err(BroadcastStreamRecvError::Lagged(skipped)) => {
            debug!(skipped, "SSE client lagged");
            None
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::new().interval(KEEP_ALIVE).text("ping"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use classwatch_common::model::Notification;
    use classwatch_common::{Rule, Severity, Violation};

    #[test]
    fn test_event_names_follow_variant() {
        let violation = RealtimeEvent::Violation(Violation {
            hostname: "pc-01".into(),
            rule: Rule::BannedDomain,
            detail: "vk.com".into(),
            severity: Severity::Medium,
            timestamp: "2026-10-19T09:00:00Z".into(),
        });
        assert_eq!(event_name(&violation), "violation");
        assert!(to_sse(&violation).is_some());

        let note = RealtimeEvent::Notification(Notification {
            hostname: None,
            message: "agent restarted".into(),
            timestamp: None,
        });
        assert_eq!(event_name(&note), "notification");
    }
}
