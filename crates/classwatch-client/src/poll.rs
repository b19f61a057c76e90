//! Fixed-interval pollers.
//!
//! A poller fetches once immediately, then on every tick. Each fetch runs in
//! its own task so a slow response never delays the next tick; in-flight
//! requests are not de-duplicated. Results are published as [`PollState`]
//! snapshots on a `watch` channel.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Notify};
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::error::ClientError;
use crate::task::BackgroundTask;

/// What a page sees of a polled resource.
#[derive(Debug, Clone, PartialEq)]
pub struct PollState<T> {
    pub data: Option<T>,
    /// True until the first fetch finishes (successfully or not).
    pub loading: bool,
    pub error: Option<String>,
}

impl<T> Default for PollState<T> {
    fn default() -> Self {
        Self { data: None, loading: true, error: None }
    }
}

impl<T> PollState<T> {
    pub fn ready(data: T) -> Self {
        Self { data: Some(data), loading: false, error: None }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self { data: None, loading: false, error: Some(error.into()) }
    }

    /// Apply one fetch result. Failures keep the last good data.
    pub fn record(&mut self, result: Result<T, ClientError>) {
        self.loading = false;
        match result {
            Ok(data) => {
                self.data = Some(data);
                self.error = None;
            }
            Err(e) => self.error = Some(e.to_string()),
        }
    }

    /// Data is stale when the latest fetch failed but an older one succeeded.
    pub fn is_stale(&self) -> bool {
        self.data.is_some() && self.error.is_some()
    }
}

/// Read side of a poller. Cheap to clone; every clone sees the same state.
#[derive(Debug, Clone)]
pub struct Poller<T> {
    rx: watch::Receiver<PollState<T>>,
    refetch: Arc<Notify>,
}

impl<T: Clone> Poller<T> {
    /// A poller that never fetches and always reports `state`.
    pub fn fixed(state: PollState<T>) -> Self {
        let (_tx, rx) = watch::channel(state);
        Self { rx, refetch: Arc::new(Notify::new()) }
    }

    pub fn snapshot(&self) -> PollState<T> {
        self.rx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<PollState<T>> {
        self.rx.clone()
    }

    /// Trigger an immediate out-of-band fetch.
    pub fn refetch(&self) {
        self.refetch.notify_one();
    }
}

/// Start polling `fetcher` every `every`. The returned task handle stops the
/// poller (and any fetch still in flight) when dropped.
pub fn spawn_poller<T, F, Fut>(
    name: &'static str,
    every: Duration,
    fetcher: F,
) -> (Poller<T>, BackgroundTask)
where
    T: Clone + Send + Sync + 'static,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, ClientError>> + Send + 'static,
{
    let (tx, rx) = watch::channel(PollState::default());
    let tx = Arc::new(tx);
    let refetch = Arc::new(Notify::new());
    let trigger = refetch.clone();

    let handle = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut in_flight: JoinSet<()> = JoinSet::new();

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = trigger.notified() => debug!(poller = name, "refetch requested"),
                Some(_) = in_flight.join_next() => continue,
            }

            let fetch = fetcher();
            let tx = tx.clone();
            in_flight.spawn(async move {
                let result = fetch.await;
                if let Err(e) = &result {
                    warn!(poller = name, error = %e, "poll failed");
                }
                tx.send_modify(|state| state.record(result));
            });
        }
    });

    (Poller { rx, refetch }, BackgroundTask::new(name, handle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::timeout;

    #[test]
    fn test_record_keeps_stale_data_on_failure() {
        let mut state: PollState<u32> = PollState::default();
        assert!(state.loading);

        state.record(Ok(7));
        assert_eq!(state, PollState::ready(7));

        state.record(Err(ClientError::Status { status: 502, path: "/students".into() }));
        assert_eq!(state.data, Some(7));
        assert_eq!(state.error.as_deref(), Some("API 502: /students"));
        assert!(state.is_stale());

        state.record(Ok(8));
        assert_eq!(state.error, None);
        assert!(!state.is_stale());
    }

    #[test]
    fn test_first_failure_clears_loading() {
        let mut state: PollState<u32> = PollState::default();
        state.record(Err(ClientError::Url("bad".into())));
        assert!(!state.loading);
        assert!(state.data.is_none());
    }

    #[tokio::test]
    async fn test_poller_fetches_immediately_and_repeats() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let (poller, _task) = spawn_poller("count", Duration::from_millis(20), move || {
            let counter = counter.clone();
            async move { Ok::<_, ClientError>(counter.fetch_add(1, Ordering::SeqCst) + 1) }
        });

        let mut rx = poller.subscribe();
        timeout(Duration::from_secs(2), async {
            loop {
                rx.changed().await.unwrap();
                if rx.borrow().data.unwrap_or(0) >= 3 {
                    break;
                }
            }
        })
        .await
        .expect("poller should have fetched at least three times");

        assert!(!poller.snapshot().loading);
    }

    #[tokio::test]
    async fn test_refetch_runs_out_of_band() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let (poller, _task) = spawn_poller("slow", Duration::from_secs(3600), move || {
            let counter = counter.clone();
            async move { Ok::<_, ClientError>(counter.fetch_add(1, Ordering::SeqCst) + 1) }
        });

        let mut rx = poller.subscribe();
        timeout(Duration::from_secs(2), rx.wait_for(|s| s.data == Some(1)))
            .await
            .unwrap()
            .unwrap();

        poller.refetch();
        timeout(Duration::from_secs(2), rx.wait_for(|s| s.data == Some(2)))
            .await
            .expect("refetch should trigger a second fetch")
            .unwrap();
    }

    #[tokio::test]
    async fn test_dropping_task_stops_polling() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let (_poller, task) = spawn_poller("stop", Duration::from_millis(10), move || {
            let counter = counter.clone();
            async move { Ok::<_, ClientError>(counter.fetch_add(1, Ordering::SeqCst)) }
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        drop(task);
        tokio::time::sleep(Duration::from_millis(20)).await;
        let after_drop = calls.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(calls.load(Ordering::SeqCst), after_drop);
    }

    #[test]
    fn test_fixed_poller_reports_given_state() {
        let poller = Poller::fixed(PollState::failed("API 500: /config"));
        let snap: PollState<u32> = poller.snapshot();
        assert_eq!(snap.error.as_deref(), Some("API 500: /config"));
        assert!(!snap.loading);
    }
}
