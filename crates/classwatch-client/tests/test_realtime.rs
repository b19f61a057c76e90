//! Event socket, screen relay and pollers against the fake backend.

use std::sync::Arc;
use std::time::Duration;

use classwatch_client::{
    spawn_poller, EventStream, ScreenRelay, ScreenWall, TeacherApi, TeacherClient,
};
use classwatch_common::RealtimeEvent;
use classwatch_test_utils::{fixtures, FakeBackend};
use tokio::sync::broadcast;
use tokio::time::timeout;
use url::Url;

async fn wait_until<F: Fn() -> bool>(what: &str, check: F) {
    timeout(Duration::from_secs(5), async {
        while !check() {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("timed out waiting for {what}"));
}

#[tokio::test]
async fn test_event_stream_forwards_known_events_only() {
    let backend = FakeBackend::spawn().await;
    let (tx, mut rx) = broadcast::channel(16);
    let _task = EventStream::new(Url::parse(&backend.ws_url("/ws")).unwrap(), tx).spawn();

    let first = timeout(Duration::from_secs(5), rx.recv()).await.unwrap().unwrap();
    let violation = first.as_violation().expect("first event is the violation");
    assert_eq!(violation.hostname, "pc-01");
    assert!(violation.severity.is_critical());

    let second = timeout(Duration::from_secs(5), rx.recv()).await.unwrap().unwrap();
    assert!(matches!(second, RealtimeEvent::Notification(ref n) if n.message == "agent restarted"));
}

#[tokio::test]
async fn test_event_stream_reconnects_after_close() {
    let backend = FakeBackend::spawn().await;
    let (tx, _rx) = broadcast::channel(16);
    let _task = EventStream::new(Url::parse(&backend.ws_url("/ws")).unwrap(), tx)
        .with_reconnect_delay(Duration::from_millis(50))
        .spawn();

    wait_until("first connection", || backend.event_connections() == 1).await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    backend.kick_sockets();
    wait_until("reconnect", || backend.event_connections() >= 2).await;
}

#[tokio::test]
async fn test_screen_relay_builds_wall() {
    let backend = FakeBackend::spawn().await;
    let wall = ScreenWall::shared();
    let _task = ScreenRelay::new(Url::parse(&backend.ws_url("/ws/screen/view")).unwrap(), wall.clone())
        .spawn();

    timeout(Duration::from_secs(5), async {
        loop {
            {
                let w = wall.read().await;
                if w.is_connected() && w.len() == 2 && w.tile("pc-02").is_none() {
                    break;
                }
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("wall should reflect the screen script");

    let w = wall.read().await;
    assert_eq!(w.streaming_count(), 1);
    assert_eq!(w.tile("pc-01").unwrap().frame.as_deref(), Some(fixtures::JPEG));
    assert!(w.tile("pc-03").unwrap().frame.is_none());
}

#[tokio::test]
async fn test_screen_relay_marks_wall_disconnected() {
    let backend = FakeBackend::spawn().await;
    let wall = ScreenWall::shared();
    let _task = ScreenRelay::new(Url::parse(&backend.ws_url("/ws/screen/view")).unwrap(), wall.clone())
        .with_reconnect_delay(Duration::from_secs(60))
        .spawn();

    wait_until("screen connection", || backend.screen_connections() == 1).await;
    timeout(Duration::from_secs(5), async {
        while !wall.read().await.is_connected() {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .unwrap();

    backend.kick_sockets();
    timeout(Duration::from_secs(5), async {
        while wall.read().await.is_connected() {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("wall should flip to disconnected");
}

#[tokio::test]
async fn test_student_poller_keeps_stale_data_when_backend_fails() {
    let backend = FakeBackend::spawn().await;
    let client = Arc::new(TeacherClient::new(Url::parse(&backend.api_url()).unwrap()).unwrap());

    let fetch_client = client.clone();
    let (poller, _task) = spawn_poller("students", Duration::from_millis(30), move || {
        let client = fetch_client.clone();
        async move { client.students().await }
    });

    let mut rx = poller.subscribe();
    timeout(Duration::from_secs(5), rx.wait_for(|s| s.data.is_some())).await.unwrap().unwrap();
    assert_eq!(poller.snapshot().data.unwrap().online_count(), 2);

    backend.set_failing(true);
    timeout(Duration::from_secs(5), rx.wait_for(|s| s.is_stale())).await.unwrap().unwrap();

    let state = poller.snapshot();
    assert_eq!(state.error.as_deref(), Some("API 503: /students"));
    assert_eq!(state.data.unwrap().total(), 3);
}
