//! REST client against the in-process fake backend.
//!
//! Run with: cargo test --package classwatch-client --test test_rest_client

use classwatch_client::{ClientError, TeacherApi, TeacherClient, ViolationQuery};
use classwatch_common::{error::NO_CONNECTION, ClasswatchError, LockMode};
use classwatch_test_utils::FakeBackend;
use pretty_assertions::assert_eq;
use serde_json::json;
use url::Url;

fn client_for(backend: &FakeBackend) -> TeacherClient {
    TeacherClient::new(Url::parse(&backend.api_url()).unwrap()).unwrap()
}

#[tokio::test]
async fn test_students_and_active_students() {
    let backend = FakeBackend::spawn().await;
    let client = client_for(&backend);

    let all = client.students().await.unwrap();
    assert_eq!(all.total(), 3);
    assert_eq!(all.online_count(), 2);

    let active = client.active_students().await.unwrap();
    assert_eq!(active.total(), 2);
    assert!(active.students.iter().all(|s| s.active));

    let paths: Vec<String> = backend.requests().into_iter().map(|r| r.path).collect();
    assert_eq!(paths, vec!["/api/students", "/api/students/active"]);
}

#[tokio::test]
async fn test_student_detail_and_missing_host() {
    let backend = FakeBackend::spawn().await;
    let client = client_for(&backend);

    let detail = client.student_detail("pc-01").await.unwrap();
    assert_eq!(detail.summary.hostname, "pc-01");
    assert_eq!(detail.violations.len(), 2);

    let err = client.student_detail("nope").await.unwrap_err();
    assert_eq!(err.to_string(), "API 404: /students/nope");
    assert!(matches!(ClasswatchError::from(err), ClasswatchError::StudentNotFound(_)));
}

#[tokio::test]
async fn test_violation_query_string() {
    let backend = FakeBackend::spawn().await;
    let client = client_for(&backend);

    let all = client.violations(&ViolationQuery::default()).await.unwrap();
    assert_eq!(all.violations.len(), 3);

    let mine = client.violations(&ViolationQuery::for_host("pc-01")).await.unwrap();
    assert!(mine.violations.iter().all(|v| v.hostname == "pc-01"));

    let queries: Vec<Option<String>> = backend.requests().into_iter().map(|r| r.query).collect();
    assert_eq!(
        queries,
        vec![Some("count=100".to_string()), Some("hostname=pc-01&count=100".to_string())]
    );
}

#[tokio::test]
async fn test_commands_send_expected_bodies() {
    let backend = FakeBackend::spawn().await;
    let client = client_for(&backend);

    client.lock("pc-01", LockMode::Hard).await.unwrap();
    client.open_url("pc-02", "https://school.lan").await.unwrap();
    client.broadcast_open_url("https://school.lan/test").await.unwrap();

    let reqs = backend.requests();
    assert_eq!(reqs[0].method, "POST");
    assert_eq!(reqs[0].path, "/api/students/pc-01/lock");
    assert_eq!(reqs[0].body, json!({"mode": "hard"}));
    assert_eq!(reqs[1].path, "/api/students/pc-02/open-url");
    assert_eq!(reqs[1].body, json!({"url": "https://school.lan"}));
    assert_eq!(reqs[2].path, "/api/broadcast/open-url");
    assert_eq!(reqs[2].body, json!({"url": "https://school.lan/test"}));
}

#[tokio::test]
async fn test_hostname_is_a_single_encoded_segment() {
    let backend = FakeBackend::spawn().await;
    let client = client_for(&backend);

    let err = client.lock("lab 3/pc-01", LockMode::Soft).await.unwrap_err();
    assert_eq!(err.status(), Some(404));
    assert_eq!(backend.requests()[0].path, "/api/students/lab%203%2Fpc-01/lock");
}

#[tokio::test]
async fn test_put_config_overwrites_and_keeps_extra_keys() {
    let backend = FakeBackend::spawn().await;
    let client = client_for(&backend);

    let mut config = client.config().await.unwrap();
    config.banned_domains.push("tiktok.com".into());
    config.sau_mode = true;
    client.put_config(&config).await.unwrap();

    let stored = backend.current_config();
    assert_eq!(stored, config);
    assert_eq!(stored.extra.get("scan_interval"), Some(&json!(3)));
    assert_eq!(backend.requests().last().unwrap().method, "PUT");
}

#[tokio::test]
async fn test_apps_for_known_host() {
    let backend = FakeBackend::spawn().await;
    let client = client_for(&backend);

    let apps = client.apps("pc-02").await.unwrap();
    assert_eq!(apps.by_memory_desc()[0].name, "chrome.exe");
    assert!(client.apps("ghost").await.is_err());
}

#[tokio::test]
async fn test_non_success_status_error() {
    let backend = FakeBackend::spawn().await;
    backend.set_failing(true);
    let client = client_for(&backend);

    let err = client.students().await.unwrap_err();
    assert!(matches!(err, ClientError::Status { status: 503, .. }));
    assert_eq!(err.to_string(), "API 503: /students");
}

#[tokio::test]
async fn test_unreachable_backend_maps_to_connection_text() {
    // Nothing listens on the discard port.
    let client = TeacherClient::new(Url::parse("http://127.0.0.1:9/api").unwrap()).unwrap();
    let err = client.students().await.unwrap_err();
    assert!(matches!(err, ClientError::Http(_)));
    assert_eq!(ClasswatchError::from(err).user_message(), NO_CONNECTION);
}

#[tokio::test]
async fn test_forward_passes_method_query_and_body() {
    let backend = FakeBackend::spawn().await;
    let client = client_for(&backend);

    let resp = client
        .forward(reqwest::Method::GET, "violations", Some("hostname=pc-02&count=5"), None, Default::default())
        .await
        .unwrap();
    assert_eq!(resp.status, 200);
    assert_eq!(resp.content_type.as_deref(), Some("application/json"));
    let body: serde_json::Value = serde_json::from_slice(&resp.body).unwrap();
    assert_eq!(body["violations"].as_array().unwrap().len(), 1);

    let resp = client
        .forward(
            reqwest::Method::POST,
            "/students/pc-01/lock",
            None,
            Some("application/json"),
            bytes::Bytes::from_static(br#"{"mode":"soft"}"#),
        )
        .await
        .unwrap();
    assert_eq!(resp.status, 200);

    let missing = client
        .forward(reqwest::Method::GET, "students/ghost", None, None, Default::default())
        .await
        .unwrap();
    assert_eq!(missing.status, 404, "upstream status is relayed, not turned into an error");

    let reqs = backend.requests();
    assert_eq!(reqs[0].query.as_deref(), Some("hostname=pc-02&count=5"));
    assert_eq!(reqs[1].body, json!({"mode": "soft"}));
}
