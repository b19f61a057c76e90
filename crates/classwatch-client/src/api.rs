//! Teacher backend REST client.
//!
//! Every path below is relative to `{backend}{api_path}` (by default
//! `http://host:8080/api`):
//!   GET  /students, /students/active, /students/:hostname
//!   GET  /violations?hostname=&count=
//!   GET  /config, PUT /config
//!   POST /students/:hostname/lock {mode}
//!   POST /students/:hostname/open-url {url}
//!   POST /broadcast/open-url {url}
//!   GET  /apps/:hostname

use async_trait::async_trait;
use bytes::Bytes;
use classwatch_common::{
    AppsSnapshot, LockMode, StudentDetail, StudentList, TeacherConfig, ViolationList,
};
use reqwest::{Client, Method, RequestBuilder};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::json;
use tracing::{debug, instrument};
use url::Url;

use crate::error::{ClientError, Result};

pub const DEFAULT_VIOLATION_COUNT: u32 = 100;

/// Filter for `GET /violations`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViolationQuery {
    pub hostname: Option<String>,
    pub count: u32,
}

impl Default for ViolationQuery {
    fn default() -> Self {
        Self { hostname: None, count: DEFAULT_VIOLATION_COUNT }
    }
}

impl ViolationQuery {
    pub fn for_host(hostname: impl Into<String>) -> Self {
        Self { hostname: Some(hostname.into()), ..Self::default() }
    }

    /// `hostname` is left out entirely when unset.
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::with_capacity(2);
        if let Some(hostname) = self.hostname.as_deref().filter(|h| !h.is_empty()) {
            params.push(("hostname", hostname.to_string()));
        }
        params.push(("count", self.count.to_string()));
        params
    }
}

/// Common interface over the teacher backend. Pages and pollers only see
/// this trait, so tests can swap in an in-memory backend.
#[async_trait]
pub trait TeacherApi: Send + Sync {
    async fn students(&self) -> Result<StudentList>;
    async fn active_students(&self) -> Result<StudentList>;
    async fn student_detail(&self, hostname: &str) -> Result<StudentDetail>;
    async fn violations(&self, query: &ViolationQuery) -> Result<ViolationList>;
    async fn config(&self) -> Result<TeacherConfig>;
    /// Overwrites the backend config wholesale.
    async fn put_config(&self, config: &TeacherConfig) -> Result<()>;
    async fn lock(&self, hostname: &str, mode: LockMode) -> Result<()>;
    async fn open_url(&self, hostname: &str, url: &str) -> Result<()>;
    async fn broadcast_open_url(&self, url: &str) -> Result<()>;
    async fn apps(&self, hostname: &str) -> Result<AppsSnapshot>;
}

/// Raw upstream answer relayed by the dashboard's REST proxy.
#[derive(Debug, Clone)]
pub struct ForwardedResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Bytes,
}

#[derive(Debug, Clone)]
pub struct TeacherClient {
    client: Client,
    base: Url,
}

impl TeacherClient {
    /// `base` is the REST root, e.g. `http://10.10.64.215:8080/api`.
    /// No request timeout is configured; a hung fetch only ends when the
    /// owning poller is dropped.
    pub fn new(base: Url) -> Result<Self> {
        let client = Client::builder()
            .build()
            .map_err(ClientError::Http)?;
        Ok(Self { client, base })
    }

    pub fn with_client(client: Client, base: Url) -> Self {
        Self { client, base }
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Build `{base}/{segments...}`; each segment is percent-encoded on its own,
    /// so a hostname can never escape its path position.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::Url(format!("{} cannot be a base", self.base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn display_path(segments: &[&str]) -> String {
        format!("/{}", segments.join("/"))
    }

    async fn send(&self, req: RequestBuilder, path: String) -> Result<reqwest::Response> {
        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ClientError::Status { status: status.as_u16(), path });
        }
        Ok(resp)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        query: &[(&'static str, String)],
    ) -> Result<T> {
        let url = self.endpoint(segments)?;
        let path = Self::display_path(segments);
        debug!(%url, "GET");
        let resp = self.send(self.client.get(url).query(query), path).await?;
        Ok(resp.json::<T>().await?)
    }

    async fn send_json<B: Serialize + ?Sized>(
        &self,
        method: Method,
        segments: &[&str],
        body: &B,
    ) -> Result<()> {
        let url = self.endpoint(segments)?;
        let path = Self::display_path(segments);
        debug!(%url, %method, "command");
        self.send(self.client.request(method, url).json(body), path).await?;
        Ok(())
    }

    /// Relay an arbitrary request to `{base}/{tail}`. `tail` and `query` are
    /// forwarded as received (already percent-encoded).
    #[instrument(skip(self, body), fields(body_len = body.len()))]
    pub async fn forward(
        &self,
        method: Method,
        tail: &str,
        query: Option<&str>,
        content_type: Option<&str>,
        body: Bytes,
    ) -> Result<ForwardedResponse> {
        let mut url = self.base.clone();
        let path = format!(
            "{}/{}",
            self.base.path().trim_end_matches('/'),
            tail.trim_start_matches('/')
        );
        url.set_path(&path);
        url.set_query(query.filter(|q| !q.is_empty()));

        let mut req = self.client.request(method, url);
        if let Some(ct) = content_type {
            req = req.header(reqwest::header::CONTENT_TYPE, ct);
        }
        if !body.is_empty() {
            req = req.body(body);
        }

        let resp = req.send().await?;
        let status = resp.status().as_u16();
        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let body = resp.bytes().await?;
        Ok(ForwardedResponse { status, content_type, body })
    }
}

#[async_trait]
impl TeacherApi for TeacherClient {
    #[instrument(skip(self))]
    async fn students(&self) -> Result<StudentList> {
        self.get_json(&["students"], &[]).await
    }

    #[instrument(skip(self))]
    async fn active_students(&self) -> Result<StudentList> {
        self.get_json(&["students", "active"], &[]).await
    }

    #[instrument(skip(self))]
    async fn student_detail(&self, hostname: &str) -> Result<StudentDetail> {
        self.get_json(&["students", hostname], &[]).await
    }

    #[instrument(skip(self))]
    async fn violations(&self, query: &ViolationQuery) -> Result<ViolationList> {
        self.get_json(&["violations"], &query.params()).await
    }

    #[instrument(skip(self))]
    async fn config(&self) -> Result<TeacherConfig> {
        self.get_json(&["config"], &[]).await
    }

    #[instrument(skip(self, config))]
    async fn put_config(&self, config: &TeacherConfig) -> Result<()> {
        self.send_json(Method::PUT, &["config"], config).await
    }

    #[instrument(skip(self))]
    async fn lock(&self, hostname: &str, mode: LockMode) -> Result<()> {
        self.send_json(Method::POST, &["students", hostname, "lock"], &json!({ "mode": mode }))
            .await
    }

    #[instrument(skip(self))]
    async fn open_url(&self, hostname: &str, url: &str) -> Result<()> {
        self.send_json(Method::POST, &["students", hostname, "open-url"], &json!({ "url": url }))
            .await
    }

    #[instrument(skip(self))]
    async fn broadcast_open_url(&self, url: &str) -> Result<()> {
        self.send_json(Method::POST, &["broadcast", "open-url"], &json!({ "url": url }))
            .await
    }

    #[instrument(skip(self))]
    async fn apps(&self, hostname: &str) -> Result<AppsSnapshot> {
        self.get_json(&["apps", hostname], &[]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn client() -> TeacherClient {
        TeacherClient::new(Url::parse("http://10.0.0.5:8080/api").unwrap()).unwrap()
    }

    #[test]
    fn test_endpoint_encodes_hostname_segment() {
        let c = client();
        let url = c.endpoint(&["students", "lab 3/pc-01", "lock"]).unwrap();
        assert_eq!(url.as_str(), "http://10.0.0.5:8080/api/students/lab%203%2Fpc-01/lock");
    }

    #[test]
    fn test_endpoint_with_trailing_slash_base() {
        let c = TeacherClient::new(Url::parse("http://h:8080/api/").unwrap()).unwrap();
        assert_eq!(c.endpoint(&["config"]).unwrap().as_str(), "http://h:8080/api/config");
    }

    #[test]
    fn test_violation_query_params() {
        assert_eq!(
            ViolationQuery::default().params(),
            vec![("count", "100".to_string())]
        );
        assert_eq!(
            ViolationQuery::for_host("pc-01").params(),
            vec![("hostname", "pc-01".to_string()), ("count", "100".to_string())]
        );
        let empty_host = ViolationQuery { hostname: Some(String::new()), count: 5 };
        assert_eq!(empty_host.params(), vec![("count", "5".to_string())]);
    }

    #[test]
    fn test_status_error_display_matches_dashboard_text() {
        let err = ClientError::Status { status: 503, path: "/students".into() };
        assert_eq!(err.to_string(), "API 503: /students");
        assert_eq!(err.status(), Some(503));
    }
}
