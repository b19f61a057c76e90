//! Configuration loading for Classwatch.
//! Reads classwatch.toml from the current directory or the path in the
//! CLASSWATCH_CONFIG env var (`.yaml`/`.yml` paths are parsed as YAML).
//! A missing file is not an error: every field has a default, and the
//! backend address is usually supplied through TEACHER_API_URL.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::info;
use url::Url;

pub const DEFAULT_CONFIG_PATH: &str = "classwatch.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid URL for {field}: {source}")]
    Url {
        field: &'static str,
        #[source]
        source: url::ParseError,
    },

    #[error("Unsupported URL scheme for {field}: {scheme}")]
    Scheme { field: &'static str, scheme: String },

    #[error("{0} must be greater than zero")]
    ZeroValue(&'static str),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub realtime: RealtimeConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(default = "default_backend_url")]
    pub url: String,
    #[serde(default = "default_api_path")]
    pub api_path: String,
    /// Explicit event socket; derived from `url` when unset.
    #[serde(default)]
    pub events_ws_url: Option<String>,
    /// Explicit screen-view socket; derived from `url` when unset.
    #[serde(default)]
    pub screen_ws_url: Option<String>,
    #[serde(default = "default_events_path")]
    pub events_path: String,
    #[serde(default = "default_screen_path")]
    pub screen_path: String,
}

fn default_backend_url() -> String { "http://localhost:8080".to_string() }
fn default_api_path()    -> String { "/api".to_string() }
fn default_events_path() -> String { "/ws".to_string() }
fn default_screen_path() -> String { "/ws/screen/view".to_string() }

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: default_backend_url(),
            api_path: default_api_path(),
            events_ws_url: None,
            screen_ws_url: None,
            events_path: default_events_path(),
            screen_path: default_screen_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Path prefix under which REST calls are proxied to `{backend}{api_path}`.
    #[serde(default = "default_proxy_prefix")]
    pub proxy_prefix: String,
    #[serde(default = "default_static_dir")]
    pub static_dir: String,
}

fn default_bind()         -> String { "0.0.0.0:3000".to_string() }
fn default_proxy_prefix() -> String { "/api/teacher".to_string() }
fn default_static_dir()   -> String { "crates/classwatch-web/static".to_string() }

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            proxy_prefix: default_proxy_prefix(),
            static_dir: default_static_dir(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    #[serde(default = "default_5s")]
    pub students_ms: u64,
    #[serde(default = "default_5s")]
    pub violations_ms: u64,
    #[serde(default = "default_detail_ms")]
    pub detail_ms: u64,
    #[serde(default = "default_config_ms")]
    pub config_ms: u64,
    #[serde(default = "default_violations_count")]
    pub violations_count: u32,
}

fn default_5s()               -> u64 { 5_000 }
fn default_detail_ms()        -> u64 { 3_000 }
fn default_config_ms()        -> u64 { 30_000 }
fn default_violations_count() -> u32 { 100 }

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            students_ms: default_5s(),
            violations_ms: default_5s(),
            detail_ms: default_detail_ms(),
            config_ms: default_config_ms(),
            violations_count: default_violations_count(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    #[serde(default = "default_events_reconnect_ms")]
    pub events_reconnect_ms: u64,
    #[serde(default = "default_screen_reconnect_ms")]
    pub screen_reconnect_ms: u64,
    /// Realtime violations kept for the dashboard merge.
    #[serde(default = "default_alert_buffer")]
    pub alert_buffer: usize,
    /// CPU/RAM samples kept per host for the history chart.
    #[serde(default = "default_metrics_history")]
    pub metrics_history: usize,
}

fn default_events_reconnect_ms() -> u64   { 4_000 }
fn default_screen_reconnect_ms() -> u64   { 3_000 }
fn default_alert_buffer()        -> usize { 50 }
fn default_metrics_history()     -> usize { 30 }

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            events_reconnect_ms: default_events_reconnect_ms(),
            screen_reconnect_ms: default_screen_reconnect_ms(),
            alert_buffer: default_alert_buffer(),
            metrics_history: default_metrics_history(),
        }
    }
}

mod tests;

impl Config {
    /// Load configuration from classwatch.toml (or CLASSWATCH_CONFIG), then
    /// apply environment overrides and validate.
    pub fn load() -> Result<Self> {
        let path = std::env::var("CLASSWATCH_CONFIG")
            .unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

        let mut config = if Path::new(&path).exists() {
            let content = std::fs::read_to_string(&path)
                .map_err(|source| ConfigError::Io { path: path.clone(), source })?;
            if is_yaml(&path) {
                Self::from_yaml_str(&content)?
            } else {
                Self::from_toml_str(&content)?
            }
        } else {
            info!("No config file at {}, using defaults", path);
            Self::default()
        };

        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Overrides: TEACHER_API_URL, CLASSWATCH_BIND, CLASSWATCH_EVENTS_WS,
    /// CLASSWATCH_SCREEN_WS. Empty values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = get("TEACHER_API_URL") {
            self.backend.url = url;
        }
        if let Some(bind) = get("CLASSWATCH_BIND") {
            self.server.bind = bind;
        }
        if let Some(ws) = get("CLASSWATCH_EVENTS_WS") {
            self.backend.events_ws_url = Some(ws);
        }
        if let Some(ws) = get("CLASSWATCH_SCREEN_WS") {
            self.backend.screen_ws_url = Some(ws);
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.backend_url()?;
        self.events_ws_url()?;
        self.screen_ws_url()?;

        let intervals = [
            ("polling.students_ms", self.polling.students_ms),
            ("polling.violations_ms", self.polling.violations_ms),
            ("polling.detail_ms", self.polling.detail_ms),
            ("polling.config_ms", self.polling.config_ms),
            ("realtime.events_reconnect_ms", self.realtime.events_reconnect_ms),
            ("realtime.screen_reconnect_ms", self.realtime.screen_reconnect_ms),
        ];
        for (name, value) in intervals {
            if value == 0 {
                return Err(ConfigError::ZeroValue(name));
            }
        }
        if self.polling.violations_count == 0 {
            return Err(ConfigError::ZeroValue("polling.violations_count"));
        }
        Ok(())
    }

    pub fn backend_url(&self) -> Result<Url> {
        let url = Url::parse(&self.backend.url)
            .map_err(|source| ConfigError::Url { field: "backend.url", source })?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(ConfigError::Scheme { field: "backend.url", scheme: other.to_string() }),
        }
    }

    /// REST base, `{backend.url}{backend.api_path}`.
    pub fn api_base(&self) -> Result<Url> {
        let mut url = self.backend_url()?;
        url.set_path(&self.backend.api_path);
        Ok(url)
    }

    pub fn events_ws_url(&self) -> Result<Url> {
        match &self.backend.events_ws_url {
            Some(raw) => parse_ws("backend.events_ws_url", raw),
            None => derive_ws_url(&self.backend_url()?, &self.backend.events_path),
        }
    }

    pub fn screen_ws_url(&self) -> Result<Url> {
        match &self.backend.screen_ws_url {
            Some(raw) => parse_ws("backend.screen_ws_url", raw),
            None => derive_ws_url(&self.backend_url()?, &self.backend.screen_path),
        }
    }

    pub fn poll_interval(ms: u64) -> Duration {
        Duration::from_millis(ms)
    }
}

/// Map an http(s) origin onto the matching ws(s) URL with `path`.
/// Host and port are kept; path, query and fragment are replaced.
pub fn derive_ws_url(origin: &Url, path: &str) -> Result<Url> {
    let scheme = match origin.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => {
            return Err(ConfigError::Scheme { field: "backend.url", scheme: other.to_string() })
        }
    };
    let host = origin.host_str().unwrap_or("localhost");
    let authority = match origin.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    };
    let raw = format!("{scheme}://{authority}{path}");
    Url::parse(&raw).map_err(|source| ConfigError::Url { field: "backend.url", source })
}

fn parse_ws(field: &'static str, raw: &str) -> Result<Url> {
    let url = Url::parse(raw).map_err(|source| ConfigError::Url { field, source })?;
    match url.scheme() {
        "ws" | "wss" => Ok(url),
        other => Err(ConfigError::Scheme { field, scheme: other.to_string() }),
    }
}

fn is_yaml(path: &str) -> bool {
    matches!(
        Path::new(path).extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    )
}
