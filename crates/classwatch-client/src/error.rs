use classwatch_common::ClasswatchError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-2xx answer from the backend.
    #[error("API {status}: {path}")]
    Status { status: u16, path: String },

    #[error("Invalid URL: {0}")]
    Url(String),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}

impl ClientError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Status { status, .. } => Some(*status),
            ClientError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

impl From<ClientError> for ClasswatchError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Status { status: 404, path } => ClasswatchError::StudentNotFound(path),
            other => ClasswatchError::Backend(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
