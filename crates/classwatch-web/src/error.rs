//! HTTP error mapping for JSON endpoints.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use classwatch_client::ClientError;
use classwatch_common::ClasswatchError;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    /// The teacher backend could not be reached or answered badly.
    #[error("no connection to server")]
    Upstream(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Upstream(detail) = &self {
            tracing::warn!("Upstream failure: {}", detail);
        }
        (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}

impl From<ClientError> for ApiError {
    fn from(err: ClientError) -> Self {
        ApiError::Upstream(err.to_string())
    }
}

impl From<ClasswatchError> for ApiError {
    fn from(err: ClasswatchError) -> Self {
        match err {
            ClasswatchError::StudentNotFound(what) => ApiError::NotFound(what),
            ClasswatchError::InvalidInput(msg) => ApiError::BadRequest(msg),
            ClasswatchError::Backend(msg) => ApiError::Upstream(msg),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<minijinja::Error> for ApiError {
    fn from(err: minijinja::Error) -> Self {
        ApiError::Internal(format!("template: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_error_text_and_status() {
        let err = ApiError::from(ClientError::Url("x".into()));
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(err.to_string(), "no connection to server");
    }

    #[test]
    fn test_not_found_maps_from_common_error() {
        let err = ApiError::from(ClasswatchError::StudentNotFound("pc-9".into()));
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }
}
