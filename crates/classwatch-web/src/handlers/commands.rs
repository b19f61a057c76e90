//! Command form posts. Each one redirects back with a `status` flash.

use axum::{
    extract::{Path, State},
    response::Redirect,
    Form,
};
use classwatch_common::{ClasswatchError, LockMode};
use serde::Deserialize;
use tracing::{info, warn};

use crate::render::seg;
use crate::state::SharedState;

#[derive(Debug, Default, Deserialize)]
pub struct LockForm {
    /// `soft` or `hard`; anything else is rejected before the backend is called.
    #[serde(default)]
    pub mode: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct UrlForm {
    #[serde(default)]
    pub url: String,
}

/// Trimmed URL, or an error when nothing was entered.
pub fn validate_url(raw: &str) -> Result<&str, ClasswatchError> {
    let url = raw.trim();
    if url.is_empty() {
        return Err(ClasswatchError::InvalidInput("Enter a URL first".to_string()));
    }
    Ok(url)
}

/// `path?status=...` plus `level=error` on failure.
pub fn redirect_with(path: &str, status: &str, ok: bool) -> Redirect {
    let mut query = url::form_urlencoded::Serializer::new(String::new());
    query.append_pair("status", status);
    if !ok {
        query.append_pair("level", "error");
    }
    Redirect::to(&format!("{}?{}", path, query.finish()))
}

fn failed(action: &str, err: impl Into<ClasswatchError>) -> String {
    format!("{action} failed: {}", err.into().user_message())
}

pub async fn lock_student(
    State(state): State<SharedState>,
    Path(hostname): Path<String>,
    Form(form): Form<LockForm>,
) -> Redirect {
    let back = format!("/students/{}", seg(&hostname));
    let mode = match form.mode.parse::<LockMode>() {
        Ok(mode) => mode,
        Err(e) => return redirect_with(&back, &e.user_message(), false),
    };
    match state.api.lock(&hostname, mode).await {
        Ok(()) => {
            info!(hostname = %hostname, mode = mode.as_str(), "lock sent");
            redirect_with(&back, &format!("{} lock sent", mode.as_str()), true)
        }
        Err(e) => {
            warn!(hostname = %hostname, error = %e, "lock failed");
            redirect_with(&back, &failed("Lock", e), false)
        }
    }
}

pub async fn open_url(
    State(state): State<SharedState>,
    Path(hostname): Path<String>,
    Form(form): Form<UrlForm>,
) -> Redirect {
    let back = format!("/students/{}", seg(&hostname));
    let url = match validate_url(&form.url) {
        Ok(url) => url,
        Err(e) => return redirect_with(&back, &e.user_message(), false),
    };
    match state.api.open_url(&hostname, url).await {
        Ok(()) => {
            info!(hostname = %hostname, url, "open-url sent");
            redirect_with(&back, "Page opened", true)
        }
        Err(e) => {
            warn!(hostname = %hostname, error = %e, "open-url failed");
            redirect_with(&back, &failed("Open URL", e), false)
        }
    }
}

pub async fn broadcast_open_url(
    State(state): State<SharedState>,
    Form(form): Form<UrlForm>,
) -> Redirect {
    let url = match validate_url(&form.url) {
        Ok(url) => url,
        Err(e) => return redirect_with("/students", &e.user_message(), false),
    };
    match state.api.broadcast_open_url(url).await {
        Ok(()) => {
            info!(url, "broadcast open-url sent");
            redirect_with("/students", "Page opened on all computers", true)
        }
        Err(e) => {
            warn!(error = %e, "broadcast open-url failed");
            redirect_with("/students", &failed("Broadcast", e), false)
        }
    }
}
