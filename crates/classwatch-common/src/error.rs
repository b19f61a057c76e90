use thiserror::Error;

/// Text shown to the operator whenever the backend cannot be reached.
pub const NO_CONNECTION: &str = "No connection to server";

#[derive(Debug, Error)]
pub enum ClasswatchError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Student not found: {0}")]
    StudentNotFound(String),

    #[error("Backend unavailable: {0}")]
    Backend(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ClasswatchError {
    /// Message suitable for rendering in a page. Backend failures collapse to
    /// the generic connection text; everything else keeps its description.
    pub fn user_message(&self) -> String {
        match self {
            ClasswatchError::Backend(_) => NO_CONNECTION.to_string(),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ClasswatchError>;
