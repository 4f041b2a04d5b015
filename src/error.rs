//! Error Handling
//!
//! Error type definitions used in label-sync

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Error types for label-sync
///
/// Every variant here aborts the run it occurs in. Recoverable conditions
/// (malformed catalog records, individual mutation failures) never surface
/// as an `Error`; they are filtered out or collected into the sync report.
#[derive(Error, Debug)]
pub enum Error {
    #[error("GitHub API error: {0}")]
    GitHubApi(#[from] octocrab::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration validation error: {0}")]
    ConfigValidation(String),

    #[error("Label validation error: {0}")]
    LabelValidation(String),

    #[error("Authentication failed: invalid token")]
    AuthenticationFailed,

    #[error("Invalid label color: {0} (expected 6-digit hex)")]
    InvalidLabelColor(String),
}

impl Error {
    /// Create a new configuration validation error
    pub fn config_validation<S: Into<String>>(message: S) -> Self {
        Error::ConfigValidation(message.into())
    }

    /// Create a new label validation error
    pub fn label_validation<S: Into<String>>(message: S) -> Self {
        Error::LabelValidation(message.into())
    }
}
