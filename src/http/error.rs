//! Classification of HTTP failures.

use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HttpError {
    /// HTTP 404
    #[error("Not found: {0}")]
    NotFound(String),
    /// Any other non-success status
    #[error("Error: {status}")]
    Status { status: u16, url: String },
    /// Connection failures, timeouts, TLS errors
    #[error("Request failed: {0}")]
    Transport(String),
    #[error("Failed to parse JSON response: {0}")]
    Decode(String),
}

impl HttpError {
    /// The HTTP status behind this error, if the server answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            HttpError::NotFound(_) => Some(StatusCode::NOT_FOUND.as_u16()),
            HttpError::Status { status, .. } => Some(*status),
            HttpError::Transport(_) | HttpError::Decode(_) => None,
        }
    }
}

/// Map a `reqwest` error onto the [`HttpError`] taxonomy.
pub fn classify_error(error: reqwest::Error) -> HttpError {
    let url = error
        .url()
        .map(|u| u.to_string())
        .unwrap_or_default();

    match error.status() {
        Some(StatusCode::NOT_FOUND) => HttpError::NotFound(url),
        Some(status) => HttpError::Status {
            status: status.as_u16(),
            url,
        },
        None if error.is_decode() => HttpError::Decode(error.to_string()),
        None => HttpError::Transport(error.to_string()),
    }
}
