//! HTTP client module with error classification.

mod client;
mod error;

pub use client::HttpClient;
pub use error::{HttpError, classify_error};
