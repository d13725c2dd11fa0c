//! Error types for adapters.

use rigwatch_types::{FetchError, NormalizationError};
use thiserror::Error;

/// Errors that can occur when collecting metrics from an endpoint.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// HTTP request failed for a reason other than connect or timeout.
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// Endpoint answered with a non-success status.
    #[error("endpoint returned status {0}")]
    Status(u16),

    /// Failed to parse response.
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// Payload parsed but could not be normalized.
    #[error(transparent)]
    Normalize(#[from] NormalizationError),

    /// Connection failed.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Timeout waiting for response.
    #[error("Request timed out")]
    Timeout,

    /// The HTTP client could not be constructed.
    #[error("Failed to build HTTP client: {0}")]
    Client(String),
}

impl From<reqwest::Error> for AdapterError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AdapterError::Timeout
        } else if err.is_connect() {
            AdapterError::Connection(err.to_string())
        } else if err.is_decode() {
            AdapterError::Parse(err.to_string())
        } else {
            AdapterError::Http(err.to_string())
        }
    }
}

impl From<AdapterError> for FetchError {
    fn from(err: AdapterError) -> Self {
        match err {
            AdapterError::Timeout => FetchError::Timeout,
            AdapterError::Status(code) => FetchError::HttpStatus { code },
            AdapterError::Parse(message) => FetchError::Malformed { message },
            AdapterError::Normalize(err) => err.into(),
            AdapterError::Connection(message)
            | AdapterError::Http(message)
            | AdapterError::Client(message) => FetchError::Unreachable { message },
        }
    }
}
