//! Per-source failure descriptors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a source could not produce metrics in a cycle.
///
/// This is data, not control flow: it is attached to the source's
/// [`MetricsSnapshot`](crate::MetricsSnapshot) and never aborts a cycle.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FetchError {
    /// Connection or DNS failure.
    #[error("endpoint unreachable: {message}")]
    Unreachable { message: String },

    /// No complete response within the fetch timeout.
    #[error("request timed out")]
    Timeout,

    /// The endpoint answered with a non-2xx status.
    #[error("endpoint returned HTTP {code}")]
    HttpStatus { code: u16 },

    /// The body was not valid JSON, or had the wrong shape.
    #[error("malformed payload: {message}")]
    Malformed { message: String },

    /// The payload parsed but lacked a required field.
    #[error("missing required field `{field}`")]
    MissingField { field: String },
}

impl FetchError {
    /// Short machine-friendly name of the failure kind.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Unreachable { .. } => "unreachable",
            FetchError::Timeout => "timeout",
            FetchError::HttpStatus { .. } => "http_status",
            FetchError::Malformed { .. } => "malformed",
            FetchError::MissingField { .. } => "missing_field",
        }
    }
}

/// Errors produced while normalizing a raw payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum NormalizationError {
    /// A required section or numeric field is absent (dotted path).
    #[error("missing required field `{0}`")]
    MissingField(&'static str),
}

impl From<NormalizationError> for FetchError {
    fn from(err: NormalizationError) -> Self {
        match err {
            NormalizationError::MissingField(field) => FetchError::MissingField {
                field: field.to_string(),
            },
        }
    }
}
