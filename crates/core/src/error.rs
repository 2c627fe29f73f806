//! Unified error taxonomy for validation, decoding and transport.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Application error reported inside a response body under the reserved
/// top-level `"error"` key. Some upstream services report failures this way
/// even when the HTTP status is 200.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub code: i64,
    pub message: String,
    #[serde(default)]
    pub details: Vec<String>,
}

impl fmt::Display for ErrorEnvelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let details: Vec<String> = self.details.iter().map(|d| format!("'{d}'")).collect();
        write!(
            f,
            "code: {}, message: '{}', details: [{}]",
            self.code,
            self.message,
            details.join(",")
        )
    }
}

/// Everything that can go wrong between a caller and the service, as
/// matchable variants rather than opaque strings.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A caller-declared record shape is malformed, or a response body lacks
    /// a required discriminator.
    #[error("{0}")]
    Structural(String),

    /// A declared member disagrees with the layer schema.
    #[error("field '{name}' has type '{actual}' but expected type '{expected}'")]
    Mismatch {
        name: String,
        expected: String,
        actual: String,
    },

    /// A schema or wire discriminator outside the known variant set.
    #[error("unhandled {what}: '{value}'")]
    UnhandledVariant { what: &'static str, value: String },

    /// The requested resource does not exist (HTTP 404).
    #[error("not found")]
    NotFound,

    /// Error envelope embedded in an otherwise successful response.
    #[error(transparent)]
    Service(#[from] ErrorEnvelope),

    /// Non-success HTTP status other than 404.
    #[error("unhandled status code: {0}")]
    Status(u16),

    /// Connection-level failure from the HTTP client.
    #[error("transport: {0}")]
    Transport(String),

    /// Response body was not valid JSON, or a typed decode failed.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Check a decoded response body for the reserved `"error"` key and lift it
/// into [`Error::Service`]. Every decoder runs this before attempting its
/// expected success shape.
pub fn extract_service_error(body: &serde_json::Value) -> Result<()> {
    match body.get("error") {
        Some(raw) => Err(Error::Service(serde_json::from_value(raw.clone())?)),
        None => Ok(()),
    }
}
