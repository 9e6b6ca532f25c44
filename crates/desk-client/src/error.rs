//! Client error types.

use thiserror::Error;

/// Failure of a single read call.
///
/// Surfaced to the caller as-is; the poller's next scheduled tick is the
/// retry policy.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Response decode error: {0}")]
    Decode(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type RequestResult<T> = Result<T, RequestError>;
