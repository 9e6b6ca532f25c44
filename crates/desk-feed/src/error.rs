//! Feed error types.
//!
//! These never escape the feed: disconnects drive the reconnect loop and
//! parse failures are silent discards. The enum exists so the connection
//! internals can use `?` like everything else.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("Connection closed: code={code}, reason={reason}")]
    ConnectionClosed { code: u16, reason: String },

    #[error("Stream ended")]
    StreamEnded,

    #[error("Tungstenite error: {0}")]
    Tungstenite(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type FeedResult<T> = Result<T, FeedError>;
