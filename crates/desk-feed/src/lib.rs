//! Streaming order-book feed.
//!
//! Keeps one live l2Book subscription per (network, instrument) pair with:
//! - Automatic reconnection with exponential backoff (1s doubling to 30s,
//!   reset on successful open)
//! - Silent discard of malformed or foreign frames
//! - A throttled best-bid/offer cache with explicit observer registration

pub mod bbo;
pub mod connection;
pub mod error;
pub mod message;

pub use bbo::{BboCache, BboSubscription, MIN_EMIT_SPACING};
pub use connection::{BookFeed, FeedConfig, FeedState};
pub use error::{FeedError, FeedResult};
pub use message::{parse_frame, SubscribeRequest};

use std::sync::Once;

static INIT_CRYPTO: Once = Once::new();

/// Initialize the TLS crypto provider.
/// Must be called before any WebSocket connections are made.
pub fn init_crypto() {
    INIT_CRYPTO.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}
