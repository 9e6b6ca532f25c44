//! Order-book feed connection manager.
//!
//! Owns exactly one subscription per (network, instrument) pair and
//! re-establishes it after any disconnect. The cycle
//! `connecting → open → closed-pending-retry → connecting → ...` has no
//! terminal state while the feed is alive; only `shutdown()` ends it, at
//! which point any pending reconnect timer becomes a no-op.

use crate::error::{FeedError, FeedResult};
use crate::message::{parse_frame, SubscribeRequest};
use chrono::Utc;
use desk_core::{BookTop, Network};
use futures_util::{SinkExt, StreamExt};
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Initial reconnect delay.
const INITIAL_BACKOFF: Duration = Duration::from_millis(1000);

/// Reconnect delay cap.
const MAX_BACKOFF: Duration = Duration::from_millis(30_000);

/// Feed configuration.
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// WebSocket URL.
    pub ws_url: String,
    /// Instrument symbol to subscribe to.
    pub coin: String,
    /// Base delay for exponential backoff.
    pub initial_backoff: Duration,
    /// Maximum delay for exponential backoff.
    pub max_backoff: Duration,
}

impl FeedConfig {
    /// Config for one (network, instrument) pair with default backoff.
    pub fn new(network: Network, coin: impl Into<String>) -> Self {
        Self {
            ws_url: network.ws_url().to_string(),
            coin: coin.into(),
            initial_backoff: INITIAL_BACKOFF,
            max_backoff: MAX_BACKOFF,
        }
    }
}

/// Connection state, owned exclusively by one `BookFeed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedState {
    Connecting,
    Open,
    ClosedPendingRetry,
}

/// Streaming order-book feed for a single instrument.
///
/// Parsed updates are pushed into the channel handed to [`BookFeed::new`];
/// the receiver (normally a [`crate::BboCache`] drain task) must keep up
/// so delivery never blocks the read loop for long.
pub struct BookFeed {
    config: FeedConfig,
    state: Arc<RwLock<FeedState>>,
    update_tx: mpsc::Sender<BookTop>,
    shutdown_token: CancellationToken,
}

impl BookFeed {
    pub fn new(config: FeedConfig, update_tx: mpsc::Sender<BookTop>) -> Self {
        Self {
            config,
            state: Arc::new(RwLock::new(FeedState::Connecting)),
            update_tx,
            shutdown_token: CancellationToken::new(),
        }
    }

    /// Current connection state.
    pub fn state(&self) -> FeedState {
        *self.state.read()
    }

    /// Tear the subscription down.
    ///
    /// Marks the feed closed synchronously: a reconnect timer that is
    /// already sleeping wakes as a no-op and issues no further sends.
    pub fn shutdown(&self) {
        info!(coin = %self.config.coin, "feed shutdown requested");
        self.shutdown_token.cancel();
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown_token.is_cancelled()
    }

    /// Run the reconnect loop until `shutdown()` is called.
    ///
    /// Stream errors never escape: a disconnect schedules the next attempt
    /// after `min(initial * 2^(k-1), max)` for k consecutive failures, and
    /// the delay resets on every successful open.
    pub async fn run(&self) {
        let mut failures = 0u32;

        loop {
            if self.is_shutdown() {
                return;
            }

            *self.state.write() = FeedState::Connecting;

            match self.session(&mut failures).await {
                Ok(()) => {
                    // Session only returns Ok on shutdown
                    return;
                }
                Err(e) => {
                    debug!(coin = %self.config.coin, error = %e, "stream disconnected");
                }
            }

            if self.is_shutdown() {
                return;
            }

            failures += 1;
            *self.state.write() = FeedState::ClosedPendingRetry;

            let delay = backoff_delay(
                self.config.initial_backoff,
                self.config.max_backoff,
                failures,
            );
            warn!(
                coin = %self.config.coin,
                attempt = failures,
                delay_ms = delay.as_millis(),
                "reconnecting"
            );

            tokio::select! {
                () = tokio::time::sleep(delay) => {}
                () = self.shutdown_token.cancelled() => {
                    return;
                }
            }
        }
    }

    /// One connection lifetime: connect, subscribe, pump frames.
    async fn session(&self, failures: &mut u32) -> FeedResult<()> {
        debug!(url = %self.config.ws_url, coin = %self.config.coin, "connecting");

        let connect = connect_async(&self.config.ws_url);
        let (ws_stream, _response) = tokio::select! {
            result = connect => result?,
            () = self.shutdown_token.cancelled() => return Ok(()),
        };
        let (mut write, mut read) = ws_stream.split();

        *self.state.write() = FeedState::Open;
        *failures = 0;
        info!(coin = %self.config.coin, "feed connected");

        let subscribe = serde_json::to_string(&SubscribeRequest::l2_book(&self.config.coin))?;
        write.send(Message::Text(subscribe)).await?;

        loop {
            tokio::select! {
                () = self.shutdown_token.cancelled() => {
                    if let Err(e) = write.send(Message::Close(None)).await {
                        debug!(error = %e, "close frame not delivered");
                    }
                    return Ok(());
                }

                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            self.handle_text(&text).await;
                        }
                        Some(Ok(Message::Ping(data))) => {
                            write.send(Message::Pong(data)).await?;
                        }
                        Some(Ok(Message::Close(frame))) => {
                            let (code, reason) = frame
                                .map(|f| (f.code.into(), f.reason.to_string()))
                                .unwrap_or((1000, "normal close".to_string()));
                            return Err(FeedError::ConnectionClosed { code, reason });
                        }
                        Some(Err(e)) => {
                            return Err(e.into());
                        }
                        None => {
                            return Err(FeedError::StreamEnded);
                        }
                        _ => {}
                    }
                }
            }
        }
    }

    /// Deliver one accepted frame; everything else is an ignored frame.
    async fn handle_text(&self, text: &str) {
        let Some(top) = parse_frame(text, Utc::now().timestamp_millis()) else {
            return;
        };
        if self.update_tx.send(top).await.is_err() {
            // Receiver gone: nobody is consuming this feed any more.
            warn!(coin = %self.config.coin, "update receiver dropped, shutting feed down");
            self.shutdown_token.cancel();
        }
    }
}

/// Reconnect delay before attempt k+1 after k consecutive failures:
/// `min(initial * 2^(k-1), max)`.
fn backoff_delay(initial: Duration, max: Duration, failures: u32) -> Duration {
    let exponent = failures.saturating_sub(1).min(16);
    let millis = (initial.as_millis() as u64).saturating_mul(1u64 << exponent);
    Duration::from_millis(millis).min(max)
}
