//! Frame parsing for the l2Book stream.
//!
//! Only frames shaped
//! `{"channel":"l2Book","data":{"coin":..,"levels":[[bid..],[ask..]],"time":ms}}`
//! with both level lists non-empty are consumed. Everything else (other
//! channels, missing sides, malformed JSON) is discarded without error.

use desk_core::{BookTop, Price};
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Channel tag of the order-book stream.
const BOOK_CHANNEL: &str = "l2Book";

/// Significant figures requested for book levels.
const N_SIG_FIGS: u8 = 5;

/// Subscription request sent once per (re)connect.
#[derive(Debug, Serialize)]
pub struct SubscribeRequest {
    method: &'static str,
    subscription: BookSubscription,
}

#[derive(Debug, Serialize)]
struct BookSubscription {
    #[serde(rename = "type")]
    sub_type: &'static str,
    coin: String,
    #[serde(rename = "nSigFigs")]
    n_sig_figs: u8,
}

impl SubscribeRequest {
    /// l2Book subscription for one instrument at fixed precision.
    pub fn l2_book(coin: &str) -> Self {
        Self {
            method: "subscribe",
            subscription: BookSubscription {
                sub_type: BOOK_CHANNEL,
                coin: coin.to_string(),
                n_sig_figs: N_SIG_FIGS,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct BookData {
    coin: String,
    /// `levels[0]` = bids (best first), `levels[1]` = asks (best first).
    levels: Vec<Vec<BookLevel>>,
    #[serde(default)]
    time: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct BookLevel {
    px: String,
}

/// Parse one inbound text frame into a top-of-book update.
///
/// Returns `None` for every frame that is not a complete l2Book update;
/// this is an ignored frame, not an error. `local_recv_ms` stands in for
/// the venue timestamp when the frame carries none.
pub fn parse_frame(text: &str, local_recv_ms: i64) -> Option<BookTop> {
    let frame: serde_json::Value = match serde_json::from_str(text) {
        Ok(v) => v,
        Err(_) => {
            trace!("discarding malformed frame");
            return None;
        }
    };

    if frame.get("channel").and_then(|c| c.as_str()) != Some(BOOK_CHANNEL) {
        return None;
    }

    let data: BookData = serde_json::from_value(frame.get("data")?.clone()).ok()?;

    // Only the top level of each side is read.
    let best_bid: Price = data.levels.first()?.first()?.px.parse().ok()?;
    let best_ask: Price = data.levels.get(1)?.first()?.px.parse().ok()?;

    Some(BookTop::new(
        data.coin,
        best_bid,
        best_ask,
        data.time.unwrap_or(local_recv_ms),
    ))
}
