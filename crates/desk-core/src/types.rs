//! Market and account data types.
//!
//! Contains the order-book top-level update (`BookTop`), the OHLC candle
//! types, and the polled account/venue state (`AccountSnapshot`,
//! `OpenOrder`, `Instrument`).

use crate::error::CoreError;
use crate::{Price, Size};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Order side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    /// Parse the venue's single-letter side code ("B" = buy/bid, "A" = ask).
    pub fn from_venue_code(code: &str) -> Result<Self, CoreError> {
        match code {
            "B" => Ok(Self::Buy),
            "A" => Ok(Self::Sell),
            other => Err(CoreError::InvalidSide(other.to_string())),
        }
    }
}

impl std::fmt::Display for OrderSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Buy => write!(f, "Buy"),
            Self::Sell => write!(f, "Sell"),
        }
    }
}

/// Top-of-book update from the streaming feed.
///
/// Transient: replaced wholesale by each new accepted message,
/// never partially merged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookTop {
    /// Source instrument symbol.
    pub coin: String,
    /// Best bid price.
    pub best_bid: Price,
    /// Best ask price.
    pub best_ask: Price,
    /// Venue timestamp in milliseconds, or local receipt time if absent.
    pub time_ms: i64,
}

impl BookTop {
    pub fn new(coin: impl Into<String>, best_bid: Price, best_ask: Price, time_ms: i64) -> Self {
        Self {
            coin: coin.into(),
            best_bid,
            best_ask,
            time_ms,
        }
    }

    /// Midpoint: arithmetic mean of best bid and best ask.
    #[inline]
    pub fn mid(&self) -> Price {
        Price::midpoint(self.best_bid, self.best_ask)
    }

    /// Update timestamp in whole seconds (candle bucket arithmetic).
    #[inline]
    pub fn time_secs(&self) -> i64 {
        self.time_ms / 1000
    }
}

/// Candle bucket duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CandleInterval {
    /// 1 hour.
    H1,
    /// 4 hours.
    H4,
    /// 1 day.
    D1,
}

impl CandleInterval {
    /// Bucket duration in seconds.
    pub fn duration_secs(&self) -> i64 {
        match self {
            Self::H1 => 3_600,
            Self::H4 => 14_400,
            Self::D1 => 86_400,
        }
    }

    /// Venue interval tag.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::H1 => "1h",
            Self::H4 => "4h",
            Self::D1 => "1d",
        }
    }

    /// Parse a venue interval tag. Unrecognized tags fall back to 1h.
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "4h" => Self::H4,
            "1d" => Self::D1,
            _ => Self::H1,
        }
    }

    /// Floor-align a timestamp (seconds) to the start of its bucket.
    #[inline]
    pub fn bucket_start(&self, time_secs: i64) -> i64 {
        let d = self.duration_secs();
        (time_secs / d) * d
    }
}

impl std::fmt::Display for CandleInterval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.tag())
    }
}

/// One OHLC candle.
///
/// `time` is the bucket start in seconds, aligned to the containing
/// interval. Series are ordered by `time`, strictly increasing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candle {
    /// Bucket start time (seconds).
    pub time: i64,
    pub open: Price,
    pub high: Price,
    pub low: Price,
    pub close: Price,
}

impl Candle {
    /// Single-tick candle: open = high = low = close.
    pub fn from_tick(time: i64, px: Price) -> Self {
        Self {
            time,
            open: px,
            high: px,
            low: px,
            close: px,
        }
    }
}

/// Mid prices for all instruments, keyed by symbol.
///
/// Values are the venue's decimal strings; parse on access.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MidPrices(pub HashMap<String, String>);

impl MidPrices {
    /// Parsed mid for one symbol, if present and well-formed.
    pub fn mid(&self, coin: &str) -> Option<Price> {
        self.0.get(coin).and_then(|s| s.parse().ok())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Position direction, derived from the venue's signed size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionSide {
    Long,
    Short,
}

impl PositionSide {
    /// Side from a signed size. Zero sizes have no side.
    pub fn from_signed(szi: Decimal) -> Option<Self> {
        if szi.is_zero() {
            None
        } else if szi.is_sign_positive() {
            Some(Self::Long)
        } else {
            Some(Self::Short)
        }
    }
}

impl std::fmt::Display for PositionSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Long => write!(f, "Long"),
            Self::Short => write!(f, "Short"),
        }
    }
}

/// One open position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub coin: String,
    pub side: PositionSide,
    /// Unsigned magnitude.
    pub size: Size,
    pub entry_px: Option<Price>,
    pub unrealized_pnl: Decimal,
}

/// Account state, replaced wholesale on each poll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountSnapshot {
    /// Withdrawable balance (USD).
    pub withdrawable: Decimal,
    /// Total account equity (USD).
    pub equity: Decimal,
    /// Open positions; zero-size entries are filtered out.
    pub positions: Vec<Position>,
}

/// One resting order, keyed by venue-assigned order id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenOrder {
    pub coin: String,
    /// Venue-assigned id, unique per account.
    pub oid: u64,
    pub side: OrderSide,
    pub size: Size,
    pub limit_px: Price,
    /// Submission time (milliseconds).
    pub timestamp_ms: i64,
}

/// Instrument metadata from the venue universe.
///
/// Read-only; metadata changes rarely and is refreshed on a long interval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instrument {
    /// Symbol (e.g. "ETH").
    pub name: String,
    /// Maximum fractional digits for order sizes.
    pub sz_decimals: u8,
}

/// One historical fill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fill {
    pub coin: String,
    pub px: Price,
    pub sz: Size,
    pub side: OrderSide,
    pub time_ms: i64,
}

/// Builder referral/income totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferralSummary {
    /// Cumulative referred volume (USD).
    pub cum_volume: Decimal,
    /// Accumulated builder rewards (USD).
    pub builder_rewards: Decimal,
}

/// Builder fee rate in tenths of a basis point (the venue's unit).
///
/// Zero means the user has not approved the builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BuilderFee(pub u32);

impl BuilderFee {
    pub fn is_approved(&self) -> bool {
        self.0 > 0
    }

    /// Human-readable form, e.g. "10 (1 bps = 0.0100%)".
    pub fn to_human(&self) -> String {
        let bps = self.0 as f64 / 10.0;
        let pct = self.0 as f64 / 1000.0;
        format!("{} ({} bps = {:.4}%)", self.0, bps, pct)
    }

    /// Percentage string in the form the signing collaborator expects.
    pub fn to_percent(&self) -> String {
        format!("{:.4}%", self.0 as f64 / 1000.0)
    }
}
