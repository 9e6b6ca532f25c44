//! Incremental OHLC candle aggregation.
//!
//! Merges a periodically re-fetched historical candle snapshot with live
//! streamed midpoint ticks, so the last candle moves without waiting for
//! the next full poll.

pub mod aggregator;
pub mod series;

pub use aggregator::{CandleAggregator, CANDLE_LOOKBACK_MS};
pub use series::{CandleSeries, TickOutcome};
