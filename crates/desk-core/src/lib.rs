//! Core domain types for the market-data desk pipeline.
//!
//! This crate provides the types shared by every layer of the pipeline:
//! - `Network`: testnet/mainnet selector with endpoint tables
//! - `Price`, `Size`: precision-safe numeric types
//! - `BookTop`, `Candle`, `CandleInterval`: streamed market data
//! - `AccountSnapshot`, `OpenOrder`, `Instrument`: polled venue state
//! - `SessionContext`: explicitly owned wallet-session state

pub mod decimal;
pub mod error;
pub mod network;
pub mod session;
pub mod types;

pub use decimal::{Price, Size};
pub use error::{CoreError, Result};
pub use network::Network;
pub use session::{SessionContext, SessionSlot};
pub use types::{
    AccountSnapshot, BookTop, BuilderFee, Candle, CandleInterval, Fill, Instrument, MidPrices,
    OpenOrder, OrderSide, Position, PositionSide, ReferralSummary,
};
