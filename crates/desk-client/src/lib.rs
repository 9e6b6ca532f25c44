//! Read-only venue info client.
//!
//! Every read operation is one `POST {api}/info` request with a
//! `{"type": ...}` body, returning a strongly-typed result or a
//! `RequestError`. No retries are performed here; retry policy belongs
//! to the query orchestration layer.

pub mod client;
pub mod error;
pub mod types;

pub use client::InfoClient;
pub use error::{RequestError, RequestResult};
pub use types::{
    AssetPositionData, AssetPositionEntry, ClearinghouseStateResponse, MarginSummary,
    MetaResponse, RawAssetMeta, RawCandle, RawFill, RawOpenOrder, RawReferral,
};
