//! Query orchestration layer.
//!
//! Deduplicates and schedules the info client's read operations behind
//! stable cache keys of (operation kind, network, parameters). Poll
//! intervals are per (kind, network); a network switch invalidates every
//! cached entry unconditionally; state-changing actions invalidate only
//! the keys they affect; concurrent requests for one key coalesce to a
//! single in-flight fetch.

pub mod cache;
pub mod key;
pub mod orchestrator;

pub use cache::QueryCache;
pub use key::{QueryKey, QueryKind, QueryValue};
pub use orchestrator::Orchestrator;
