//! Generation-tagged query cache.
//!
//! Each key owns a slot holding the last fetched value and an async fetch
//! lock. The lock is what coalesces concurrent requests: whoever holds it
//! fetches, everyone else wakes up to a fresh entry. A global generation
//! counter implements the network-switch invalidation and the
//! stale-response guard: results of fetches started under an older
//! generation are never stored.

use crate::key::{QueryKey, QueryValue};
use dashmap::DashMap;
use desk_client::RequestResult;
use desk_core::Network;
use parking_lot::RwLock;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

struct Stored {
    value: QueryValue,
    fetched_at: Instant,
    generation: u64,
    /// Set by action-scoped invalidation: the value stays readable via
    /// `peek` but the next `get_or_fetch` refetches.
    stale: bool,
}

#[derive(Default)]
struct Slot {
    fetch_lock: tokio::sync::Mutex<()>,
    stored: RwLock<Option<Stored>>,
}

impl Slot {
    fn fresh_value(&self, generation: u64, ttl: Duration) -> Option<QueryValue> {
        let guard = self.stored.read();
        let stored = guard.as_ref()?;
        if stored.stale || stored.generation != generation || stored.fetched_at.elapsed() >= ttl {
            return None;
        }
        Some(stored.value.clone())
    }
}

/// Keyed cache with coalesced fetches.
pub struct QueryCache {
    network: RwLock<Network>,
    generation: AtomicU64,
    slots: DashMap<QueryKey, Arc<Slot>>,
}

impl QueryCache {
    pub fn new(network: Network) -> Self {
        Self {
            network: RwLock::new(network),
            generation: AtomicU64::new(0),
            slots: DashMap::new(),
        }
    }

    pub fn network(&self) -> Network {
        *self.network.read()
    }

    /// Switch the active network.
    ///
    /// Endpoints and state differ per network, so every cached entry is
    /// invalidated unconditionally and in-flight fetch results from before
    /// the switch are discarded on arrival.
    pub fn set_network(&self, network: Network) {
        let mut current = self.network.write();
        if *current == network {
            return;
        }
        *current = network;
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.slots.clear();
        debug!(%network, "network switched, query cache cleared");
    }

    /// Serve the cached value when fresh, otherwise fetch and store it.
    ///
    /// Concurrent calls for the same key are coalesced to at most one
    /// in-flight fetch. The TTL is normally `key.poll_interval()`; it is a
    /// parameter so pollers and tests can tighten it.
    pub async fn get_or_fetch<F, Fut>(
        &self,
        key: &QueryKey,
        ttl: Duration,
        fetch: F,
    ) -> RequestResult<QueryValue>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = RequestResult<QueryValue>>,
    {
        let slot = self.slot(key);
        let generation = self.generation.load(Ordering::SeqCst);

        if let Some(value) = slot.fresh_value(generation, ttl) {
            return Ok(value);
        }

        let _guard = slot.fetch_lock.lock().await;

        // Whoever held the lock before us may have already refilled the
        // slot; take their result instead of fetching again.
        let started_gen = self.generation.load(Ordering::SeqCst);
        if let Some(value) = slot.fresh_value(started_gen, ttl) {
            return Ok(value);
        }

        let value = fetch().await?;

        // Stale-response guard: a network switch while the request was in
        // flight means this result describes the wrong deployment. Hand it
        // back to the caller that asked, but never cache it.
        let finished_gen = self.generation.load(Ordering::SeqCst);
        if finished_gen == started_gen {
            *slot.stored.write() = Some(Stored {
                value: value.clone(),
                fetched_at: Instant::now(),
                generation: finished_gen,
                stale: false,
            });
        } else {
            debug!(kind = ?key.kind, "discarding fetch result from stale generation");
        }

        Ok(value)
    }

    /// Last known value, fresh or not.
    pub fn peek(&self, key: &QueryKey) -> Option<QueryValue> {
        let slot = self.slots.get(key)?;
        let guard = slot.stored.read();
        guard.as_ref().map(|s| s.value.clone())
    }

    /// Action-scoped invalidation: keep the value readable but force the
    /// next `get_or_fetch` to hit the venue.
    pub fn mark_stale(&self, key: &QueryKey) {
        if let Some(slot) = self.slots.get(key) {
            if let Some(stored) = slot.stored.write().as_mut() {
                stored.stale = true;
            }
        }
    }

    /// Mutate the cached value in place (optimistic local updates).
    pub fn mutate(&self, key: &QueryKey, f: impl FnOnce(&mut QueryValue)) {
        if let Some(slot) = self.slots.get(key) {
            if let Some(stored) = slot.stored.write().as_mut() {
                f(&mut stored.value);
            }
        }
    }

    fn slot(&self, key: &QueryKey) -> Arc<Slot> {
        self.slots
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Slot::default()))
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use desk_core::MidPrices;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::Notify;

    fn mids_value() -> QueryValue {
        QueryValue::Mids(MidPrices::default())
    }

    fn test_key() -> QueryKey {
        QueryKey::all_mids(Network::Testnet)
    }

    #[tokio::test]
    async fn test_fresh_entry_served_from_cache() {
        let cache = QueryCache::new(Network::Testnet);
        let calls = AtomicUsize::new(0);
        let key = test_key();
        let ttl = Duration::from_secs(60);

        for _ in 0..3 {
            cache
                .get_or_fetch(&key, ttl, || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(mids_value())
                })
                .await
                .unwrap();
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_expired_entry_refetches() {
        let cache = QueryCache::new(Network::Testnet);
        let calls = AtomicUsize::new(0);
        let key = test_key();
        let ttl = Duration::from_millis(20);

        let fetch = || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(mids_value())
        };
        cache.get_or_fetch(&key, ttl, fetch).await.unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        cache.get_or_fetch(&key, ttl, fetch).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_concurrent_requests_coalesce() {
        let cache = Arc::new(QueryCache::new(Network::Testnet));
        let calls = Arc::new(AtomicUsize::new(0));
        let key = test_key();
        let ttl = Duration::from_secs(60);

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = cache.clone();
            let calls = calls.clone();
            let key = key.clone();
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_fetch(&key, ttl, || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(30)).await;
                        Ok(mids_value())
                    })
                    .await
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1, "one in-flight fetch per key");
    }

    #[tokio::test]
    async fn test_network_switch_invalidates_everything() {
        let cache = QueryCache::new(Network::Testnet);
        let calls = AtomicUsize::new(0);
        let key = test_key();
        let ttl = Duration::from_secs(60);

        let fetch = || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(mids_value())
        };
        cache.get_or_fetch(&key, ttl, fetch).await.unwrap();

        cache.set_network(Network::Mainnet);

        // Even the identical key must not serve the old network's value
        cache.get_or_fetch(&key, ttl, fetch).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_set_same_network_is_not_a_switch() {
        let cache = QueryCache::new(Network::Testnet);
        let calls = AtomicUsize::new(0);
        let key = test_key();
        let ttl = Duration::from_secs(60);

        let fetch = || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(mids_value())
        };
        cache.get_or_fetch(&key, ttl, fetch).await.unwrap();
        cache.set_network(Network::Testnet);
        cache.get_or_fetch(&key, ttl, fetch).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_switch_mid_flight_discards_result() {
        let cache = Arc::new(QueryCache::new(Network::Testnet));
        let key = test_key();
        let ttl = Duration::from_secs(60);

        let started = Arc::new(Notify::new());
        let proceed = Arc::new(Notify::new());

        let fetcher_cache = cache.clone();
        let fetcher_key = key.clone();
        let (s, p) = (started.clone(), proceed.clone());
        let fetch_task = tokio::spawn(async move {
            fetcher_cache
                .get_or_fetch(&fetcher_key, ttl, || async move {
                    s.notify_one();
                    p.notified().await;
                    Ok(mids_value())
                })
                .await
        });

        started.notified().await;
        cache.set_network(Network::Mainnet);
        proceed.notify_one();

        // The caller still gets its value...
        let result = fetch_task.await.unwrap();
        assert!(result.is_ok());

        // ...but the stale-generation result was never cached
        assert!(cache.peek(&key).is_none());
    }

    #[tokio::test]
    async fn test_mark_stale_forces_refetch_but_keeps_peek() {
        let cache = QueryCache::new(Network::Testnet);
        let calls = AtomicUsize::new(0);
        let key = test_key();
        let ttl = Duration::from_secs(60);

        let fetch = || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(mids_value())
        };
        cache.get_or_fetch(&key, ttl, fetch).await.unwrap();

        cache.mark_stale(&key);
        assert!(cache.peek(&key).is_some(), "stale value stays peekable");

        cache.get_or_fetch(&key, ttl, fetch).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_fetch_error_propagates_and_caches_nothing() {
        let cache = QueryCache::new(Network::Testnet);
        let key = test_key();
        let ttl = Duration::from_secs(60);

        let result = cache
            .get_or_fetch(&key, ttl, || async {
                Err(desk_client::RequestError::Status {
                    status: 503,
                    body: "unavailable".to_string(),
                })
            })
            .await;

        assert!(result.is_err());
        assert!(cache.peek(&key).is_none());
    }
}
