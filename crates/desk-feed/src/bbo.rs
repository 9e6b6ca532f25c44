//! Throttled best-bid/offer cache.
//!
//! Wraps the raw feed with a minimum inter-update spacing: updates
//! arriving faster than the spacing are dropped entirely, not queued or
//! coalesced. Observers see accepted updates in arrival order, each at
//! most once.

use desk_core::BookTop;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::debug;

/// Minimum spacing between emitted updates.
pub const MIN_EMIT_SPACING: Duration = Duration::from_millis(100);

type Observer = Arc<dyn Fn(&BookTop) + Send + Sync>;

struct Inner {
    min_spacing: Duration,
    latest: Option<BookTop>,
    last_emit: Option<Instant>,
    observers: Vec<(u64, Observer)>,
    next_id: u64,
}

/// Rate-limited snapshot of the top of book.
///
/// All offers are serialized through one drain task (see [`BboCache::run`]),
/// which is what guarantees observers never see updates out of arrival
/// order.
pub struct BboCache {
    inner: Arc<Mutex<Inner>>,
}

impl BboCache {
    pub fn new() -> Self {
        Self::with_spacing(MIN_EMIT_SPACING)
    }

    /// Cache with a custom spacing (tests).
    pub fn with_spacing(min_spacing: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                min_spacing,
                latest: None,
                last_emit: None,
                observers: Vec::new(),
                next_id: 0,
            })),
        }
    }

    /// Register an observer; it runs on the delivery context and must not
    /// block. The returned handle deregisters on drop.
    pub fn subscribe(
        &self,
        observer: impl Fn(&BookTop) + Send + Sync + 'static,
    ) -> BboSubscription {
        let mut inner = self.inner.lock();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.observers.push((id, Arc::new(observer)));
        BboSubscription {
            id,
            inner: self.inner.clone(),
        }
    }

    /// Most recent accepted snapshot.
    pub fn latest(&self) -> Option<BookTop> {
        self.inner.lock().latest.clone()
    }

    /// Offer one raw update. Returns whether it was accepted.
    ///
    /// An update inside the spacing window is discarded outright; an
    /// accepted one becomes `latest()` and is delivered to every observer
    /// exactly once.
    pub fn offer(&self, top: BookTop) -> bool {
        let now = Instant::now();
        let observers: Vec<Observer> = {
            let mut inner = self.inner.lock();
            if let Some(prev) = inner.last_emit {
                if now.duration_since(prev) < inner.min_spacing {
                    return false;
                }
            }
            inner.last_emit = Some(now);
            inner.latest = Some(top.clone());
            inner.observers.iter().map(|(_, o)| o.clone()).collect()
        };

        for observer in &observers {
            observer(&top);
        }
        true
    }

    /// Drain raw feed updates until the sender side is dropped.
    pub async fn run(self: Arc<Self>, mut updates: mpsc::Receiver<BookTop>) {
        while let Some(top) = updates.recv().await {
            self.offer(top);
        }
        debug!("bbo drain loop ended");
    }
}

impl Default for BboCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Observer registration handle; dropping it deregisters the observer.
pub struct BboSubscription {
    id: u64,
    inner: Arc<Mutex<Inner>>,
}

impl BboSubscription {
    /// Explicit deregistration (equivalent to dropping the handle).
    pub fn unsubscribe(self) {}
}

impl Drop for BboSubscription {
    fn drop(&mut self) {
        self.inner.lock().observers.retain(|(id, _)| *id != self.id);
    }
}
