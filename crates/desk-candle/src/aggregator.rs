//! Live candle aggregation task.
//!
//! One aggregator owns the series for one (network, instrument, interval)
//! key. Changing any part of the key means tearing the aggregator down and
//! constructing a new one: the fresh instance starts with an empty
//! baseline and ignores ticks until its first successful fetch, so live
//! mutation stays blocked until the new baseline arrives.

use crate::series::{CandleSeries, TickOutcome};
use chrono::Utc;
use desk_client::{InfoClient, RequestResult};
use desk_core::{BookTop, Candle, CandleInterval, Network};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Historical baseline lookback: 7 days.
pub const CANDLE_LOOKBACK_MS: i64 = 7 * 24 * 60 * 60 * 1000;

/// Continuously-updating candle series for one key.
pub struct CandleAggregator {
    client: Arc<InfoClient>,
    coin: String,
    refresh_every: Duration,
    series: Mutex<CandleSeries>,
    shutdown_token: CancellationToken,
}

impl CandleAggregator {
    pub fn new(
        client: Arc<InfoClient>,
        network: Network,
        coin: impl Into<String>,
        interval: CandleInterval,
    ) -> Self {
        Self {
            client,
            coin: coin.into(),
            refresh_every: network.candle_refresh(),
            series: Mutex::new(CandleSeries::new(interval)),
            shutdown_token: CancellationToken::new(),
        }
    }

    pub fn coin(&self) -> &str {
        &self.coin
    }

    pub fn interval(&self) -> CandleInterval {
        self.series.lock().interval()
    }

    /// Copy of the current series.
    pub fn snapshot(&self) -> Vec<Candle> {
        self.series.lock().candles().to_vec()
    }

    pub fn last_candle(&self) -> Option<Candle> {
        self.series.lock().last().copied()
    }

    /// Fold one accepted BBO update into the series.
    pub fn apply_tick(&self, top: &BookTop) -> TickOutcome {
        let outcome = self.series.lock().apply_tick(top.time_secs(), top.mid());
        debug!(
            coin = %self.coin,
            time_secs = top.time_secs(),
            mid = %top.mid(),
            ?outcome,
            "candle tick"
        );
        outcome
    }

    /// Tear the aggregator down; the running task exits and no further
    /// fetches are issued.
    pub fn shutdown(&self) {
        self.shutdown_token.cancel();
    }

    /// Run the refresh/merge loop until shutdown.
    ///
    /// The baseline is fetched immediately, then on the network's cadence;
    /// a failed fetch keeps the stale baseline and waits for the next
    /// scheduled tick. Live ticks arrive through `ticks` (fed by a BBO
    /// cache observer).
    pub async fn run(&self, mut ticks: mpsc::Receiver<BookTop>) {
        let mut refresh = tokio::time::interval(self.refresh_every);
        refresh.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                () = self.shutdown_token.cancelled() => {
                    return;
                }

                _ = refresh.tick() => {
                    match self.refresh_baseline().await {
                        Ok(count) => {
                            debug!(coin = %self.coin, candles = count, "baseline refreshed");
                        }
                        Err(e) => {
                            warn!(coin = %self.coin, error = %e, "baseline fetch failed");
                        }
                    }
                }

                tick = ticks.recv() => {
                    match tick {
                        Some(top) => {
                            self.apply_tick(&top);
                        }
                        None => {
                            debug!(coin = %self.coin, "tick channel closed");
                            return;
                        }
                    }
                }
            }
        }
    }

    async fn refresh_baseline(&self) -> RequestResult<usize> {
        let interval = self.interval();
        let start_time_ms = Utc::now().timestamp_millis() - CANDLE_LOOKBACK_MS;
        let candles = self
            .client
            .fetch_candle_snapshot(&self.coin, interval, start_time_ms)
            .await?;

        // Discard stale results: the key may have been torn down while the
        // request was in flight.
        if self.shutdown_token.is_cancelled() {
            return Ok(0);
        }

        let count = candles.len();
        self.series.lock().replace_baseline(candles);
        Ok(count)
    }
}
