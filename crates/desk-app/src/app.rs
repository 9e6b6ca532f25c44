//! Application wiring.
//!
//! Data flow: streaming feed → BBO cache → candle aggregator, with the
//! query orchestrator covering every non-streamed read. Each poll loop
//! runs on its kind's cadence; a failed poll logs and waits for its next
//! tick. Ctrl-C tears the feed down first so no reconnect fires during
//! shutdown.

use crate::config::AppConfig;
use crate::error::AppResult;
use desk_candle::CandleAggregator;
use desk_client::InfoClient;
use desk_core::{BookTop, MidPrices, Price, SessionSlot};
use desk_feed::{BboCache, BookFeed, FeedConfig};
use desk_query::{Orchestrator, QueryKind};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Pipeline application.
pub struct Application {
    config: AppConfig,
    orchestrator: Arc<Orchestrator>,
    session: SessionSlot,
}

impl Application {
    pub fn new(config: AppConfig) -> AppResult<Self> {
        let orchestrator = Arc::new(Orchestrator::new(config.network)?);
        let mut session = SessionSlot::new();
        if let Some(user) = &config.user_address {
            session.connect(user);
            info!(user = %user, "wallet session created");
        }
        Ok(Self {
            config,
            orchestrator,
            session,
        })
    }

    pub fn orchestrator(&self) -> &Arc<Orchestrator> {
        &self.orchestrator
    }

    /// Run the pipeline until Ctrl-C.
    pub async fn run(&mut self) -> AppResult<()> {
        let network = self.config.network;
        let coin = self.config.coin.clone();
        let interval = self.config.interval();
        info!(%network, %coin, %interval, "starting desk pipeline");

        if let Ok(Some(instrument)) = self.orchestrator.instrument(&coin).await {
            info!(
                coin = %instrument.name,
                sz_decimals = instrument.sz_decimals,
                "instrument metadata loaded"
            );
        }

        // Streaming feed → BBO cache
        let (update_tx, update_rx) = mpsc::channel::<BookTop>(256);
        let feed = Arc::new(BookFeed::new(FeedConfig::new(network, &coin), update_tx));
        let bbo = Arc::new(BboCache::new());

        // BBO cache → candle aggregator
        let candle_client = Arc::new(InfoClient::new(network)?);
        let aggregator = Arc::new(CandleAggregator::new(
            candle_client,
            network,
            &coin,
            interval,
        ));

        let log_sub = bbo.subscribe(|top: &BookTop| {
            debug!(
                coin = %top.coin,
                bid = %top.best_bid,
                ask = %top.best_ask,
                mid = %top.mid(),
                "bbo"
            );
        });
        let (tick_tx, tick_rx) = mpsc::channel::<BookTop>(256);
        let tick_sub = bbo.subscribe(move |top: &BookTop| {
            // Never block the delivery context; a full channel drops the tick
            let _ = tick_tx.try_send(top.clone());
        });

        let feed_task = {
            let feed = feed.clone();
            tokio::spawn(async move { feed.run().await })
        };
        let bbo_task = tokio::spawn(bbo.clone().run(update_rx));
        let candle_task = {
            let aggregator = aggregator.clone();
            tokio::spawn(async move { aggregator.run(tick_rx).await })
        };

        let shutdown = CancellationToken::new();
        let mut poll_tasks = self.spawn_poll_loops(&bbo, &aggregator, &shutdown);

        tokio::signal::ctrl_c().await.ok();
        info!("shutting down");

        // Feed first: marks the subscription closed so pending reconnect
        // timers become no-ops, then the rest unwinds.
        feed.shutdown();
        aggregator.shutdown();
        shutdown.cancel();

        let _ = feed_task.await;
        drop(feed);
        let _ = bbo_task.await;
        log_sub.unsubscribe();
        tick_sub.unsubscribe();
        let _ = candle_task.await;
        for task in poll_tasks.drain(..) {
            let _ = task.await;
        }

        self.session.disconnect();
        info!("desk pipeline stopped");
        Ok(())
    }

    fn spawn_poll_loops(
        &self,
        bbo: &Arc<BboCache>,
        aggregator: &Arc<CandleAggregator>,
        shutdown: &CancellationToken,
    ) -> Vec<JoinHandle<()>> {
        let network = self.config.network;
        let coin = self.config.coin.clone();
        let builder = self.config.builder_address.clone();
        let mut tasks = Vec::new();

        let orch = self.orchestrator.clone();
        let mids_bbo = bbo.clone();
        let mids_coin = coin.clone();
        tasks.push(spawn_poll(
            "all_mids",
            QueryKind::AllMids.poll_interval(network),
            shutdown.clone(),
            move || {
                let orch = orch.clone();
                let bbo = mids_bbo.clone();
                let coin = mids_coin.clone();
                async move {
                    match orch.all_mids().await {
                        Ok(mids) => {
                            if let Some(mid) = current_mid(&bbo, &mids, &coin) {
                                info!(%coin, %mid, "mid price");
                            }
                        }
                        Err(e) => warn!(error = %e, "all-mids poll failed"),
                    }
                }
            },
        ));

        let agg = aggregator.clone();
        tasks.push(spawn_poll(
            "candle_tail",
            Duration::from_secs(10),
            shutdown.clone(),
            move || {
                let agg = agg.clone();
                async move {
                    if let Some(last) = agg.last_candle() {
                        debug!(
                            t = last.time,
                            o = %last.open,
                            h = %last.high,
                            l = %last.low,
                            c = %last.close,
                            "candle tail"
                        );
                    }
                }
            },
        ));

        let orch = self.orchestrator.clone();
        let referral_builder = builder.clone();
        tasks.push(spawn_poll(
            "referral",
            QueryKind::Referral.poll_interval(network),
            shutdown.clone(),
            move || {
                let orch = orch.clone();
                let builder = referral_builder.clone();
                async move {
                    match orch.referral(&builder).await {
                        Ok(summary) => debug!(
                            cum_volume = %summary.cum_volume,
                            rewards = %summary.builder_rewards,
                            "builder income"
                        ),
                        Err(e) => warn!(error = %e, "referral poll failed"),
                    }
                }
            },
        ));

        let Some(user) = self.session.current().map(|s| s.user().to_string()) else {
            return tasks;
        };

        let orch = self.orchestrator.clone();
        let account_user = user.clone();
        tasks.push(spawn_poll(
            "account_state",
            QueryKind::AccountState.poll_interval(network),
            shutdown.clone(),
            move || {
                let orch = orch.clone();
                let user = account_user.clone();
                async move {
                    match orch.account_state(&user).await {
                        Ok(snapshot) => debug!(
                            withdrawable = %snapshot.withdrawable,
                            equity = %snapshot.equity,
                            positions = snapshot.positions.len(),
                            "account state"
                        ),
                        Err(e) => warn!(error = %e, "account poll failed"),
                    }
                }
            },
        ));

        let orch = self.orchestrator.clone();
        let orders_user = user.clone();
        tasks.push(spawn_poll(
            "open_orders",
            QueryKind::OpenOrders.poll_interval(network),
            shutdown.clone(),
            move || {
                let orch = orch.clone();
                let user = orders_user.clone();
                async move {
                    match orch.open_orders(&user).await {
                        Ok(orders) => debug!(count = orders.len(), "open orders"),
                        Err(e) => warn!(error = %e, "open-orders poll failed"),
                    }
                }
            },
        ));

        let orch = self.orchestrator.clone();
        tasks.push(spawn_poll(
            "builder_fee",
            QueryKind::BuilderFee.poll_interval(network),
            shutdown.clone(),
            move || {
                let orch = orch.clone();
                let user = user.clone();
                let builder = builder.clone();
                async move {
                    match orch.builder_fee(&user, &builder).await {
                        Ok(fee) => debug!(fee = %fee.to_human(), "builder fee"),
                        Err(e) => warn!(error = %e, "builder-fee poll failed"),
                    }
                }
            },
        ));

        tasks
    }
}

/// Mid for the viewed instrument: live streamed data supersedes the polled
/// snapshot in freshness priority.
fn current_mid(bbo: &BboCache, mids: &MidPrices, coin: &str) -> Option<Price> {
    if let Some(top) = bbo.latest() {
        if top.coin == coin {
            return Some(top.mid());
        }
    }
    mids.mid(coin)
}

fn spawn_poll<F, Fut>(
    name: &'static str,
    every: Duration,
    shutdown: CancellationToken,
    mut step: F,
) -> JoinHandle<()>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                () = shutdown.cancelled() => {
                    debug!(task = name, "poll loop stopped");
                    return;
                }
                _ = ticker.tick() => step().await,
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;

    #[test]
    fn test_live_mid_supersedes_polled_snapshot() {
        let bbo = BboCache::new();
        bbo.offer(BookTop::new(
            "ETH",
            Price::new(dec!(2999)),
            Price::new(dec!(3001)),
            1,
        ));

        let mut map = HashMap::new();
        map.insert("ETH".to_string(), "2990.0".to_string());
        let mids = MidPrices(map);

        // Live feed wins for the viewed instrument
        assert_eq!(current_mid(&bbo, &mids, "ETH").unwrap().inner(), dec!(3000));
    }

    #[test]
    fn test_polled_mid_used_when_no_live_data() {
        let bbo = BboCache::new();
        let mut map = HashMap::new();
        map.insert("ETH".to_string(), "2990.0".to_string());
        let mids = MidPrices(map);

        assert_eq!(current_mid(&bbo, &mids, "ETH").unwrap().inner(), dec!(2990));
        assert!(current_mid(&bbo, &mids, "BTC").is_none());
    }

    #[test]
    fn test_live_mid_for_other_instrument_does_not_apply() {
        let bbo = BboCache::new();
        bbo.offer(BookTop::new(
            "BTC",
            Price::new(dec!(64000)),
            Price::new(dec!(64010)),
            1,
        ));

        let mut map = HashMap::new();
        map.insert("ETH".to_string(), "2990.0".to_string());
        let mids = MidPrices(map);

        // Viewed instrument is ETH; BTC's live top must not supersede it
        assert_eq!(current_mid(&bbo, &mids, "ETH").unwrap().inner(), dec!(2990));
    }

    #[tokio::test]
    async fn test_application_builds_with_session() {
        let config = AppConfig {
            user_address: Some("0xUser".to_string()),
            ..AppConfig::default()
        };
        let app = Application::new(config).unwrap();
        assert!(app.session.current().is_some());
        assert_eq!(app.orchestrator().network(), desk_core::Network::Testnet);
    }
}
