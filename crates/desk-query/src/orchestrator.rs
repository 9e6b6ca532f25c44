//! Typed facade over the info client and the query cache.
//!
//! One orchestrator serves all read operations for the active network.
//! Every method resolves its cache key, serves a fresh entry when one
//! exists, and otherwise issues exactly one venue request no matter how
//! many callers ask concurrently. Retry policy is the next poll: a failed
//! fetch propagates its `RequestError` and caches nothing.

use crate::cache::QueryCache;
use crate::key::{QueryKey, QueryValue};
use desk_client::{InfoClient, RequestError, RequestResult};
use desk_core::{
    AccountSnapshot, BuilderFee, Candle, CandleInterval, Fill, Instrument, MidPrices, Network,
    OpenOrder, ReferralSummary,
};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::info;

fn mismatch<T>(what: &str) -> RequestResult<T> {
    Err(RequestError::Decode(format!(
        "cached value kind mismatch for {what}"
    )))
}

/// Read-side orchestrator for one active network.
pub struct Orchestrator {
    client: RwLock<Arc<InfoClient>>,
    cache: QueryCache,
}

impl Orchestrator {
    pub fn new(network: Network) -> RequestResult<Self> {
        Ok(Self {
            client: RwLock::new(Arc::new(InfoClient::new(network)?)),
            cache: QueryCache::new(network),
        })
    }

    pub fn network(&self) -> Network {
        self.cache.network()
    }

    /// Switch the active network: rebind the client to the new endpoints
    /// and invalidate every cached entry.
    pub fn switch_network(&self, network: Network) -> RequestResult<()> {
        if network == self.network() {
            return Ok(());
        }
        info!(%network, "switching network");
        *self.client.write() = Arc::new(InfoClient::new(network)?);
        self.cache.set_network(network);
        Ok(())
    }

    fn client(&self) -> Arc<InfoClient> {
        self.client.read().clone()
    }

    pub async fn account_state(&self, user: &str) -> RequestResult<AccountSnapshot> {
        let key = QueryKey::account_state(self.network(), user);
        let client = self.client();
        let user = user.to_string();
        let value = self
            .cache
            .get_or_fetch(&key, key.poll_interval(), move || async move {
                client
                    .fetch_account_snapshot(&user)
                    .await
                    .map(QueryValue::Account)
            })
            .await?;
        match value {
            QueryValue::Account(snapshot) => Ok(snapshot),
            _ => mismatch("account state"),
        }
    }

    pub async fn open_orders(&self, user: &str) -> RequestResult<Vec<OpenOrder>> {
        let key = QueryKey::open_orders(self.network(), user);
        let client = self.client();
        let user = user.to_string();
        let value = self
            .cache
            .get_or_fetch(&key, key.poll_interval(), move || async move {
                client.fetch_open_orders(&user).await.map(QueryValue::Orders)
            })
            .await?;
        match value {
            QueryValue::Orders(orders) => Ok(orders),
            _ => mismatch("open orders"),
        }
    }

    pub async fn instruments(&self) -> RequestResult<Vec<Instrument>> {
        let key = QueryKey::meta(self.network());
        let client = self.client();
        let value = self
            .cache
            .get_or_fetch(&key, key.poll_interval(), move || async move {
                client.fetch_meta().await.map(QueryValue::Meta)
            })
            .await?;
        match value {
            QueryValue::Meta(instruments) => Ok(instruments),
            _ => mismatch("instrument metadata"),
        }
    }

    /// Size precision for one symbol, from the cached universe.
    pub async fn instrument(&self, coin: &str) -> RequestResult<Option<Instrument>> {
        let instruments = self.instruments().await?;
        Ok(instruments.into_iter().find(|i| i.name == coin))
    }

    pub async fn all_mids(&self) -> RequestResult<MidPrices> {
        let key = QueryKey::all_mids(self.network());
        let client = self.client();
        let value = self
            .cache
            .get_or_fetch(&key, key.poll_interval(), move || async move {
                client.fetch_all_mids().await.map(QueryValue::Mids)
            })
            .await?;
        match value {
            QueryValue::Mids(mids) => Ok(mids),
            _ => mismatch("mid prices"),
        }
    }

    pub async fn candles(
        &self,
        coin: &str,
        interval: CandleInterval,
        start_time_ms: i64,
    ) -> RequestResult<Vec<Candle>> {
        let key = QueryKey::candles(self.network(), coin, interval);
        let client = self.client();
        let coin = coin.to_string();
        let value = self
            .cache
            .get_or_fetch(&key, key.poll_interval(), move || async move {
                client
                    .fetch_candle_snapshot(&coin, interval, start_time_ms)
                    .await
                    .map(QueryValue::Candles)
            })
            .await?;
        match value {
            QueryValue::Candles(candles) => Ok(candles),
            _ => mismatch("candles"),
        }
    }

    pub async fn builder_fee(&self, user: &str, builder: &str) -> RequestResult<BuilderFee> {
        let key = QueryKey::builder_fee(self.network(), user, builder);
        let client = self.client();
        let (user, builder) = (user.to_string(), builder.to_string());
        let value = self
            .cache
            .get_or_fetch(&key, key.poll_interval(), move || async move {
                client
                    .fetch_max_builder_fee(&user, &builder)
                    .await
                    .map(QueryValue::Fee)
            })
            .await?;
        match value {
            QueryValue::Fee(fee) => Ok(fee),
            _ => mismatch("builder fee"),
        }
    }

    pub async fn referral(&self, builder: &str) -> RequestResult<ReferralSummary> {
        let key = QueryKey::referral(self.network(), builder);
        let client = self.client();
        let builder = builder.to_string();
        let value = self
            .cache
            .get_or_fetch(&key, key.poll_interval(), move || async move {
                client.fetch_referral(&builder).await.map(QueryValue::Referral)
            })
            .await?;
        match value {
            QueryValue::Referral(summary) => Ok(summary),
            _ => mismatch("referral"),
        }
    }

    pub async fn user_fills(&self, user: &str) -> RequestResult<Vec<Fill>> {
        let key = QueryKey::user_fills(self.network(), user);
        let client = self.client();
        let user = user.to_string();
        let value = self
            .cache
            .get_or_fetch(&key, key.poll_interval(), move || async move {
                client.fetch_user_fills(&user).await.map(QueryValue::Fills)
            })
            .await?;
        match value {
            QueryValue::Fills(fills) => Ok(fills),
            _ => mismatch("user fills"),
        }
    }

    /// Last known open orders without hitting the venue.
    pub fn peek_open_orders(&self, user: &str) -> Option<Vec<OpenOrder>> {
        let key = QueryKey::open_orders(self.network(), user);
        match self.cache.peek(&key) {
            Some(QueryValue::Orders(orders)) => Some(orders),
            _ => None,
        }
    }

    /// A cancel of order `oid` settled: drop it locally right away and let
    /// the next poll confirm the removal authoritatively.
    pub fn apply_cancel(&self, user: &str, oid: u64) {
        let key = QueryKey::open_orders(self.network(), user);
        self.cache.mutate(&key, |value| {
            if let QueryValue::Orders(orders) = value {
                orders.retain(|o| o.oid != oid);
            }
        });
        self.cache.mark_stale(&key);
    }

    /// An order was placed: open orders and account state are affected.
    pub fn invalidate_after_order(&self, user: &str) {
        let network = self.network();
        self.cache.mark_stale(&QueryKey::open_orders(network, user));
        self.cache
            .mark_stale(&QueryKey::account_state(network, user));
    }

    /// Builder approval changed (approve or revoke): only the fee key is
    /// affected.
    pub fn invalidate_after_approval(&self, user: &str, builder: &str) {
        let key = QueryKey::builder_fee(self.network(), user, builder);
        self.cache.mark_stale(&key);
    }
}
