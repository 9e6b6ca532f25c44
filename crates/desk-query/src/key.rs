//! Cache keys and typed cached values.
//!
//! A key is (operation kind, network, relevant parameters). Keys embed the
//! network so that entries from different deployments can never collide.

use desk_core::{
    AccountSnapshot, BuilderFee, Candle, CandleInterval, Fill, Instrument, MidPrices, Network,
    OpenOrder, ReferralSummary,
};
use std::time::Duration;

/// Read operation kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKind {
    AccountState,
    OpenOrders,
    Meta,
    AllMids,
    CandleSnapshot,
    BuilderFee,
    Referral,
    UserFills,
}

impl QueryKind {
    /// Poll interval for this kind on the given network.
    ///
    /// Mainnet serves the lower-latency endpoint and polls tighter where
    /// it matters; metadata changes rarely and gets a long interval on
    /// both.
    pub fn poll_interval(&self, network: Network) -> Duration {
        let secs = match (self, network) {
            (Self::AccountState, Network::Mainnet) => 1,
            (Self::AccountState, Network::Testnet) => 15,
            (Self::OpenOrders, Network::Mainnet) => 3,
            (Self::OpenOrders, Network::Testnet) => 10,
            (Self::BuilderFee, Network::Mainnet) => 5,
            (Self::BuilderFee, Network::Testnet) => 10,
            (Self::AllMids, _) => 5,
            (Self::Referral, _) => 5,
            (Self::Meta, _) => 60,
            (Self::CandleSnapshot, Network::Mainnet) => 30,
            (Self::CandleSnapshot, Network::Testnet) => 60,
            (Self::UserFills, _) => 10,
        };
        Duration::from_secs(secs)
    }
}

/// Stable cache key for one read operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    pub kind: QueryKind,
    pub network: Network,
    /// Operation parameters folded into one string (account address,
    /// "coin:interval", "user:builder").
    pub param: Option<String>,
}

impl QueryKey {
    fn new(kind: QueryKind, network: Network, param: Option<String>) -> Self {
        Self {
            kind,
            network,
            param,
        }
    }

    pub fn account_state(network: Network, user: &str) -> Self {
        Self::new(QueryKind::AccountState, network, Some(user.to_lowercase()))
    }

    pub fn open_orders(network: Network, user: &str) -> Self {
        Self::new(QueryKind::OpenOrders, network, Some(user.to_lowercase()))
    }

    pub fn meta(network: Network) -> Self {
        Self::new(QueryKind::Meta, network, None)
    }

    pub fn all_mids(network: Network) -> Self {
        Self::new(QueryKind::AllMids, network, None)
    }

    pub fn candles(network: Network, coin: &str, interval: CandleInterval) -> Self {
        Self::new(
            QueryKind::CandleSnapshot,
            network,
            Some(format!("{coin}:{interval}")),
        )
    }

    pub fn builder_fee(network: Network, user: &str, builder: &str) -> Self {
        Self::new(
            QueryKind::BuilderFee,
            network,
            Some(format!("{}:{}", user.to_lowercase(), builder.to_lowercase())),
        )
    }

    pub fn referral(network: Network, builder: &str) -> Self {
        Self::new(QueryKind::Referral, network, Some(builder.to_lowercase()))
    }

    pub fn user_fills(network: Network, user: &str) -> Self {
        Self::new(QueryKind::UserFills, network, Some(user.to_lowercase()))
    }

    /// Interval after which a cached entry is due for refetch.
    pub fn poll_interval(&self) -> Duration {
        self.kind.poll_interval(self.network)
    }
}

/// Typed value stored under a key.
#[derive(Debug, Clone)]
pub enum QueryValue {
    Account(AccountSnapshot),
    Orders(Vec<OpenOrder>),
    Meta(Vec<Instrument>),
    Mids(MidPrices),
    Candles(Vec<Candle>),
    Fee(BuilderFee),
    Referral(ReferralSummary),
    Fills(Vec<Fill>),
}
