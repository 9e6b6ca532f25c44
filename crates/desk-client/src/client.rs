//! HTTP client for the venue read API.
//!
//! One method per read operation. Each call is a single request with no
//! internal retries; failures surface as `RequestError` and the caller
//! (normally the query layer's poller) decides what to do on its next tick.

use crate::error::{RequestError, RequestResult};
use crate::types::{
    ClearinghouseStateResponse, MetaResponse, RawCandle, RawFill, RawOpenOrder, RawReferral,
};
use desk_core::{
    AccountSnapshot, BuilderFee, Candle, CandleInterval, Fill, Instrument, MidPrices, Network,
    OpenOrder, ReferralSummary,
};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

/// Default timeout for info requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Serialize)]
struct InfoRequest {
    #[serde(rename = "type")]
    request_type: &'static str,
}

#[derive(Debug, Serialize)]
struct InfoRequestWithUser {
    #[serde(rename = "type")]
    request_type: &'static str,
    user: String,
}

#[derive(Debug, Serialize)]
struct MaxBuilderFeeRequest {
    #[serde(rename = "type")]
    request_type: &'static str,
    user: String,
    builder: String,
}

#[derive(Debug, Serialize)]
struct CandleSnapshotRequest {
    #[serde(rename = "type")]
    request_type: &'static str,
    req: CandleSnapshotParams,
}

#[derive(Debug, Serialize)]
struct CandleSnapshotParams {
    coin: String,
    interval: &'static str,
    #[serde(rename = "startTime")]
    start_time: i64,
}

/// Read-only client bound to one network's info endpoint.
pub struct InfoClient {
    client: Client,
    network: Network,
    info_url: String,
}

impl InfoClient {
    /// Client for the given network's configured endpoint.
    pub fn new(network: Network) -> RequestResult<Self> {
        Self::with_info_url(network, network.info_url())
    }

    /// Client against an explicit info URL (tests, proxies).
    pub fn with_info_url(network: Network, info_url: impl Into<String>) -> RequestResult<Self> {
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| RequestError::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            network,
            info_url: info_url.into(),
        })
    }

    pub fn network(&self) -> Network {
        self.network
    }

    /// Account snapshot: withdrawable balance, equity, open positions.
    pub async fn fetch_account_snapshot(&self, user: &str) -> RequestResult<AccountSnapshot> {
        let raw: ClearinghouseStateResponse = self
            .post_info(&InfoRequestWithUser {
                request_type: "clearinghouseState",
                user: user.to_string(),
            })
            .await?;
        raw.to_snapshot()
    }

    /// Resting orders for a user, in venue order.
    pub async fn fetch_open_orders(&self, user: &str) -> RequestResult<Vec<OpenOrder>> {
        let raw: Vec<RawOpenOrder> = self
            .post_info(&InfoRequestWithUser {
                request_type: "openOrders",
                user: user.to_string(),
            })
            .await?;
        raw.iter().map(RawOpenOrder::to_order).collect()
    }

    /// Instrument universe with size precision per symbol.
    pub async fn fetch_meta(&self) -> RequestResult<Vec<Instrument>> {
        let raw: MetaResponse = self
            .post_info(&InfoRequest {
                request_type: "meta",
            })
            .await?;
        Ok(raw.universe.iter().map(|a| a.to_instrument()).collect())
    }

    /// Mid prices for every instrument.
    pub async fn fetch_all_mids(&self) -> RequestResult<MidPrices> {
        self.post_info(&InfoRequest {
            request_type: "allMids",
        })
        .await
    }

    /// Historical candles from `start_time_ms` onward.
    pub async fn fetch_candle_snapshot(
        &self,
        coin: &str,
        interval: CandleInterval,
        start_time_ms: i64,
    ) -> RequestResult<Vec<Candle>> {
        let raw: Vec<RawCandle> = self
            .post_info(&CandleSnapshotRequest {
                request_type: "candleSnapshot",
                req: CandleSnapshotParams {
                    coin: coin.to_string(),
                    interval: interval.tag(),
                    start_time: start_time_ms,
                },
            })
            .await?;
        raw.iter().map(RawCandle::to_candle).collect()
    }

    /// Approved builder fee for (user, builder); zero when unapproved.
    pub async fn fetch_max_builder_fee(
        &self,
        user: &str,
        builder: &str,
    ) -> RequestResult<BuilderFee> {
        let fee: u32 = self
            .post_info(&MaxBuilderFeeRequest {
                request_type: "maxBuilderFee",
                user: user.to_string(),
                builder: builder.to_string(),
            })
            .await?;
        Ok(BuilderFee(fee))
    }

    /// Referral/income totals for a builder address.
    pub async fn fetch_referral(&self, builder: &str) -> RequestResult<ReferralSummary> {
        let raw: RawReferral = self
            .post_info(&InfoRequestWithUser {
                request_type: "referral",
                user: builder.to_string(),
            })
            .await?;
        raw.to_summary()
    }

    /// Trade history for a user.
    pub async fn fetch_user_fills(&self, user: &str) -> RequestResult<Vec<Fill>> {
        let raw: Vec<RawFill> = self
            .post_info(&InfoRequestWithUser {
                request_type: "userFills",
                user: user.to_string(),
            })
            .await?;
        raw.iter().map(RawFill::to_fill).collect()
    }

    async fn post_info<B, T>(&self, body: &B) -> RequestResult<T>
    where
        B: Serialize + std::fmt::Debug,
        T: DeserializeOwned,
    {
        debug!(url = %self.info_url, request = ?body, "info request");

        let response = self
            .client
            .post(&self.info_url)
            .json(body)
            .send()
            .await
            .map_err(|e| RequestError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RequestError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| RequestError::Decode(e.to_string()))
    }
}
