//! Raw response types for the venue info endpoint.
//!
//! The venue sends every numeric field as a string; these types mirror the
//! wire shape and convert into the domain types from `desk-core`.

use crate::error::{RequestError, RequestResult};
use desk_core::{
    AccountSnapshot, Candle, Fill, Instrument, OpenOrder, OrderSide, Position, PositionSide,
    ReferralSummary, Size,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

fn decode(field: &str, err: impl std::fmt::Display) -> RequestError {
    RequestError::Decode(format!("{field}: {err}"))
}

/// clearinghouseState response.
///
/// `POST /info` with `{"type": "clearinghouseState", "user": "<address>"}`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClearinghouseStateResponse {
    /// Withdrawable balance.
    pub withdrawable: String,
    /// Cross margin summary (account value lives here).
    #[serde(rename = "crossMarginSummary")]
    pub cross_margin_summary: MarginSummary,
    /// Open positions.
    #[serde(rename = "assetPositions", default)]
    pub asset_positions: Vec<AssetPositionEntry>,
}

/// Margin summary from clearinghouseState.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MarginSummary {
    /// Account value in USD.
    #[serde(rename = "accountValue")]
    pub account_value: String,
}

/// Asset position entry from clearinghouseState.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AssetPositionEntry {
    pub position: AssetPositionData,
}

/// Position data within an entry.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AssetPositionData {
    pub coin: String,
    /// Signed size: positive = long, negative = short.
    pub szi: String,
    #[serde(rename = "entryPx")]
    pub entry_px: Option<String>,
    #[serde(rename = "unrealizedPnl", default)]
    pub unrealized_pnl: Option<String>,
}

impl ClearinghouseStateResponse {
    /// Convert to a domain snapshot, translating signed sizes to
    /// side + magnitude and dropping zero-size positions.
    pub fn to_snapshot(&self) -> RequestResult<AccountSnapshot> {
        let withdrawable: Decimal = self
            .withdrawable
            .parse()
            .map_err(|e| decode("withdrawable", e))?;
        let equity: Decimal = self
            .cross_margin_summary
            .account_value
            .parse()
            .map_err(|e| decode("accountValue", e))?;

        let mut positions = Vec::new();
        for entry in &self.asset_positions {
            let p = &entry.position;
            let szi: Decimal = p.szi.parse().map_err(|e| decode("szi", e))?;
            let Some(side) = PositionSide::from_signed(szi) else {
                continue;
            };
            let entry_px = match &p.entry_px {
                Some(px) => Some(px.parse().map_err(|e| decode("entryPx", e))?),
                None => None,
            };
            let unrealized_pnl = match &p.unrealized_pnl {
                Some(pnl) => pnl.parse().map_err(|e| decode("unrealizedPnl", e))?,
                None => Decimal::ZERO,
            };
            positions.push(Position {
                coin: p.coin.clone(),
                side,
                size: Size::new(szi.abs()),
                entry_px,
                unrealized_pnl,
            });
        }

        Ok(AccountSnapshot {
            withdrawable,
            equity,
            positions,
        })
    }
}

/// One resting order from openOrders.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawOpenOrder {
    pub coin: String,
    pub oid: u64,
    /// "B" (bid/buy) or "A" (ask/sell).
    pub side: String,
    pub sz: String,
    #[serde(rename = "limitPx")]
    pub limit_px: String,
    pub timestamp: i64,
}

impl RawOpenOrder {
    pub fn to_order(&self) -> RequestResult<OpenOrder> {
        Ok(OpenOrder {
            coin: self.coin.clone(),
            oid: self.oid,
            side: OrderSide::from_venue_code(&self.side).map_err(|e| decode("side", e))?,
            size: self.sz.parse().map_err(|e| decode("sz", e))?,
            limit_px: self.limit_px.parse().map_err(|e| decode("limitPx", e))?,
            timestamp_ms: self.timestamp,
        })
    }
}

/// meta response (instrument universe).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MetaResponse {
    pub universe: Vec<RawAssetMeta>,
}

/// One universe entry.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawAssetMeta {
    pub name: String,
    #[serde(rename = "szDecimals")]
    pub sz_decimals: u8,
}

impl RawAssetMeta {
    pub fn to_instrument(&self) -> Instrument {
        Instrument {
            name: self.name.clone(),
            sz_decimals: self.sz_decimals,
        }
    }
}

/// One candle from candleSnapshot.
///
/// `t` is the bucket open time in milliseconds.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawCandle {
    pub t: i64,
    pub o: String,
    pub h: String,
    pub l: String,
    pub c: String,
    #[serde(default)]
    pub v: Option<String>,
}

impl RawCandle {
    pub fn to_candle(&self) -> RequestResult<Candle> {
        Ok(Candle {
            time: self.t / 1000,
            open: self.o.parse().map_err(|e| decode("o", e))?,
            high: self.h.parse().map_err(|e| decode("h", e))?,
            low: self.l.parse().map_err(|e| decode("l", e))?,
            close: self.c.parse().map_err(|e| decode("c", e))?,
        })
    }
}

/// referral response, reduced to the income totals the pipeline serves.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawReferral {
    #[serde(rename = "cumVlm", default)]
    pub cum_vlm: Option<String>,
    #[serde(rename = "builderRewards", default)]
    pub builder_rewards: Option<String>,
}

impl RawReferral {
    pub fn to_summary(&self) -> RequestResult<ReferralSummary> {
        let parse = |field: &str, v: &Option<String>| -> RequestResult<Decimal> {
            match v {
                Some(s) => s.parse().map_err(|e| decode(field, e)),
                None => Ok(Decimal::ZERO),
            }
        };
        Ok(ReferralSummary {
            cum_volume: parse("cumVlm", &self.cum_vlm)?,
            builder_rewards: parse("builderRewards", &self.builder_rewards)?,
        })
    }
}

/// One fill from userFills.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawFill {
    pub coin: String,
    pub px: String,
    pub sz: String,
    pub side: String,
    pub time: i64,
}

impl RawFill {
    pub fn to_fill(&self) -> RequestResult<Fill> {
        Ok(Fill {
            coin: self.coin.clone(),
            px: self.px.parse().map_err(|e| decode("px", e))?,
            sz: self.sz.parse().map_err(|e| decode("sz", e))?,
            side: OrderSide::from_venue_code(&self.side).map_err(|e| decode("side", e))?,
            time_ms: self.time,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn test_clearinghouse_to_snapshot() {
        let raw: ClearinghouseStateResponse = serde_json::from_value(json!({
            "withdrawable": "1250.75",
            "crossMarginSummary": { "accountValue": "1500.00" },
            "assetPositions": [
                { "position": { "coin": "ETH", "szi": "0.5", "entryPx": "3000.0", "unrealizedPnl": "12.5" } },
                { "position": { "coin": "BTC", "szi": "-0.01", "entryPx": "65000", "unrealizedPnl": "-3.2" } },
                { "position": { "coin": "SOL", "szi": "0", "entryPx": null, "unrealizedPnl": null } }
            ]
        }))
        .unwrap();

        let snap = raw.to_snapshot().unwrap();
        assert_eq!(snap.withdrawable, dec!(1250.75));
        assert_eq!(snap.equity, dec!(1500.00));
        // Zero-size position filtered out
        assert_eq!(snap.positions.len(), 2);

        assert_eq!(snap.positions[0].side, PositionSide::Long);
        assert_eq!(snap.positions[0].size.inner(), dec!(0.5));

        // Short translated to side + magnitude
        assert_eq!(snap.positions[1].side, PositionSide::Short);
        assert_eq!(snap.positions[1].size.inner(), dec!(0.01));
        assert_eq!(snap.positions[1].unrealized_pnl, dec!(-3.2));
    }

    #[test]
    fn test_clearinghouse_bad_number_is_decode_error() {
        let raw: ClearinghouseStateResponse = serde_json::from_value(json!({
            "withdrawable": "not-a-number",
            "crossMarginSummary": { "accountValue": "0" },
            "assetPositions": []
        }))
        .unwrap();

        assert!(matches!(
            raw.to_snapshot(),
            Err(RequestError::Decode(_))
        ));
    }

    #[test]
    fn test_open_order_conversion() {
        let raw: RawOpenOrder = serde_json::from_value(json!({
            "coin": "ETH",
            "oid": 77001u64,
            "side": "B",
            "sz": "0.25",
            "limitPx": "2990.5",
            "timestamp": 1700000000000i64
        }))
        .unwrap();

        let order = raw.to_order().unwrap();
        assert_eq!(order.oid, 77001);
        assert_eq!(order.side, OrderSide::Buy);
        assert_eq!(order.limit_px.inner(), dec!(2990.5));
    }

    #[test]
    fn test_candle_millis_to_seconds() {
        let raw: RawCandle = serde_json::from_value(json!({
            "t": 3600000i64,
            "o": "10", "h": "12", "l": "9", "c": "11",
            "v": "100.5"
        }))
        .unwrap();

        let candle = raw.to_candle().unwrap();
        assert_eq!(candle.time, 3600);
        assert_eq!(candle.open.inner(), dec!(10));
        assert_eq!(candle.low.inner(), dec!(9));
    }

    #[test]
    fn test_referral_missing_fields_default_to_zero() {
        let raw: RawReferral = serde_json::from_value(json!({})).unwrap();
        let summary = raw.to_summary().unwrap();
        assert_eq!(summary.cum_volume, Decimal::ZERO);
        assert_eq!(summary.builder_rewards, Decimal::ZERO);
    }

    #[test]
    fn test_fill_conversion() {
        let raw: RawFill = serde_json::from_value(json!({
            "coin": "ETH", "px": "3001.5", "sz": "0.1", "side": "A",
            "time": 1700000000123i64
        }))
        .unwrap();

        let fill = raw.to_fill().unwrap();
        assert_eq!(fill.side, OrderSide::Sell);
        assert_eq!(fill.px.inner(), dec!(3001.5));
    }
}
