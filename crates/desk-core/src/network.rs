//! Network selector and endpoint tables.
//!
//! The pipeline runs against exactly one of two deployments at a time.
//! Switching networks invalidates all cached query state; the endpoint
//! table itself is fixed per deployment.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Active network deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Testnet,
    Mainnet,
}

impl Network {
    /// Base URL of the read (info) API.
    pub fn api_url(&self) -> &'static str {
        match self {
            Self::Testnet => "https://api.hyperliquid-testnet.xyz",
            Self::Mainnet => "https://api.hyperliquid.xyz",
        }
    }

    /// Info endpoint (all read operations POST here).
    pub fn info_url(&self) -> String {
        format!("{}/info", self.api_url())
    }

    /// WebSocket streaming endpoint.
    pub fn ws_url(&self) -> &'static str {
        match self {
            Self::Testnet => "wss://api.hyperliquid-testnet.xyz/ws",
            Self::Mainnet => "wss://api.hyperliquid.xyz/ws",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Testnet => "Testnet",
            Self::Mainnet => "Mainnet",
        }
    }

    pub fn is_testnet(&self) -> bool {
        matches!(self, Self::Testnet)
    }

    /// Historical-candle baseline refresh cadence.
    ///
    /// Mainnet serves the lower-latency endpoint and gets the tighter
    /// interval.
    pub fn candle_refresh(&self) -> Duration {
        match self {
            Self::Mainnet => Duration::from_secs(30),
            Self::Testnet => Duration::from_secs(60),
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_table() {
        assert_eq!(
            Network::Mainnet.info_url(),
            "https://api.hyperliquid.xyz/info"
        );
        assert_eq!(
            Network::Testnet.ws_url(),
            "wss://api.hyperliquid-testnet.xyz/ws"
        );
    }

    #[test]
    fn test_candle_refresh_tighter_on_mainnet() {
        assert!(Network::Mainnet.candle_refresh() < Network::Testnet.candle_refresh());
    }

    #[test]
    fn test_serde_lowercase() {
        assert_eq!(
            serde_json::to_string(&Network::Mainnet).unwrap(),
            r#""mainnet""#
        );
        let n: Network = serde_json::from_str(r#""testnet""#).unwrap();
        assert_eq!(n, Network::Testnet);
    }
}
