//! Application configuration.
//!
//! Loaded from a TOML file with `DESK_`-prefixed environment overrides.

use crate::error::AppResult;
use desk_core::{CandleInterval, Network};
use serde::{Deserialize, Serialize};

/// Default builder address used when none is configured.
const DEFAULT_BUILDER_ADDRESS: &str = "0xE94D5a0a377Afe26a461e8aAC2c7189D2006c8b9";

fn default_network() -> Network {
    Network::Testnet
}

fn default_coin() -> String {
    "ETH".to_string()
}

fn default_interval() -> String {
    "1h".to_string()
}

fn default_builder() -> String {
    DEFAULT_BUILDER_ADDRESS.to_string()
}

/// Pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Active network. Switching at runtime invalidates all query state.
    #[serde(default = "default_network")]
    pub network: Network,
    /// Instrument the streaming feed and candle chart follow.
    #[serde(default = "default_coin")]
    pub coin: String,
    /// Candle interval tag ("1h", "4h", "1d"); unrecognized tags fall
    /// back to 1h.
    #[serde(default = "default_interval")]
    pub interval: String,
    /// Connected wallet address. Account/order/fee polling only runs when
    /// set.
    #[serde(default)]
    pub user_address: Option<String>,
    /// Builder whose approval state and income are tracked.
    #[serde(default = "default_builder")]
    pub builder_address: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            network: default_network(),
            coin: default_coin(),
            interval: default_interval(),
            user_address: None,
            builder_address: default_builder(),
        }
    }
}

impl AppConfig {
    /// Load from a TOML file (optional) layered with `DESK_*` env vars.
    pub fn from_file(path: &str) -> AppResult<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix("DESK"))
            .build()?;
        Ok(settings.try_deserialize()?)
    }

    pub fn interval(&self) -> CandleInterval {
        CandleInterval::from_tag(&self.interval)
    }
}
