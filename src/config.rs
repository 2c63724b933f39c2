//! Route configuration.
//!
//! A route's identity and hyperparameters — not the exchange credentials,
//! tax tables, or backtest wiring a full trading deployment also needs,
//! which stay the hosting runtime's concern. Loading is still JSON via
//! `serde_json`, with `anyhow::Context` at the file-read boundary, the
//! way the rest of this codebase's config loading works.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::Path;

/// Identifies a single route and carries its hyperparameter overrides.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteConfig {
    pub exchange: String,
    pub symbol: String,
    pub timeframe: String,
    pub strategy_name: String,
    #[serde(default)]
    pub hyper_parameters: Value,
}

impl RouteConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref()).context("failed to read route config file")?;
        let config: RouteConfig =
            serde_json::from_str(&contents).context("failed to parse route config JSON")?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hyper_parameters_default_to_null_when_absent() {
        let config: RouteConfig = serde_json::from_str(
            r#"{"exchange":"binance","symbol":"BTCUSDT","timeframe":"1h","strategy_name":"always-long"}"#,
        )
        .unwrap();
        assert!(config.hyper_parameters.is_null());
    }
}
