//! TOML config parsing — run and strategy parameters from a config file.

use serde::Deserialize;
use std::path::Path;

/// Top-level backtest configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct BacktestConfig {
    pub backtest: BacktestSection,
    #[serde(default)]
    pub strategy: StrategySection,
}

/// Instrument, account, and venue-path parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct BacktestSection {
    pub symbol: String,
    #[serde(default = "default_db_path")]
    pub db_path: String,
    #[serde(default = "default_capital")]
    pub capital: f64,
    #[serde(default = "default_commission")]
    pub commission: f64,
    #[serde(default = "default_tick_size")]
    pub tick_size: f64,
    #[serde(default = "default_tick_value")]
    pub tick_value: f64,
    #[serde(default = "default_latency_data_signal_us")]
    pub latency_data_signal_us: i64,
    #[serde(default = "default_latency_signal_order_us")]
    pub latency_signal_order_us: i64,
    #[serde(default)]
    pub max_events: Option<u64>,
    /// When set, replaces the tick database with a hand-built scenario.
    #[serde(default)]
    pub test_scenario: Option<String>,
}

/// Footprint diagonal-ratio strategy parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct StrategySection {
    #[serde(default = "default_percentage_threshold")]
    pub percentage_threshold: f64,
    #[serde(default = "default_stop_ticks")]
    pub stop_ticks: i64,
    #[serde(default = "default_risk_reward")]
    pub risk_reward: f64,
    #[serde(default = "default_bar_interval_minutes")]
    pub bar_interval_minutes: i64,
    #[serde(default)]
    pub enable_zero_compares: bool,
    #[serde(default = "default_zero_compare_action")]
    pub zero_compare_action: String,
    #[serde(default)]
    pub min_liquidity_check: i64,
}

impl Default for StrategySection {
    fn default() -> Self {
        Self {
            percentage_threshold: default_percentage_threshold(),
            stop_ticks: default_stop_ticks(),
            risk_reward: default_risk_reward(),
            bar_interval_minutes: default_bar_interval_minutes(),
            enable_zero_compares: false,
            zero_compare_action: default_zero_compare_action(),
            min_liquidity_check: 0,
        }
    }
}

fn default_db_path() -> String {
    "tick.db".to_string()
}
fn default_capital() -> f64 {
    100_000.0
}
fn default_commission() -> f64 {
    2.50
}
fn default_tick_size() -> f64 {
    0.25
}
fn default_tick_value() -> f64 {
    12.50
}
fn default_latency_data_signal_us() -> i64 {
    100
}
fn default_latency_signal_order_us() -> i64 {
    500
}
fn default_percentage_threshold() -> f64 {
    150.0
}
fn default_stop_ticks() -> i64 {
    11
}
fn default_risk_reward() -> f64 {
    2.5
}
fn default_bar_interval_minutes() -> i64 {
    1
}
fn default_zero_compare_action() -> String {
    "set_0_to_1".to_string()
}

impl BacktestConfig {
    /// Load from a TOML file path.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
        Self::from_toml(&contents)
    }

    /// Parse from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml_str).map_err(|e| ConfigError::Parse(e.to_string()))
    }
}

/// Config loading errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("TOML parse error: {0}")]
    Parse(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL_TOML: &str = r#"
[backtest]
symbol = "ESM25_FUT_CME"
db_path = "data/tick.db"
capital = 250000.0
commission = 1.25
tick_size = 0.25
tick_value = 12.50
latency_data_signal_us = 150
latency_signal_order_us = 650
max_events = 1000000

[strategy]
percentage_threshold = 200.0
stop_ticks = 8
risk_reward = 3.0
bar_interval_minutes = 5
enable_zero_compares = true
zero_compare_action = "set_perc_1000"
min_liquidity_check = 25
"#;

    #[test]
    fn parses_full_config() {
        let config = BacktestConfig::from_toml(FULL_TOML).unwrap();
        assert_eq!(config.backtest.symbol, "ESM25_FUT_CME");
        assert_eq!(config.backtest.db_path, "data/tick.db");
        assert_eq!(config.backtest.capital, 250_000.0);
        assert_eq!(config.backtest.latency_signal_order_us, 650);
        assert_eq!(config.backtest.max_events, Some(1_000_000));
        assert_eq!(config.strategy.stop_ticks, 8);
        assert_eq!(config.strategy.zero_compare_action, "set_perc_1000");
        assert_eq!(config.strategy.min_liquidity_check, 25);
    }

    #[test]
    fn minimal_config_uses_defaults() {
        let config = BacktestConfig::from_toml("[backtest]\nsymbol = \"ES\"\n").unwrap();
        assert_eq!(config.backtest.capital, 100_000.0);
        assert_eq!(config.backtest.commission, 2.50);
        assert_eq!(config.backtest.tick_size, 0.25);
        assert_eq!(config.backtest.latency_data_signal_us, 100);
        assert!(config.backtest.test_scenario.is_none());
        assert_eq!(config.strategy.percentage_threshold, 150.0);
        assert_eq!(config.strategy.stop_ticks, 11);
        assert_eq!(config.strategy.bar_interval_minutes, 1);
        assert!(!config.strategy.enable_zero_compares);
    }

    #[test]
    fn missing_symbol_is_an_error() {
        assert!(BacktestConfig::from_toml("[backtest]\n").is_err());
    }

    #[test]
    fn malformed_toml_is_an_error() {
        assert!(BacktestConfig::from_toml("not toml at all [").is_err());
    }
}
