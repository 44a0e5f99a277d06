//! TOML configuration.
//!
//! Every section is optional and falls back to its defaults:
//!
//! ```toml
//! [pricing]
//! risk_free_rate = 0.05
//! dividend_yield = 0.0
//!
//! [unusual]
//! volume_threshold = 100
//! oi_threshold = 50
//! ratio_threshold = 2.0
//!
//! [cross_check]
//! price_tolerance = 0.05
//! delta_tolerance = 0.05
//! iv_tolerance = 0.02
//!
//! [backtest]
//! start = "2024-01-01"
//! end = "2024-12-31"
//! min_bars = 10
//!
//! [[strategies]]
//! name = "Volume Surge"
//! signal = "volume_spike"
//! threshold = 3.0
//! comparison = "above"
//! exit = { kind = "time", value = 5.0 }
//! ```

use std::fs;
use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::analytics::{CrossCheckTolerances, UnusualActivityFilter};
use crate::backtest::{preset_strategies, AlertBacktester, AlertStrategy, MIN_BARS};
use crate::pricing::BlackScholes;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config {path}: {source}")]
    Toml {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

/// Pricing model parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingConfig {
    pub risk_free_rate: f64,
    pub dividend_yield: f64,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            risk_free_rate: 0.05,
            dividend_yield: 0.0,
        }
    }
}

impl PricingConfig {
    pub fn model(&self) -> BlackScholes {
        BlackScholes::new(self.risk_free_rate, self.dividend_yield)
    }
}

/// Backtest window and data requirements.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestSettings {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub min_bars: usize,
}

impl Default for BacktestSettings {
    fn default() -> Self {
        Self {
            start: None,
            end: None,
            min_bars: MIN_BARS,
        }
    }
}

impl BacktestSettings {
    pub fn backtester(&self) -> AlertBacktester {
        AlertBacktester::with_min_bars(self.min_bars)
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    pub pricing: PricingConfig,
    pub unusual: UnusualActivityFilter,
    pub cross_check: CrossCheckTolerances,
    pub backtest: BacktestSettings,
    pub strategies: Vec<AlertStrategy>,
}

impl AnalyticsConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&contents).map_err(|source| ConfigError::Toml {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn from_toml(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    /// Configured strategies, or the preset library when none are given.
    pub fn strategies(&self) -> Vec<AlertStrategy> {
        if self.strategies.is_empty() {
            preset_strategies()
        } else {
            self.strategies.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backtest::{Comparison, ExitRule, SignalKind};

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = AnalyticsConfig::from_toml("").unwrap();
        assert_eq!(config, AnalyticsConfig::default());
        assert_eq!(config.pricing.risk_free_rate, 0.05);
        assert_eq!(config.unusual, UnusualActivityFilter::default());
        assert_eq!(config.backtest.min_bars, 10);
        assert_eq!(config.strategies().len(), 4);
    }

    #[test]
    fn test_partial_sections() {
        let config = AnalyticsConfig::from_toml(
            r#"
            [pricing]
            risk_free_rate = 0.04

            [unusual]
            ratio_threshold = 5.0

            [backtest]
            start = "2024-03-01"
            "#,
        )
        .unwrap();

        assert_eq!(config.pricing.risk_free_rate, 0.04);
        assert_eq!(config.pricing.dividend_yield, 0.0);
        assert_eq!(config.unusual.ratio_threshold, 5.0);
        assert_eq!(config.unusual.volume_threshold, 100);
        assert_eq!(config.backtest.start, NaiveDate::from_ymd_opt(2024, 3, 1));
        assert_eq!(config.backtest.end, None);
        assert_eq!(config.pricing.model().rate, 0.04);
    }

    #[test]
    fn test_configured_strategies_replace_presets() {
        let config = AnalyticsConfig::from_toml(
            r#"
            [[strategies]]
            name = "Gap Down"
            signal = "price_change"
            threshold = 4.0
            comparison = "below"
            exit = { kind = "price_target", value = 3.0 }
            "#,
        )
        .unwrap();

        let strategies = config.strategies();
        assert_eq!(strategies.len(), 1);
        assert_eq!(strategies[0].signal, SignalKind::PriceChange);
        assert_eq!(strategies[0].comparison, Comparison::Below);
        assert_eq!(strategies[0].exit, ExitRule::PriceTarget(3.0));
    }

    #[test]
    fn test_unknown_signal_is_rejected() {
        let result = AnalyticsConfig::from_toml(
            r#"
            [[strategies]]
            name = "bad"
            signal = "moon_phase"
            threshold = 1.0
            comparison = "above"
            exit = { kind = "time", value = 5.0 }
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_file() {
        let err = AnalyticsConfig::from_file("/nonexistent/optiflow.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
