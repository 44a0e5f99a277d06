//! Alert strategy definitions.
//!
//! A strategy pairs an entry signal with a single exit rule. The comparison
//! direction also fixes the trade direction: `Above` opens a long,
//! `Below` opens a short.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::series::PriceBar;
use super::trade::{ExitReason, TradeDirection};

/// Entry signal family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    /// Volume over its 20-bar average exceeds the threshold.
    VolumeSpike,
    /// Daily return beyond +/- threshold percent.
    PriceChange,
    /// 14-bar RSI beyond the threshold.
    RsiExtreme,
    /// Close outside the Bollinger bands (threshold unused).
    BollingerBreakout,
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::VolumeSpike => "volume_spike",
            Self::PriceChange => "price_change",
            Self::RsiExtreme => "rsi_extreme",
            Self::BollingerBreakout => "bollinger_breakout",
        };
        write!(f, "{}", name)
    }
}

/// Comparison direction of the entry signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    Above,
    Below,
}

impl Comparison {
    /// Trade direction opened by a signal in this direction.
    pub fn direction(&self) -> TradeDirection {
        match self {
            Self::Above => TradeDirection::Long,
            Self::Below => TradeDirection::Short,
        }
    }
}

/// Exit rule with its parameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ExitRule {
    /// Exit once calendar days held reach the value.
    Time(f64),
    /// Exit once the direction-adjusted gain reaches the value in percent.
    PriceTarget(f64),
    /// Exit once the direction-adjusted loss reaches the value in percent.
    StopLoss(f64),
}

impl ExitRule {
    /// Whether an open position should close on this bar.
    pub fn should_exit(&self, days_held: i64, pnl_pct: f64) -> bool {
        match *self {
            Self::Time(days) => days_held as f64 >= days,
            Self::PriceTarget(target) => pnl_pct >= target,
            Self::StopLoss(stop) => pnl_pct <= -stop,
        }
    }

    pub fn reason(&self) -> ExitReason {
        match self {
            Self::Time(_) => ExitReason::TimeExit,
            Self::PriceTarget(_) => ExitReason::ProfitTarget,
            Self::StopLoss(_) => ExitReason::StopLoss,
        }
    }

    pub fn value(&self) -> f64 {
        match *self {
            Self::Time(v) | Self::PriceTarget(v) | Self::StopLoss(v) => v,
        }
    }
}

/// Backtest configuration for one alert strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertStrategy {
    pub name: String,
    pub signal: SignalKind,
    pub threshold: f64,
    pub comparison: Comparison,
    pub exit: ExitRule,
}

impl AlertStrategy {
    pub fn new(
        name: impl Into<String>,
        signal: SignalKind,
        threshold: f64,
        comparison: Comparison,
        exit: ExitRule,
    ) -> Self {
        Self {
            name: name.into(),
            signal,
            threshold,
            comparison,
            exit,
        }
    }

    /// Direction of positions this strategy opens.
    pub fn direction(&self) -> TradeDirection {
        self.comparison.direction()
    }

    /// Volume spikes only fire in the `Above` direction.
    pub fn is_supported(&self) -> bool {
        !(self.signal == SignalKind::VolumeSpike && self.comparison == Comparison::Below)
    }

    /// Whether the entry condition holds on a bar.
    ///
    /// Bars whose indicator is not yet defined never signal.
    pub fn signals(&self, bar: &PriceBar) -> bool {
        match (self.signal, self.comparison) {
            (SignalKind::VolumeSpike, Comparison::Above) => {
                bar.volume_ratio.is_some_and(|r| r > self.threshold)
            }
            (SignalKind::VolumeSpike, Comparison::Below) => false,
            (SignalKind::PriceChange, Comparison::Above) => {
                bar.daily_return.is_some_and(|r| r > self.threshold / 100.0)
            }
            (SignalKind::PriceChange, Comparison::Below) => {
                bar.daily_return.is_some_and(|r| r < -(self.threshold / 100.0))
            }
            (SignalKind::RsiExtreme, Comparison::Above) => bar.rsi.is_some_and(|r| r > self.threshold),
            (SignalKind::RsiExtreme, Comparison::Below) => bar.rsi.is_some_and(|r| r < self.threshold),
            (SignalKind::BollingerBreakout, Comparison::Above) => bar
                .bollinger_upper
                .is_some_and(|upper| bar.close_f64() > upper),
            (SignalKind::BollingerBreakout, Comparison::Below) => bar
                .bollinger_lower
                .is_some_and(|lower| bar.close_f64() < lower),
        }
    }
}
