//! Preset alert strategies.

use super::strategy::{AlertStrategy, Comparison, ExitRule, SignalKind};

/// Days held before a preset strategy exits.
pub const PRESET_HOLD_DAYS: f64 = 5.0;

pub fn volume_surge() -> AlertStrategy {
    AlertStrategy::new(
        "Volume Surge",
        SignalKind::VolumeSpike,
        3.0,
        Comparison::Above,
        ExitRule::Time(PRESET_HOLD_DAYS),
    )
}

pub fn momentum_breakout() -> AlertStrategy {
    AlertStrategy::new(
        "Momentum Breakout",
        SignalKind::PriceChange,
        5.0,
        Comparison::Above,
        ExitRule::Time(PRESET_HOLD_DAYS),
    )
}

/// Opens a short on RSI below 30; the trade direction follows the comparison.
pub fn oversold_rsi() -> AlertStrategy {
    AlertStrategy::new(
        "Oversold RSI",
        SignalKind::RsiExtreme,
        30.0,
        Comparison::Below,
        ExitRule::Time(PRESET_HOLD_DAYS),
    )
}

pub fn bollinger_breakout() -> AlertStrategy {
    AlertStrategy::new(
        "Bollinger Breakout",
        SignalKind::BollingerBreakout,
        0.0,
        Comparison::Above,
        ExitRule::Time(PRESET_HOLD_DAYS),
    )
}

/// All presets in display order.
pub fn preset_strategies() -> Vec<AlertStrategy> {
    vec![
        volume_surge(),
        momentum_breakout(),
        oversold_rsi(),
        bollinger_breakout(),
    ]
}

/// Look up a preset by name, ignoring case.
pub fn preset(name: &str) -> Option<AlertStrategy> {
    preset_strategies()
        .into_iter()
        .find(|s| s.name.eq_ignore_ascii_case(name))
}
