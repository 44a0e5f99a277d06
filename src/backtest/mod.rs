//! Alert strategy backtesting.
//!
//! This module provides:
//! - Price series with technical indicators
//! - Closed strategy definitions (signal kinds and exit rules)
//! - A preset strategy library
//! - Position / trade lifecycle
//! - The backtesting engine and multi-strategy comparison

pub mod engine;
pub mod library;
pub mod series;
pub mod strategy;
pub mod trade;

pub use engine::{compare_strategies, simulate_alert_strategy, AlertBacktester, MIN_BARS};
pub use library::preset_strategies;
pub use series::{PriceBar, PriceSeries, SeriesError};
pub use strategy::{AlertStrategy, Comparison, ExitRule, SignalKind};
pub use trade::{ExitReason, Position, Trade, TradeDirection};
