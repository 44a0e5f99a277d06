//! Performance metrics module.
//!
//! Provides trade-indexed performance calculations:
//! - Win rate and total (summed) return
//! - Sharpe ratio
//! - Maximum drawdown
//! - Compounded return and per-trade statistics

pub mod calculator;

pub use calculator::{BacktestResult, MetricsCalculator, TradeStatistics, TRADING_DAYS_PER_YEAR};
