//! Performance metrics calculator.
//!
//! All metrics treat the trade sequence as the time axis: returns are the
//! per-trade percentage P&L values in the order trades closed.

use serde::{Deserialize, Serialize};

use crate::backtest::Trade;

/// Annualization factor for the Sharpe ratio.
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Aggregate result of one strategy run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    /// Strategy name.
    pub strategy: String,
    /// Number of closed trades.
    pub total_signals: usize,
    /// Trades with positive P&L.
    pub profitable_signals: usize,
    /// Profitable trades / total trades x 100.
    pub win_rate: f64,
    /// Arithmetic sum of per-trade percentage P&L.
    pub total_return: f64,
    pub sharpe_ratio: f64,
    /// Most negative distance of cumulative P&L below its running peak.
    pub max_drawdown: f64,
    pub trades: Vec<Trade>,
}

impl BacktestResult {
    /// Result with no signals and no trades.
    pub fn empty(strategy: impl Into<String>) -> Self {
        Self {
            strategy: strategy.into(),
            total_signals: 0,
            profitable_signals: 0,
            win_rate: 0.0,
            total_return: 0.0,
            sharpe_ratio: 0.0,
            max_drawdown: 0.0,
            trades: Vec::new(),
        }
    }

    /// Build the result from closed trades.
    pub fn from_trades(strategy: impl Into<String>, trades: Vec<Trade>) -> Self {
        if trades.is_empty() {
            return Self::empty(strategy);
        }

        let returns = MetricsCalculator::returns(&trades);
        let profitable = trades.iter().filter(|t| t.is_winner()).count();

        Self {
            strategy: strategy.into(),
            total_signals: trades.len(),
            profitable_signals: profitable,
            win_rate: profitable as f64 / trades.len() as f64 * 100.0,
            total_return: returns.iter().sum(),
            sharpe_ratio: MetricsCalculator::sharpe_ratio(&returns),
            max_drawdown: MetricsCalculator::max_drawdown(&returns),
            trades,
        }
    }

    /// Geometric chaining of trade returns, in percent.
    pub fn compounded_return(&self) -> f64 {
        MetricsCalculator::compounded_return(&MetricsCalculator::returns(&self.trades))
    }

    pub fn statistics(&self) -> TradeStatistics {
        MetricsCalculator::trade_statistics(&self.trades)
    }

    /// Generate summary string.
    pub fn summary(&self) -> String {
        let stats = self.statistics();
        format!(
            "{}\n\
             ----------------------------------------\n\
             Signals: {} (profitable: {})\n\
             Win Rate: {:.1}%\n\
             Total Return: {:.2}%\n\
             Compounded Return: {:.2}%\n\
             Sharpe Ratio: {:.2}\n\
             Max Drawdown: {:.2}%\n\
             \n\
             Avg Trade: {:.2}%\n\
             Best Trade: {:.2}%\n\
             Worst Trade: {:.2}%\n\
             Avg Days Held: {:.1}\n\
             Profit Factor: {:.2}",
            self.strategy,
            self.total_signals,
            self.profitable_signals,
            self.win_rate,
            self.total_return,
            self.compounded_return(),
            self.sharpe_ratio,
            self.max_drawdown,
            stats.avg_return,
            stats.best_trade,
            stats.worst_trade,
            stats.avg_holding_days,
            stats.profit_factor,
        )
    }
}

/// Per-trade statistics reported alongside a result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TradeStatistics {
    pub total_trades: usize,
    pub avg_return: f64,
    pub best_trade: f64,
    pub worst_trade: f64,
    pub avg_holding_days: f64,
    /// Gross gains over gross losses; infinite with no losing trades.
    pub profit_factor: f64,
}

/// Metrics calculator.
pub struct MetricsCalculator;

impl MetricsCalculator {
    pub fn returns(trades: &[Trade]) -> Vec<f64> {
        trades.iter().map(|t| t.pnl_pct).collect()
    }

    /// Mean over population standard deviation, annualized by sqrt(252).
    ///
    /// Zero with fewer than two returns or no dispersion.
    pub fn sharpe_ratio(returns: &[f64]) -> f64 {
        if returns.len() < 2 {
            return 0.0;
        }

        let n = returns.len() as f64;
        let mean = returns.iter().sum::<f64>() / n;
        let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
        let std_dev = variance.sqrt();

        if std_dev == 0.0 || !std_dev.is_finite() {
            return 0.0;
        }

        mean / std_dev * TRADING_DAYS_PER_YEAR.sqrt()
    }

    /// Minimum of cumulative return minus its running maximum.
    ///
    /// The running maximum starts at the first cumulative value, so the
    /// result is never positive and is 0 for an empty or monotone series.
    pub fn max_drawdown(returns: &[f64]) -> f64 {
        let mut cumulative = 0.0;
        let mut peak = f64::NEG_INFINITY;
        let mut max_drawdown = 0.0_f64;

        for r in returns {
            cumulative += r;
            peak = peak.max(cumulative);
            max_drawdown = max_drawdown.min(cumulative - peak);
        }

        max_drawdown
    }

    /// Product of (1 + r/100) minus one, in percent.
    pub fn compounded_return(returns: &[f64]) -> f64 {
        if returns.is_empty() {
            return 0.0;
        }
        let growth: f64 = returns.iter().map(|r| 1.0 + r / 100.0).product();
        (growth - 1.0) * 100.0
    }

    /// Infinite with gains but no losses, zero with neither.
    pub fn profit_factor(gross_profit: f64, gross_loss: f64) -> f64 {
        if gross_loss == 0.0 {
            return if gross_profit > 0.0 { f64::INFINITY } else { 0.0 };
        }
        gross_profit / gross_loss
    }

    pub fn trade_statistics(trades: &[Trade]) -> TradeStatistics {
        if trades.is_empty() {
            return TradeStatistics::default();
        }

        let n = trades.len() as f64;
        let returns = Self::returns(trades);
        let gross_profit: f64 = returns.iter().filter(|r| **r > 0.0).sum();
        let gross_loss: f64 = returns.iter().filter(|r| **r < 0.0).map(|r| r.abs()).sum();

        TradeStatistics {
            total_trades: trades.len(),
            avg_return: returns.iter().sum::<f64>() / n,
            best_trade: returns.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            worst_trade: returns.iter().copied().fold(f64::INFINITY, f64::min),
            avg_holding_days: trades.iter().map(|t| t.duration_days as f64).sum::<f64>() / n,
            profit_factor: Self::profit_factor(gross_profit, gross_loss),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backtest::{ExitReason, TradeDirection};
    use approx::assert_relative_eq;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn trade(pnl_pct: f64, duration_days: i64) -> Trade {
        let entry = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        Trade {
            entry_date: entry,
            exit_date: entry + chrono::Duration::days(duration_days),
            entry_price: dec!(100),
            exit_price: dec!(100),
            pnl_pct,
            duration_days,
            direction: TradeDirection::Long,
            exit_reason: ExitReason::TimeExit,
        }
    }

    #[test]
    fn test_single_trade_sharpe_is_zero() {
        assert_eq!(MetricsCalculator::sharpe_ratio(&[4.2]), 0.0);

        let result = BacktestResult::from_trades("one", vec![trade(4.2, 5)]);
        assert_eq!(result.total_signals, 1);
        assert_eq!(result.sharpe_ratio, 0.0);
        assert!(!result.sharpe_ratio.is_nan());
    }

    #[test]
    fn test_sharpe_population_std() {
        // mean 1, population std 2
        let returns = [3.0, -1.0, 3.0, -1.0];
        assert_relative_eq!(
            MetricsCalculator::sharpe_ratio(&returns),
            0.5 * 252.0_f64.sqrt(),
            epsilon = 1e-12
        );
        assert_eq!(MetricsCalculator::sharpe_ratio(&[2.0, 2.0, 2.0]), 0.0);
    }

    #[test]
    fn test_max_drawdown_on_trade_axis() {
        // cumulative: 5, 2, 6, -1, 1 -> worst is -1 - 6
        let returns = [5.0, -3.0, 4.0, -7.0, 2.0];
        assert_relative_eq!(MetricsCalculator::max_drawdown(&returns), -7.0, epsilon = 1e-12);

        assert_eq!(MetricsCalculator::max_drawdown(&[]), 0.0);
        assert_eq!(MetricsCalculator::max_drawdown(&[1.0, 2.0, 3.0]), 0.0);
        // Peak starts at the first cumulative value
        assert_eq!(MetricsCalculator::max_drawdown(&[-5.0]), 0.0);
        assert_relative_eq!(MetricsCalculator::max_drawdown(&[-5.0, -2.0]), -2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_compounded_differs_from_sum() {
        let result = BacktestResult::from_trades("pair", vec![trade(10.0, 3), trade(-10.0, 3)]);
        assert_relative_eq!(result.total_return, 0.0, epsilon = 1e-12);
        assert_relative_eq!(result.compounded_return(), -1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_result_counts() {
        let result = BacktestResult::from_trades(
            "mixed",
            vec![trade(2.0, 5), trade(-1.0, 5), trade(0.0, 5), trade(3.0, 5)],
        );
        assert_eq!(result.total_signals, 4);
        assert_eq!(result.profitable_signals, 2);
        assert_relative_eq!(result.win_rate, 50.0);
        assert_relative_eq!(result.total_return, 4.0);
    }

    #[test]
    fn test_empty_result() {
        let result = BacktestResult::from_trades("none", Vec::new());
        assert_eq!(result, BacktestResult::empty("none"));
        assert_eq!(result.compounded_return(), 0.0);
        assert_eq!(result.statistics(), TradeStatistics::default());
    }

    #[test]
    fn test_trade_statistics() {
        let stats = MetricsCalculator::trade_statistics(&[trade(6.0, 4), trade(-2.0, 2), trade(-1.0, 6)]);
        assert_eq!(stats.total_trades, 3);
        assert_relative_eq!(stats.avg_return, 1.0);
        assert_eq!(stats.best_trade, 6.0);
        assert_eq!(stats.worst_trade, -2.0);
        assert_relative_eq!(stats.avg_holding_days, 4.0);
        assert_relative_eq!(stats.profit_factor, 2.0);

        let winners_only = MetricsCalculator::trade_statistics(&[trade(1.0, 1)]);
        assert!(winners_only.profit_factor.is_infinite());
    }

    #[test]
    fn test_summary_mentions_strategy() {
        let result = BacktestResult::from_trades("Volume Surge", vec![trade(1.5, 5)]);
        let text = result.summary();
        assert!(text.starts_with("Volume Surge"));
        assert!(text.contains("Win Rate: 100.0%"));
    }
}
