//! Alert strategy backtesting engine.
//!
//! Runs one strategy over one price series:
//! 1. Window the series to the requested dates
//! 2. Evaluate the entry signal on every bar
//! 3. Walk the bars as a Flat/Open state machine, closing positions when
//!    the exit rule fires
//! 4. Aggregate closed trades into a `BacktestResult`
//!
//! A position still open after the last bar is dropped, not liquidated.

use chrono::NaiveDate;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use super::series::{PriceBar, PriceSeries};
use super::strategy::AlertStrategy;
use super::trade::{Position, Trade};
use crate::metrics::BacktestResult;

/// Bars required in the requested range before any signal is evaluated.
pub const MIN_BARS: usize = 10;

/// Backtests alert strategies over daily price series.
#[derive(Debug, Clone, Copy)]
pub struct AlertBacktester {
    min_bars: usize,
}

impl Default for AlertBacktester {
    fn default() -> Self {
        Self { min_bars: MIN_BARS }
    }
}

impl AlertBacktester {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_min_bars(min_bars: usize) -> Self {
        Self { min_bars }
    }

    pub fn min_bars(&self) -> usize {
        self.min_bars
    }

    /// Run a strategy over `series` restricted to `start..=end`.
    ///
    /// Returns the empty result when the range holds fewer than the minimum
    /// number of bars.
    pub fn simulate_alert_strategy(
        &self,
        series: &PriceSeries,
        strategy: &AlertStrategy,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> BacktestResult {
        let bars = series.between(start, end);
        if bars.len() < self.min_bars {
            debug!(
                "{}: {} bars in range, need {}",
                strategy.name,
                bars.len(),
                self.min_bars
            );
            return BacktestResult::empty(&strategy.name);
        }

        if !strategy.is_supported() {
            warn!(
                "{}: {} only supports comparison 'above'; no signals will fire",
                strategy.name, strategy.signal
            );
        }

        let signals = self.generate_signals(bars, strategy);
        let trades = self.simulate_trades(bars, &signals, strategy);
        let result = BacktestResult::from_trades(&strategy.name, trades);

        info!(
            "{}: {} trades over {} bars, win rate {:.1}%, total return {:.2}%",
            strategy.name,
            result.total_signals,
            bars.len(),
            result.win_rate,
            result.total_return
        );

        result
    }

    /// Entry signal per bar.
    pub fn generate_signals(&self, bars: &[PriceBar], strategy: &AlertStrategy) -> Vec<bool> {
        bars.iter().map(|bar| strategy.signals(bar)).collect()
    }

    /// Walk bars and signals in lockstep, opening on a signal while flat and
    /// closing when the exit rule fires.
    ///
    /// The entry bar never checks the exit rule.
    pub fn simulate_trades(
        &self,
        bars: &[PriceBar],
        signals: &[bool],
        strategy: &AlertStrategy,
    ) -> Vec<Trade> {
        let mut trades = Vec::new();
        let mut position: Option<Position> = None;

        for (bar, &signal) in bars.iter().zip(signals) {
            match position.take() {
                None => {
                    if signal {
                        debug!(
                            "{}: open {:?} on {} at {}",
                            strategy.name,
                            strategy.direction(),
                            bar.date,
                            bar.close
                        );
                        position = Some(Position::open(bar.date, bar.close, strategy.direction()));
                    }
                }
                Some(open) => {
                    if open.should_exit(&strategy.exit, bar.date, bar.close) {
                        let trade = open.close(bar.date, bar.close, strategy.exit.reason());
                        debug!(
                            "{}: close on {} at {} ({:+.2}%)",
                            strategy.name, trade.exit_date, trade.exit_price, trade.pnl_pct
                        );
                        trades.push(trade);
                    } else {
                        position = Some(open);
                    }
                }
            }
        }

        if let Some(open) = position {
            debug!(
                "{}: dropping position opened {} still open at end of data",
                strategy.name, open.entry_date
            );
        }

        trades
    }

    /// Run several strategies over one series in parallel.
    ///
    /// Results are returned in the order of `strategies`.
    pub fn compare_strategies(
        &self,
        series: &PriceSeries,
        strategies: &[AlertStrategy],
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Vec<BacktestResult> {
        strategies
            .par_iter()
            .map(|strategy| self.simulate_alert_strategy(series, strategy, start, end))
            .collect()
    }
}

/// Run a strategy with the default minimum bar count.
pub fn simulate_alert_strategy(
    series: &PriceSeries,
    strategy: &AlertStrategy,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> BacktestResult {
    AlertBacktester::default().simulate_alert_strategy(series, strategy, start, end)
}

/// Compare strategies with the default minimum bar count.
pub fn compare_strategies(
    series: &PriceSeries,
    strategies: &[AlertStrategy],
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Vec<BacktestResult> {
    AlertBacktester::default().compare_strategies(series, strategies, start, end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backtest::library::{preset_strategies, volume_surge};
    use crate::backtest::series::fixtures::daily_bars;
    use crate::backtest::strategy::{Comparison, ExitRule, SignalKind};
    use crate::backtest::trade::{ExitReason, TradeDirection};
    use approx::assert_relative_eq;
    use rust_decimal_macros::dec;

    const SPIKE: usize = 30;

    /// 60 rising closes (100, 101, ...) with flat volume and one 5x spike.
    fn spike_series() -> PriceSeries {
        let closes: Vec<f64> = (0..60).map(|i| 100.0 + i as f64).collect();
        let mut volumes = vec![1_000_000; 60];
        volumes[SPIKE] = 5_000_000;
        PriceSeries::from_bars(&daily_bars(&closes, &volumes)).unwrap()
    }

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    #[test]
    fn test_insufficient_data_returns_empty() {
        let series = PriceSeries::from_bars(&daily_bars(&[100.0; 5], &[1_000; 5])).unwrap();
        let result = simulate_alert_strategy(&series, &volume_surge(), None, None);

        assert_eq!(result.total_signals, 0);
        assert_eq!(result.win_rate, 0.0);
        assert!(result.trades.is_empty());
        assert_eq!(result, BacktestResult::empty("Volume Surge"));
    }

    #[test]
    fn test_short_date_range_returns_empty() {
        let series = spike_series();
        // Jan 28 ..= Feb 5 holds 9 bars including the spike
        let start = date(28);
        let end = NaiveDate::from_ymd_opt(2024, 2, 5).unwrap();
        let result = simulate_alert_strategy(&series, &volume_surge(), Some(start), Some(end));
        assert!(result.trades.is_empty());
    }

    #[test]
    fn test_volume_spike_time_exit() {
        let series = spike_series();
        let result = simulate_alert_strategy(&series, &volume_surge(), None, None);

        assert_eq!(result.total_signals, 1);
        let trade = &result.trades[0];
        let spike_bar = &series.bars()[SPIKE];
        let exit_bar = &series.bars()[SPIKE + 5];

        assert_eq!(trade.entry_date, spike_bar.date);
        assert_eq!(trade.exit_date, exit_bar.date);
        assert_eq!(trade.duration_days, 5);
        assert_eq!(trade.entry_price, dec!(130));
        assert_eq!(trade.exit_price, dec!(135));
        assert_eq!(trade.direction, TradeDirection::Long);
        assert_eq!(trade.exit_reason, ExitReason::TimeExit);
        assert_relative_eq!(trade.pnl_pct, (135.0 - 130.0) / 130.0 * 100.0, epsilon = 1e-12);

        assert_eq!(result.profitable_signals, 1);
        assert_relative_eq!(result.win_rate, 100.0);
        assert_eq!(result.sharpe_ratio, 0.0);
    }

    #[test]
    fn test_open_position_at_end_is_dropped() {
        let closes: Vec<f64> = (0..40).map(|i| 50.0 + i as f64).collect();
        let mut volumes = vec![1_000; 40];
        volumes[37] = 10_000;
        let series = PriceSeries::from_bars(&daily_bars(&closes, &volumes)).unwrap();

        let result = simulate_alert_strategy(&series, &volume_surge(), None, None);
        assert_eq!(result.total_signals, 0);
        assert!(result.trades.is_empty());
    }

    #[test]
    fn test_entry_bar_does_not_check_exit() {
        let series = spike_series();
        let strategy = AlertStrategy::new(
            "instant target",
            SignalKind::VolumeSpike,
            3.0,
            Comparison::Above,
            ExitRule::PriceTarget(0.0),
        );
        let result = simulate_alert_strategy(&series, &strategy, None, None);

        assert_eq!(result.trades.len(), 1);
        assert_eq!(result.trades[0].duration_days, 1);
        assert_eq!(result.trades[0].exit_reason, ExitReason::ProfitTarget);
    }

    #[test]
    fn test_below_comparison_opens_short() {
        // Flat, then a 10% drop, then recovery
        let mut closes = vec![100.0; 30];
        closes[20] = 90.0;
        for c in closes.iter_mut().skip(21) {
            *c = 95.0;
        }
        let series = PriceSeries::from_bars(&daily_bars(&closes, &[1_000; 30])).unwrap();
        let strategy = AlertStrategy::new(
            "gap down",
            SignalKind::PriceChange,
            5.0,
            Comparison::Below,
            ExitRule::StopLoss(4.0),
        );
        let result = simulate_alert_strategy(&series, &strategy, None, None);

        assert_eq!(result.trades.len(), 1);
        let trade = &result.trades[0];
        assert_eq!(trade.direction, TradeDirection::Short);
        assert_eq!(trade.exit_reason, ExitReason::StopLoss);
        // Short from 90, stopped out at 95
        assert_relative_eq!(trade.pnl_pct, -5.0 / 90.0 * 100.0, epsilon = 1e-12);
        assert!(result.max_drawdown <= 0.0);
    }

    #[test]
    fn test_volume_spike_below_yields_no_trades() {
        let strategy = AlertStrategy::new(
            "quiet volume",
            SignalKind::VolumeSpike,
            3.0,
            Comparison::Below,
            ExitRule::Time(5.0),
        );
        let result = simulate_alert_strategy(&spike_series(), &strategy, None, None);
        assert!(result.trades.is_empty());
    }

    #[test]
    fn test_compare_strategies_keeps_order() {
        let series = spike_series();
        let strategies = preset_strategies();
        let results = compare_strategies(&series, &strategies, None, None);

        assert_eq!(results.len(), strategies.len());
        for (result, strategy) in results.iter().zip(&strategies) {
            assert_eq!(result.strategy, strategy.name);
        }
        assert_eq!(results[0].total_signals, 1);
    }

    #[test]
    fn test_custom_min_bars() {
        let series = PriceSeries::from_bars(&daily_bars(&[100.0; 5], &[1_000; 5])).unwrap();
        let backtester = AlertBacktester::with_min_bars(3);
        assert_eq!(backtester.min_bars(), 3);

        let signals = backtester.generate_signals(series.bars(), &volume_surge());
        assert_eq!(signals, vec![false; 5]);
    }
}
