//! Position and trade records for alert backtests.
//!
//! A `Position` exists between an entry signal and the bar that satisfies
//! the strategy's exit rule; closing it yields an immutable `Trade`.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::strategy::ExitRule;

/// Direction of the trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeDirection {
    /// Profit when price rises.
    Long,
    /// Profit when price falls.
    Short,
}

/// Reason for exiting a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitReason {
    /// Held for the configured number of days.
    TimeExit,
    /// Hit profit target.
    ProfitTarget,
    /// Hit stop loss.
    StopLoss,
}

/// An open position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub entry_date: NaiveDate,
    pub entry_price: Decimal,
    pub direction: TradeDirection,
}

impl Position {
    pub fn open(entry_date: NaiveDate, entry_price: Decimal, direction: TradeDirection) -> Self {
        Self {
            entry_date,
            entry_price,
            direction,
        }
    }

    /// Calendar days since entry.
    pub fn days_held(&self, date: NaiveDate) -> i64 {
        (date - self.entry_date).num_days()
    }

    /// Direction-adjusted percentage P&L at `price`.
    pub fn pnl_pct(&self, price: Decimal) -> f64 {
        if self.entry_price.is_zero() {
            return 0.0;
        }
        let entry: f64 = self.entry_price.try_into().unwrap_or(0.0);
        let current: f64 = price.try_into().unwrap_or(0.0);
        let raw = (current - entry) / entry * 100.0;
        match self.direction {
            TradeDirection::Long => raw,
            TradeDirection::Short => -raw,
        }
    }

    /// Whether the exit rule fires on a bar.
    pub fn should_exit(&self, rule: &ExitRule, date: NaiveDate, price: Decimal) -> bool {
        rule.should_exit(self.days_held(date), self.pnl_pct(price))
    }

    /// Close the position into a trade record.
    pub fn close(self, exit_date: NaiveDate, exit_price: Decimal, exit_reason: ExitReason) -> Trade {
        Trade {
            entry_date: self.entry_date,
            exit_date,
            entry_price: self.entry_price,
            exit_price,
            pnl_pct: self.pnl_pct(exit_price),
            duration_days: self.days_held(exit_date),
            direction: self.direction,
            exit_reason,
        }
    }
}

/// A completed trade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub entry_date: NaiveDate,
    pub exit_date: NaiveDate,
    pub entry_price: Decimal,
    pub exit_price: Decimal,
    /// Percentage P&L, sign-adjusted for direction.
    pub pnl_pct: f64,
    /// Calendar days between entry and exit.
    pub duration_days: i64,
    pub direction: TradeDirection,
    pub exit_reason: ExitReason,
}

impl Trade {
    pub fn is_winner(&self) -> bool {
        self.pnl_pct > 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rust_decimal_macros::dec;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 2, day).unwrap()
    }

    #[test]
    fn test_long_pnl() {
        let position = Position::open(date(1), dec!(100), TradeDirection::Long);
        assert_relative_eq!(position.pnl_pct(dec!(110)), 10.0, epsilon = 1e-12);
        assert_relative_eq!(position.pnl_pct(dec!(95)), -5.0, epsilon = 1e-12);
    }

    #[test]
    fn test_short_pnl_is_reversed() {
        let position = Position::open(date(1), dec!(100), TradeDirection::Short);
        assert_relative_eq!(position.pnl_pct(dec!(90)), 10.0, epsilon = 1e-12);
        assert_relative_eq!(position.pnl_pct(dec!(104)), -4.0, epsilon = 1e-12);
    }

    #[test]
    fn test_exit_checks() {
        let position = Position::open(date(1), dec!(100), TradeDirection::Long);
        assert!(!position.should_exit(&ExitRule::Time(5.0), date(5), dec!(100)));
        assert!(position.should_exit(&ExitRule::Time(5.0), date(6), dec!(100)));
        assert!(position.should_exit(&ExitRule::PriceTarget(8.0), date(2), dec!(108)));
        assert!(position.should_exit(&ExitRule::StopLoss(3.0), date(2), dec!(96.5)));

        let short = Position::open(date(1), dec!(100), TradeDirection::Short);
        assert!(short.should_exit(&ExitRule::StopLoss(3.0), date(2), dec!(103.5)));
        assert!(!short.should_exit(&ExitRule::StopLoss(3.0), date(2), dec!(96.5)));
    }

    #[test]
    fn test_close_into_trade() {
        let position = Position::open(date(1), dec!(50), TradeDirection::Long);
        let trade = position.close(date(8), dec!(55), ExitReason::ProfitTarget);

        assert_eq!(trade.duration_days, 7);
        assert_relative_eq!(trade.pnl_pct, 10.0, epsilon = 1e-12);
        assert_eq!(trade.exit_reason, ExitReason::ProfitTarget);
        assert!(trade.is_winner());
    }
}
