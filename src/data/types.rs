//! Core data types shared by the pricing, chain analytics and backtest
//! modules.
//!
//! Prices that come straight from the market feed are kept as `Decimal`;
//! model quantities (volatility, Greeks, ratios) are `f64`.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Option type (call or put).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionType {
    Call,
    Put,
}

impl OptionType {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "C" | "CALL" => Some(Self::Call),
            "P" | "PUT" => Some(Self::Put),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Call => "CALL",
            Self::Put => "PUT",
        }
    }
}

/// Greeks for an option contract.
///
/// Theta is per calendar day, vega and rho per one percentage point.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Greeks {
    pub delta: f64,
    pub gamma: f64,
    pub theta: f64,
    pub vega: f64,
    pub rho: f64,
}

/// A single exchange-listed contract observation from one chain fetch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionQuote {
    /// Contract symbol (e.g., "AAPL  240119C00190000")
    pub symbol: String,

    /// Human readable description from the feed
    pub description: String,

    /// Option type (call or put)
    pub option_type: OptionType,

    /// Strike price
    pub strike: Decimal,

    /// Option expiration date
    pub expiration: NaiveDate,

    /// Days to expiration relative to the analysis date
    pub dte: i64,

    /// Underlying last price at quote time
    pub underlying_price: Decimal,

    pub bid: Decimal,
    pub ask: Decimal,
    pub last: Decimal,
    pub mark: Decimal,

    /// Mid price: bid/ask midpoint, falling back to mark then last
    pub mid: Decimal,

    /// Trading volume
    pub volume: i64,

    /// Open interest
    pub open_interest: i64,

    /// Implied volatility as reported by the feed, in percentage points
    pub implied_volatility: f64,

    /// Greeks as reported by the feed
    pub greeks: Greeks,

    pub time_value: Decimal,
    pub intrinsic_value: Decimal,
    pub in_the_money: bool,
}

impl OptionQuote {
    /// Bid-ask spread in price terms.
    pub fn spread(&self) -> Decimal {
        self.ask - self.bid
    }

    /// Bid-ask spread as percentage of mid, 0 when mid is not positive.
    pub fn spread_pct(&self) -> f64 {
        if self.mid <= Decimal::ZERO {
            return 0.0;
        }
        let spread: f64 = self.spread().try_into().unwrap_or(0.0);
        let mid: f64 = self.mid.try_into().unwrap_or(0.0);
        spread / mid * 100.0
    }

    /// Volume / open interest, 0 when open interest is 0.
    pub fn vol_oi_ratio(&self) -> f64 {
        if self.open_interest <= 0 {
            return 0.0;
        }
        self.volume as f64 / self.open_interest as f64
    }

    /// Time to expiration in years (ACT/365).
    pub fn years_to_expiration(&self) -> f64 {
        self.dte as f64 / 365.0
    }

    /// Whether exercising now would be profitable against the underlying.
    pub fn is_itm(&self) -> bool {
        match self.option_type {
            OptionType::Call => self.underlying_price > self.strike,
            OptionType::Put => self.underlying_price < self.strike,
        }
    }
}

/// Daily OHLCV bar for an underlying, as supplied by the price-history feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyBar {
    pub date: NaiveDate,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: i64,
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use rust_decimal_macros::dec;

    /// A liquid at-the-money call used across module tests.
    pub fn call_quote() -> OptionQuote {
        OptionQuote {
            symbol: "AAPL  240119C00190000".to_string(),
            description: "AAPL Jan 19 2024 190 Call".to_string(),
            option_type: OptionType::Call,
            strike: dec!(190),
            expiration: NaiveDate::from_ymd_opt(2024, 1, 19).unwrap(),
            dte: 30,
            underlying_price: dec!(195),
            bid: dec!(7.40),
            ask: dec!(7.60),
            last: dec!(7.50),
            mark: dec!(7.50),
            mid: dec!(7.50),
            volume: 1200,
            open_interest: 400,
            implied_volatility: 24.0,
            greeks: Greeks {
                delta: 0.65,
                gamma: 0.03,
                theta: -0.08,
                vega: 0.20,
                rho: 0.09,
            },
            time_value: dec!(2.50),
            intrinsic_value: dec!(5.00),
            in_the_money: true,
        }
    }
}
