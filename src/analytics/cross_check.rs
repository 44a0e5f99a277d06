//! Theoretical cross-check of a formatted chain.
//!
//! Recomputes price and Greeks with Black-Scholes at the feed's implied
//! volatility, solves implied volatility back from the mid price, and counts
//! how many contracts agree with the feed within tolerance.
//!
//! Default tolerances:
//! - Price: +/- $0.05
//! - Delta: +/- 0.05
//! - IV: +/- 0.02 (2 vol points)

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::chain::ChainRow;
use crate::data::Greeks;
use crate::pricing::{validate_inputs, BlackScholes, PricingError};

/// Tolerances for agreement with the feed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrossCheckTolerances {
    pub price_tolerance: f64,
    pub delta_tolerance: f64,
    pub iv_tolerance: f64,
}

impl Default for CrossCheckTolerances {
    fn default() -> Self {
        Self {
            price_tolerance: 0.05,
            delta_tolerance: 0.05,
            iv_tolerance: 0.02,
        }
    }
}

/// Model values for one contract.
#[derive(Debug, Clone)]
pub struct TheoreticalValue {
    /// Price at the feed's implied volatility.
    pub price: f64,
    /// Greeks at the feed's implied volatility.
    pub greeks: Greeks,
    /// Volatility solved from the mid price.
    pub implied_vol: Result<f64, PricingError>,
}

/// Result of cross-checking a chain.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CrossCheckReport {
    pub total_rows: usize,
    pub checked_rows: usize,
    pub price_within_tolerance: usize,
    pub delta_within_tolerance: usize,
    pub iv_solved: usize,
    pub iv_within_tolerance: usize,
    /// Rows where the solver failed; never folded into a 0% volatility.
    pub iv_no_convergence: usize,
}

impl CrossCheckReport {
    fn rate(&self, count: usize) -> f64 {
        if self.checked_rows == 0 {
            return 0.0;
        }
        count as f64 / self.checked_rows as f64
    }

    pub fn price_pass_rate(&self) -> f64 {
        self.rate(self.price_within_tolerance)
    }

    pub fn delta_pass_rate(&self) -> f64 {
        self.rate(self.delta_within_tolerance)
    }

    pub fn iv_pass_rate(&self) -> f64 {
        self.rate(self.iv_within_tolerance)
    }

    pub fn summary(&self) -> String {
        format!(
            "Cross-check: {}/{} rows, price={:.1}%, delta={:.1}%, iv={:.1}% ({} no convergence)",
            self.checked_rows,
            self.total_rows,
            self.price_pass_rate() * 100.0,
            self.delta_pass_rate() * 100.0,
            self.iv_pass_rate() * 100.0,
            self.iv_no_convergence,
        )
    }
}

/// Cross-checks feed quotes against the pricing model.
pub struct PricingCrossCheck {
    bs: BlackScholes,
    tolerances: CrossCheckTolerances,
}

impl PricingCrossCheck {
    pub fn new(bs: BlackScholes) -> Self {
        Self {
            bs,
            tolerances: CrossCheckTolerances::default(),
        }
    }

    pub fn with_tolerances(mut self, tolerances: CrossCheckTolerances) -> Self {
        self.tolerances = tolerances;
        self
    }

    /// Model values for a row, or `None` when the row cannot be priced
    /// (expiring today, no feed volatility, non-positive prices).
    pub fn theoretical(&self, row: &ChainRow) -> Option<TheoreticalValue> {
        let quote = &row.quote;
        let spot: f64 = quote.underlying_price.try_into().ok()?;
        let strike: f64 = quote.strike.try_into().ok()?;
        let mid: f64 = quote.mid.try_into().ok()?;
        let time = quote.years_to_expiration();
        let vol = quote.implied_volatility / 100.0;

        if time <= 0.0 || validate_inputs(spot, strike, time, vol).is_err() {
            return None;
        }

        Some(TheoreticalValue {
            price: self.bs.price(spot, strike, time, vol, quote.option_type),
            greeks: self.bs.greeks(spot, strike, time, vol, quote.option_type),
            implied_vol: self.bs.implied_vol(mid, spot, strike, time, quote.option_type),
        })
    }

    /// Cross-check every row.
    pub fn check(&self, rows: &[ChainRow]) -> CrossCheckReport {
        let mut report = CrossCheckReport {
            total_rows: rows.len(),
            ..CrossCheckReport::default()
        };

        for row in rows {
            let Some(theo) = self.theoretical(row) else {
                continue;
            };
            report.checked_rows += 1;

            let quote = &row.quote;
            let mid: f64 = quote.mid.try_into().unwrap_or(0.0);

            if (theo.price - mid).abs() <= self.tolerances.price_tolerance {
                report.price_within_tolerance += 1;
            }

            if (theo.greeks.delta - quote.greeks.delta).abs() <= self.tolerances.delta_tolerance {
                report.delta_within_tolerance += 1;
            }

            match theo.implied_vol {
                Ok(iv) => {
                    report.iv_solved += 1;
                    if (iv - quote.implied_volatility / 100.0).abs() <= self.tolerances.iv_tolerance {
                        report.iv_within_tolerance += 1;
                    }
                }
                Err(e) => {
                    debug!("IV solve failed for {}: {}", quote.symbol, e);
                    report.iv_no_convergence += 1;
                }
            }
        }

        report
    }
}

impl Default for PricingCrossCheck {
    fn default() -> Self {
        Self::new(BlackScholes::default())
    }
}
