//! Black-Scholes pricing, Greeks and implied volatility.
//!
//! Conventions:
//! - Time is in years, volatility and rates are annualized decimals.
//! - Theta is per calendar day (annual / 365).
//! - Vega and rho are per one percentage point (raw / 100).
//! - Expired contracts (T <= 0) are worth intrinsic value.

use std::f64::consts::{PI, SQRT_2};

use statrs::function::erf::erf;
use thiserror::Error;

use crate::data::{Greeks, OptionType};

/// Starting volatility for the Newton-Raphson solver.
pub const IV_INITIAL_GUESS: f64 = 0.20;

/// Iteration budget for the solver.
pub const IV_MAX_ITERATIONS: usize = 100;

/// Convergence tolerance on successive volatility updates.
pub const IV_TOLERANCE: f64 = 1e-5;

/// Volatility floor applied on every solver step.
pub const MIN_VOLATILITY: f64 = 0.001;

/// Raw vega below this aborts the solver.
const VEGA_EPSILON: f64 = 1e-10;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PricingError {
    #[error("Invalid pricing input: {0}")]
    InvalidInput(String),

    #[error("Implied volatility did not converge after {iterations} iterations (last sigma {sigma:.6})")]
    NoConvergence { iterations: usize, sigma: f64 },
}

/// Boundary check for pricing inputs.
///
/// The numeric routines assume these hold; call this wherever inputs come
/// from outside the crate.
pub fn validate_inputs(spot: f64, strike: f64, time: f64, vol: f64) -> Result<(), PricingError> {
    validate_contract(spot, strike, time)?;
    if time > 0.0 && !(vol.is_finite() && vol > 0.0) {
        return Err(PricingError::InvalidInput(format!("volatility must be positive, got {}", vol)));
    }
    Ok(())
}

/// Spot, strike and time checks without a volatility.
pub fn validate_contract(spot: f64, strike: f64, time: f64) -> Result<(), PricingError> {
    if !(spot.is_finite() && spot > 0.0) {
        return Err(PricingError::InvalidInput(format!("spot must be positive, got {}", spot)));
    }
    if !(strike.is_finite() && strike > 0.0) {
        return Err(PricingError::InvalidInput(format!("strike must be positive, got {}", strike)));
    }
    if !(time.is_finite() && time >= 0.0) {
        return Err(PricingError::InvalidInput(format!("time must be non-negative, got {}", time)));
    }
    Ok(())
}

/// Black-Scholes calculator for options pricing and Greeks.
#[derive(Debug, Clone, Copy)]
pub struct BlackScholes {
    /// Risk-free interest rate
    pub rate: f64,
    /// Continuous dividend yield
    pub dividend: f64,
}

impl Default for BlackScholes {
    fn default() -> Self {
        Self {
            rate: 0.05,
            dividend: 0.0,
        }
    }
}

impl BlackScholes {
    pub fn new(rate: f64, dividend: f64) -> Self {
        Self { rate, dividend }
    }

    /// Calculator with no dividend yield.
    pub fn with_rate(rate: f64) -> Self {
        Self::new(rate, 0.0)
    }

    fn d1(&self, spot: f64, strike: f64, time: f64, vol: f64) -> f64 {
        let numerator =
            (spot / strike).ln() + (self.rate - self.dividend + 0.5 * vol * vol) * time;
        numerator / (vol * time.sqrt())
    }

    fn d2(&self, spot: f64, strike: f64, time: f64, vol: f64) -> f64 {
        self.d1(spot, strike, time, vol) - vol * time.sqrt()
    }

    /// Standard normal CDF.
    pub fn norm_cdf(x: f64) -> f64 {
        0.5 * (1.0 + erf(x / SQRT_2))
    }

    /// Standard normal PDF.
    pub fn norm_pdf(x: f64) -> f64 {
        (-0.5 * x * x).exp() / (2.0 * PI).sqrt()
    }

    /// Calculate call option price.
    pub fn call_price(&self, spot: f64, strike: f64, time: f64, vol: f64) -> f64 {
        if time <= 0.0 {
            return (spot - strike).max(0.0);
        }

        let d1 = self.d1(spot, strike, time, vol);
        let d2 = self.d2(spot, strike, time, vol);

        let price = spot * (-self.dividend * time).exp() * Self::norm_cdf(d1)
            - strike * (-self.rate * time).exp() * Self::norm_cdf(d2);
        price.max(0.0)
    }

    /// Calculate put option price.
    pub fn put_price(&self, spot: f64, strike: f64, time: f64, vol: f64) -> f64 {
        if time <= 0.0 {
            return (strike - spot).max(0.0);
        }

        let d1 = self.d1(spot, strike, time, vol);
        let d2 = self.d2(spot, strike, time, vol);

        let price = strike * (-self.rate * time).exp() * Self::norm_cdf(-d2)
            - spot * (-self.dividend * time).exp() * Self::norm_cdf(-d1);
        price.max(0.0)
    }

    /// Calculate option price based on type.
    pub fn price(&self, spot: f64, strike: f64, time: f64, vol: f64, opt_type: OptionType) -> f64 {
        match opt_type {
            OptionType::Call => self.call_price(spot, strike, time, vol),
            OptionType::Put => self.put_price(spot, strike, time, vol),
        }
    }

    /// Calculate delta.
    pub fn delta(&self, spot: f64, strike: f64, time: f64, vol: f64, opt_type: OptionType) -> f64 {
        if time <= 0.0 {
            return match opt_type {
                OptionType::Call => {
                    if spot > strike {
                        1.0
                    } else {
                        0.0
                    }
                }
                OptionType::Put => {
                    if spot < strike {
                        -1.0
                    } else {
                        0.0
                    }
                }
            };
        }

        let d1 = self.d1(spot, strike, time, vol);
        let discount = (-self.dividend * time).exp();

        match opt_type {
            OptionType::Call => discount * Self::norm_cdf(d1),
            OptionType::Put => discount * (Self::norm_cdf(d1) - 1.0),
        }
    }

    /// Calculate gamma (same for calls and puts).
    pub fn gamma(&self, spot: f64, strike: f64, time: f64, vol: f64) -> f64 {
        if time <= 0.0 || vol <= 0.0 {
            return 0.0;
        }

        let d1 = self.d1(spot, strike, time, vol);
        let discount = (-self.dividend * time).exp();

        discount * Self::norm_pdf(d1) / (spot * vol * time.sqrt())
    }

    /// Raw vega: price change for a unit (100 point) change in volatility.
    fn raw_vega(&self, spot: f64, strike: f64, time: f64, vol: f64) -> f64 {
        let d1 = self.d1(spot, strike, time, vol);
        spot * (-self.dividend * time).exp() * Self::norm_pdf(d1) * time.sqrt()
    }

    /// Calculate vega per 1% change in volatility (same for calls and puts).
    pub fn vega(&self, spot: f64, strike: f64, time: f64, vol: f64) -> f64 {
        if time <= 0.0 {
            return 0.0;
        }
        self.raw_vega(spot, strike, time, vol) / 100.0
    }

    /// Calculate daily theta.
    pub fn theta(&self, spot: f64, strike: f64, time: f64, vol: f64, opt_type: OptionType) -> f64 {
        if time <= 0.0 {
            return 0.0;
        }

        let d1 = self.d1(spot, strike, time, vol);
        let d2 = self.d2(spot, strike, time, vol);
        let discount_d = (-self.dividend * time).exp();
        let discount_r = (-self.rate * time).exp();

        let term1 = -spot * discount_d * Self::norm_pdf(d1) * vol / (2.0 * time.sqrt());

        match opt_type {
            OptionType::Call => {
                let term2 = self.dividend * spot * discount_d * Self::norm_cdf(d1);
                let term3 = self.rate * strike * discount_r * Self::norm_cdf(d2);
                (term1 + term2 - term3) / 365.0
            }
            OptionType::Put => {
                let term2 = self.dividend * spot * discount_d * Self::norm_cdf(-d1);
                let term3 = self.rate * strike * discount_r * Self::norm_cdf(-d2);
                (term1 - term2 + term3) / 365.0
            }
        }
    }

    /// Calculate rho per 1% change in rates.
    pub fn rho(&self, spot: f64, strike: f64, time: f64, vol: f64, opt_type: OptionType) -> f64 {
        if time <= 0.0 {
            return 0.0;
        }

        let d2 = self.d2(spot, strike, time, vol);
        let discount = (-self.rate * time).exp();

        match opt_type {
            OptionType::Call => strike * time * discount * Self::norm_cdf(d2) / 100.0,
            OptionType::Put => -strike * time * discount * Self::norm_cdf(-d2) / 100.0,
        }
    }

    /// All five Greeks at once.
    pub fn greeks(&self, spot: f64, strike: f64, time: f64, vol: f64, opt_type: OptionType) -> Greeks {
        Greeks {
            delta: self.delta(spot, strike, time, vol, opt_type),
            gamma: self.gamma(spot, strike, time, vol),
            theta: self.theta(spot, strike, time, vol, opt_type),
            vega: self.vega(spot, strike, time, vol),
            rho: self.rho(spot, strike, time, vol, opt_type),
        }
    }

    /// Solve for the volatility that reproduces `market_price`.
    ///
    /// Newton-Raphson from 20% vol. Sigma is floored at 0.001 after every
    /// step; without the floor a large overshoot goes negative and never
    /// recovers.
    pub fn implied_vol(
        &self,
        market_price: f64,
        spot: f64,
        strike: f64,
        time: f64,
        opt_type: OptionType,
    ) -> Result<f64, PricingError> {
        self.implied_vol_with(market_price, spot, strike, time, opt_type, IV_MAX_ITERATIONS, IV_TOLERANCE)
    }

    /// `implied_vol` with an explicit iteration budget and tolerance.
    pub fn implied_vol_with(
        &self,
        market_price: f64,
        spot: f64,
        strike: f64,
        time: f64,
        opt_type: OptionType,
        max_iterations: usize,
        tolerance: f64,
    ) -> Result<f64, PricingError> {
        if time <= 0.0 {
            return Err(PricingError::InvalidInput(
                "implied volatility is undefined at or after expiry".to_string(),
            ));
        }
        if !(market_price.is_finite() && market_price > 0.0) {
            return Err(PricingError::InvalidInput(format!(
                "market price must be positive, got {}",
                market_price
            )));
        }
        validate_contract(spot, strike, time)?;

        let mut sigma = IV_INITIAL_GUESS;

        for iteration in 0..max_iterations {
            let price = self.price(spot, strike, time, sigma, opt_type);
            let vega = self.raw_vega(spot, strike, time, sigma);

            if vega.abs() < VEGA_EPSILON {
                return Err(PricingError::NoConvergence {
                    iterations: iteration + 1,
                    sigma,
                });
            }

            let next = sigma - (price - market_price) / vega;

            if (next - sigma).abs() < tolerance {
                return Ok(next.max(MIN_VOLATILITY));
            }

            sigma = next.max(MIN_VOLATILITY);
        }

        Err(PricingError::NoConvergence {
            iterations: max_iterations,
            sigma,
        })
    }
}

/// Black-Scholes price with no dividend yield.
pub fn black_scholes_price(
    spot: f64,
    strike: f64,
    time: f64,
    rate: f64,
    vol: f64,
    opt_type: OptionType,
) -> f64 {
    BlackScholes::with_rate(rate).price(spot, strike, time, vol, opt_type)
}

/// Black-Scholes Greeks with no dividend yield.
pub fn greeks(spot: f64, strike: f64, time: f64, rate: f64, vol: f64, opt_type: OptionType) -> Greeks {
    BlackScholes::with_rate(rate).greeks(spot, strike, time, vol, opt_type)
}

/// Implied volatility with no dividend yield.
pub fn implied_volatility(
    market_price: f64,
    spot: f64,
    strike: f64,
    time: f64,
    rate: f64,
    opt_type: OptionType,
) -> Result<f64, PricingError> {
    BlackScholes::with_rate(rate).implied_vol(market_price, spot, strike, time, opt_type)
}
