//! Option pricing.
//!
//! Black-Scholes pricing, Greeks and Newton-Raphson implied volatility.

pub mod black_scholes;

pub use black_scholes::{
    black_scholes_price, greeks, implied_volatility, validate_contract, validate_inputs, BlackScholes,
    PricingError, IV_INITIAL_GUESS, IV_MAX_ITERATIONS, IV_TOLERANCE, MIN_VOLATILITY,
};
