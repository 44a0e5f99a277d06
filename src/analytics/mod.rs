//! Option-chain analytics.
//!
//! Provides:
//! - Chain formatting with derived columns
//! - Unusual activity detection
//! - Chain summary statistics
//! - Theoretical price / IV cross-check against the pricing model

pub mod chain;
pub mod cross_check;
pub mod summary;
pub mod unusual;

pub use chain::{format_chain, ChainRow, DerivedMetrics, FormattedChain, Moneyness};
pub use cross_check::{CrossCheckReport, CrossCheckTolerances, PricingCrossCheck, TheoreticalValue};
pub use summary::{format_large_number, guarded_ratio, summarize, summarize_with, ChainSummary};
pub use unusual::{detect_unusual_activity, UnusualActivityFilter};
