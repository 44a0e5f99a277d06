pub mod analytics;
pub mod backtest;
pub mod config;
pub mod data;
pub mod metrics;
pub mod pricing;

// Re-export commonly used types
pub use data::{BarCache, BarLoader, DailyBar, Greeks, OptionQuote, OptionType, RawOptionChain};
pub use pricing::{black_scholes_price, greeks, implied_volatility, BlackScholes, PricingError};
pub use analytics::{
    detect_unusual_activity, format_chain, summarize, ChainRow, ChainSummary, FormattedChain,
    PricingCrossCheck, UnusualActivityFilter,
};
pub use backtest::{
    compare_strategies, simulate_alert_strategy, AlertBacktester, AlertStrategy, PriceSeries, Trade,
};
pub use metrics::{BacktestResult, MetricsCalculator};
pub use config::{AnalyticsConfig, ConfigError};
