//! optiflow: option pricing, chain analytics and alert backtests.
//!
//! # Usage
//!
//! ```bash
//! # Price a contract and solve IV from a market price
//! optiflow price --spot 195 --strike 190 --days 30 --vol 0.25 --kind call --market-price 8.10
//!
//! # Format and summarize a chain payload
//! optiflow chain --file data/chains/AAPL.json --as-of 2024-06-03 --top 10
//!
//! # Backtest the configured strategies
//! optiflow backtest --data-dir data/bars --symbols AAPL,MSFT --config config/default.toml
//! ```

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use optiflow_analytics::analytics::{format_chain, summarize_with, PricingCrossCheck};
use optiflow_analytics::backtest::PriceSeries;
use optiflow_analytics::data::{load_chain, BarCache, BarLoader, OptionType};
use optiflow_analytics::pricing::validate_inputs;
use optiflow_analytics::AnalyticsConfig;

const SEPARATOR: &str = "============================================================";

#[derive(Parser)]
#[command(name = "optiflow")]
#[command(about = "Option pricing, chain analytics and alert strategy backtests")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Price a single contract with Black-Scholes
    Price {
        #[arg(long)]
        spot: f64,

        #[arg(long)]
        strike: f64,

        /// Calendar days to expiration
        #[arg(long)]
        days: f64,

        /// Annualized volatility (0.25 = 25%)
        #[arg(long)]
        vol: f64,

        /// call or put
        #[arg(long, default_value = "call")]
        kind: String,

        /// Risk-free rate; overrides the config
        #[arg(long)]
        rate: Option<f64>,

        /// Solve implied volatility from this price
        #[arg(long)]
        market_price: Option<f64>,
    },

    /// Format, summarize and cross-check an option-chain payload
    Chain {
        /// Path to chain JSON
        #[arg(short, long)]
        file: PathBuf,

        /// Valuation date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        as_of: Option<String>,

        /// Number of unusual contracts to list
        #[arg(long, default_value_t = 10)]
        top: usize,
    },

    /// Backtest alert strategies over daily bars
    Backtest {
        /// Directory holding {SYMBOL}.json bar files
        #[arg(long, default_value = "data/bars")]
        data_dir: PathBuf,

        /// Comma-separated list of symbols; defaults to every file in the directory
        #[arg(long)]
        symbols: Option<String>,

        /// Start date (YYYY-MM-DD); overrides the config
        #[arg(long)]
        start: Option<String>,

        /// End date (YYYY-MM-DD); overrides the config
        #[arg(long)]
        end: Option<String>,
    },
}

fn parse_date(value: &str, label: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .with_context(|| format!("Invalid {} date format: {}", label, value))
}

fn load_config(path: Option<&Path>) -> Result<AnalyticsConfig> {
    match path {
        Some(path) => AnalyticsConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => Ok(AnalyticsConfig::default()),
    }
}

#[allow(clippy::too_many_arguments)]
fn cmd_price(
    config: &AnalyticsConfig,
    spot: f64,
    strike: f64,
    days: f64,
    vol: f64,
    kind: &str,
    rate: Option<f64>,
    market_price: Option<f64>,
) -> Result<()> {
    let option_type =
        OptionType::from_str(kind).ok_or_else(|| anyhow!("Unknown option kind: {}", kind))?;
    let time = days / 365.0;
    validate_inputs(spot, strike, time, vol)?;

    let mut model = config.pricing.model();
    if let Some(rate) = rate {
        model.rate = rate;
    }

    let price = model.price(spot, strike, time, vol, option_type);
    let g = model.greeks(spot, strike, time, vol, option_type);

    println!("{}", SEPARATOR);
    println!(
        "{} S={:.2} K={:.2} T={:.0}d vol={:.2}% r={:.2}%",
        option_type.as_str(),
        spot,
        strike,
        days,
        vol * 100.0,
        model.rate * 100.0
    );
    println!("{}", SEPARATOR);
    println!("  Price: {:.4}", price);
    println!("  Delta: {:.4}", g.delta);
    println!("  Gamma: {:.4}", g.gamma);
    println!("  Theta: {:.4} / day", g.theta);
    println!("  Vega:  {:.4} / vol pt", g.vega);
    println!("  Rho:   {:.4} / rate pt", g.rho);

    if let Some(market) = market_price {
        match model.implied_vol(market, spot, strike, time, option_type) {
            Ok(iv) => println!("  Implied vol @ {:.4}: {:.2}%", market, iv * 100.0),
            Err(e) => println!("  Implied vol @ {:.4}: {}", market, e),
        }
    }

    Ok(())
}

fn cmd_chain(config: &AnalyticsConfig, file: &Path, as_of: NaiveDate, top: usize) -> Result<()> {
    let raw = load_chain(file).with_context(|| format!("Failed to load chain {}", file.display()))?;
    let chain = format_chain(&raw, as_of);

    if chain.skipped > 0 {
        warn!("{} contracts could not be parsed", chain.skipped);
    }
    info!("{}: {} contracts as of {}", chain.symbol, chain.len(), as_of);

    let summary = summarize_with(&chain.rows, &config.unusual);
    println!("{}", SEPARATOR);
    println!("{} @ {:.2}", chain.symbol, chain.underlying_price);
    println!("{}", SEPARATOR);
    println!("{}", summary.summary());

    let unusual = config.unusual.apply(&chain.rows);
    println!("\nUnusual activity (top {} of {}):", top.min(unusual.len()), unusual.len());
    for row in unusual.iter().take(top) {
        let q = &row.quote;
        println!(
            "  {:<24} {:>4} {:>8.2} {}  vol={:>7} oi={:>7} ratio={:>6.2}",
            q.symbol,
            q.option_type.as_str(),
            q.strike,
            q.expiration,
            q.volume,
            q.open_interest,
            row.metrics.vol_oi_ratio
        );
    }

    let report = PricingCrossCheck::new(config.pricing.model())
        .with_tolerances(config.cross_check)
        .check(&chain.rows);
    println!("\n{}", report.summary());

    Ok(())
}

fn cmd_backtest(
    config: &AnalyticsConfig,
    data_dir: PathBuf,
    symbols: Vec<String>,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Result<()> {
    let loader = BarLoader::new(data_dir);
    let backtester = config.backtest.backtester();
    let strategies = config.strategies();
    let mut cache = BarCache::new();

    info!(
        "Backtesting {} strategies on {} symbols",
        strategies.len(),
        symbols.len()
    );

    for symbol in &symbols {
        let series = match cache.get_or_load(symbol, |s| -> Result<PriceSeries> {
            let bars = loader.load(s)?;
            Ok(PriceSeries::from_bars(&bars)?)
        }) {
            Ok(series) => series,
            Err(e) => {
                warn!("Skipping {}: {:#}", symbol, e);
                continue;
            }
        };

        println!("\n{}", SEPARATOR);
        println!(
            "{}: {} bars ({} to {})",
            symbol.to_uppercase(),
            series.len(),
            series.first_date().map(|d| d.to_string()).unwrap_or_default(),
            series.last_date().map(|d| d.to_string()).unwrap_or_default(),
        );
        println!("{}", SEPARATOR);

        let results = backtester.compare_strategies(&series, &strategies, start, end);
        for result in &results {
            println!("\n{}", result.summary());
        }

        if let Some(best) = results
            .iter()
            .filter(|r| r.total_signals > 0)
            .max_by(|a, b| a.total_return.total_cmp(&b.total_return))
        {
            println!("\nBest: {} ({:.2}%)", best.strategy, best.total_return);
        }
    }

    Ok(())
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("optiflow_analytics=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Price {
            spot,
            strike,
            days,
            vol,
            kind,
            rate,
            market_price,
        } => cmd_price(&config, spot, strike, days, vol, &kind, rate, market_price)?,
        Commands::Chain { file, as_of, top } => {
            let as_of = match as_of {
                Some(d) => parse_date(&d, "as-of")?,
                None => Local::now().date_naive(),
            };
            cmd_chain(&config, &file, as_of, top)?;
        }
        Commands::Backtest {
            data_dir,
            symbols,
            start,
            end,
        } => {
            let symbols: Vec<String> = match symbols {
                Some(list) => list
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
                None => BarLoader::new(&data_dir)
                    .available_symbols()
                    .context("Failed to list bar files")?,
            };
            let start = match start {
                Some(s) => Some(parse_date(&s, "start")?),
                None => config.backtest.start,
            };
            let end = match end {
                Some(e) => Some(parse_date(&e, "end")?),
                None => config.backtest.end,
            };
            cmd_backtest(&config, data_dir, symbols, start, end)?;
        }
    }

    Ok(())
}
