//! Option-chain formatting.
//!
//! Flattens the broker payload (side -> expiration -> strike -> contracts)
//! into one row per contract and adds the derived columns:
//! - moneyness (S/K for calls, K/S for puts)
//! - bid-ask spread and its percentage of mid
//! - volume / open interest ratio
//! - ITM/OTM classification
//! - absolute and percentage distance from the underlying

use std::fmt;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::data::{parse_contract, ExpirationMap, OptionQuote, OptionType, RawOptionChain};

/// In-the-money / out-of-the-money classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Moneyness {
    Itm,
    Otm,
}

impl fmt::Display for Moneyness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Itm => write!(f, "ITM"),
            Self::Otm => write!(f, "OTM"),
        }
    }
}

/// Columns derived from a quote and the underlying price.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DerivedMetrics {
    pub moneyness: f64,
    pub bid_ask_spread: Decimal,
    pub bid_ask_spread_pct: f64,
    pub vol_oi_ratio: f64,
    pub itm_otm: Moneyness,
    pub distance_from_underlying: Decimal,
    pub distance_pct: f64,
}

impl DerivedMetrics {
    pub fn from_quote(quote: &OptionQuote) -> Self {
        let spot: f64 = quote.underlying_price.try_into().unwrap_or(0.0);
        let strike: f64 = quote.strike.try_into().unwrap_or(0.0);

        let moneyness = match quote.option_type {
            OptionType::Call if strike > 0.0 => spot / strike,
            OptionType::Put if spot > 0.0 => strike / spot,
            _ => 0.0,
        };

        let distance = (quote.strike - quote.underlying_price).abs();
        let distance_pct = if spot > 0.0 {
            let d: f64 = distance.try_into().unwrap_or(0.0);
            d / spot * 100.0
        } else {
            0.0
        };

        Self {
            moneyness,
            bid_ask_spread: quote.spread(),
            bid_ask_spread_pct: quote.spread_pct(),
            vol_oi_ratio: quote.vol_oi_ratio(),
            itm_otm: if quote.is_itm() { Moneyness::Itm } else { Moneyness::Otm },
            distance_from_underlying: distance,
            distance_pct,
        }
    }
}

/// One row of the formatted chain table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainRow {
    #[serde(flatten)]
    pub quote: OptionQuote,
    #[serde(flatten)]
    pub metrics: DerivedMetrics,
}

impl ChainRow {
    pub fn new(quote: OptionQuote) -> Self {
        let metrics = DerivedMetrics::from_quote(&quote);
        Self { quote, metrics }
    }
}

/// Flat table of formatted contracts for one underlying.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FormattedChain {
    pub symbol: String,
    pub underlying_price: Decimal,
    pub as_of: Option<NaiveDate>,
    pub rows: Vec<ChainRow>,
    /// Contracts dropped because they could not be parsed.
    pub skipped: usize,
}

impl FormattedChain {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn calls(&self) -> impl Iterator<Item = &ChainRow> {
        self.rows.iter().filter(|r| r.quote.option_type == OptionType::Call)
    }

    pub fn puts(&self) -> impl Iterator<Item = &ChainRow> {
        self.rows.iter().filter(|r| r.quote.option_type == OptionType::Put)
    }

    /// Distinct expirations in ascending order.
    pub fn expirations(&self) -> Vec<NaiveDate> {
        let mut expirations: Vec<_> = self.rows.iter().map(|r| r.quote.expiration).collect();
        expirations.sort();
        expirations.dedup();
        expirations
    }

    /// Rows expiring on a given date.
    pub fn at_expiration(&self, expiration: NaiveDate) -> Vec<&ChainRow> {
        self.rows
            .iter()
            .filter(|r| r.quote.expiration == expiration)
            .collect()
    }
}

fn format_side(
    map: &ExpirationMap,
    option_type: OptionType,
    underlying_price: Decimal,
    as_of: NaiveDate,
    chain: &mut FormattedChain,
) {
    for (expiration_key, strikes) in map {
        for (strike_key, contracts) in strikes {
            for contract in contracts {
                match parse_contract(contract, option_type, expiration_key, underlying_price, as_of) {
                    Ok(quote) => chain.rows.push(ChainRow::new(quote)),
                    Err(e) => {
                        warn!(
                            "Skipping {} {} @ {}: {}",
                            option_type.as_str(),
                            expiration_key,
                            strike_key,
                            e
                        );
                        chain.skipped += 1;
                    }
                }
            }
        }
    }
}

/// Format a raw chain payload into a flat table.
///
/// Contracts that fail to parse are logged and skipped; one bad contract
/// never aborts the chain. Days to expiration are measured from `as_of`.
pub fn format_chain(raw: &RawOptionChain, as_of: NaiveDate) -> FormattedChain {
    let underlying_price = Decimal::try_from(raw.underlying_last()).unwrap_or(Decimal::ZERO);

    let mut chain = FormattedChain {
        symbol: raw.symbol.clone().unwrap_or_default(),
        underlying_price,
        as_of: Some(as_of),
        rows: Vec::with_capacity(raw.contract_count()),
        skipped: 0,
    };

    format_side(&raw.call_exp_date_map, OptionType::Call, underlying_price, as_of, &mut chain);
    format_side(&raw.put_exp_date_map, OptionType::Put, underlying_price, as_of, &mut chain);

    debug!(
        "Formatted {} chain: {} rows, {} skipped",
        chain.symbol,
        chain.rows.len(),
        chain.skipped
    );

    chain
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn as_of() -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, 12, 20).unwrap()
    }

    fn sample_chain() -> RawOptionChain {
        serde_json::from_value(json!({
            "symbol": "AAPL",
            "underlying": { "last": 200.0 },
            "callExpDateMap": {
                "2024-01-19:30": {
                    "190.0": [{ "symbol": "C190", "strikePrice": 190.0, "bid": 11.0, "ask": 11.4,
                                "totalVolume": 300, "openInterest": 100, "volatility": 22.0 }],
                    "210.0": [{ "symbol": "C210", "strikePrice": 210.0, "bid": 2.0, "ask": 2.2,
                                "totalVolume": 50, "openInterest": 0, "volatility": 21.0 }]
                }
            },
            "putExpDateMap": {
                "2024-01-19:30": {
                    "190.0": [{ "symbol": "P190", "strikePrice": 190.0, "bid": 1.5, "ask": 1.7,
                                "totalVolume": 80, "openInterest": 400, "volatility": 25.0 }],
                    "bad": [{ "symbol": "PBAD", "bid": 1.0 }]
                }
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_format_chain_skips_malformed() {
        let chain = format_chain(&sample_chain(), as_of());
        assert_eq!(chain.symbol, "AAPL");
        assert_eq!(chain.len(), 3);
        assert_eq!(chain.skipped, 1);
        assert_eq!(chain.calls().count(), 2);
        assert_eq!(chain.puts().count(), 1);
        assert_eq!(chain.expirations().len(), 1);
    }

    #[test]
    fn test_derived_columns() {
        let chain = format_chain(&sample_chain(), as_of());
        let call = chain.rows.iter().find(|r| r.quote.symbol == "C190").unwrap();

        assert!((call.metrics.moneyness - 200.0 / 190.0).abs() < 1e-12);
        assert_eq!(call.metrics.bid_ask_spread, dec!(0.4));
        assert!((call.metrics.bid_ask_spread_pct - 0.4 / 11.2 * 100.0).abs() < 1e-9);
        assert_eq!(call.metrics.vol_oi_ratio, 3.0);
        assert_eq!(call.metrics.itm_otm, Moneyness::Itm);
        assert_eq!(call.metrics.distance_from_underlying, dec!(10));
        assert!((call.metrics.distance_pct - 5.0).abs() < 1e-12);

        let put = chain.rows.iter().find(|r| r.quote.symbol == "P190").unwrap();
        assert!((put.metrics.moneyness - 0.95).abs() < 1e-12);
        assert_eq!(put.metrics.itm_otm, Moneyness::Otm);
    }

    #[test]
    fn test_zero_open_interest_ratio() {
        let chain = format_chain(&sample_chain(), as_of());
        let call = chain.rows.iter().find(|r| r.quote.symbol == "C210").unwrap();
        assert_eq!(call.metrics.vol_oi_ratio, 0.0);
        assert_eq!(call.metrics.itm_otm, Moneyness::Otm);
    }

    #[test]
    fn test_format_chain_counts_bad_strikes_and_keeps_float_counts() {
        let raw: RawOptionChain = serde_json::from_value(json!({
            "symbol": "XYZ",
            "underlying": { "last": 100.0 },
            "callExpDateMap": {
                "2024-01-19:30": {
                    "100.0": [{ "symbol": "C100", "strikePrice": 100.0, "bid": 1.0, "ask": 1.2,
                                "totalVolume": 1200.0, "openInterest": 10 }],
                    "0.0": [{ "symbol": "C0", "strikePrice": 0.0, "bid": 1.0, "ask": 1.2 }],
                    "-5.0": [{ "symbol": "CNEG", "strikePrice": -5.0, "bid": 1.0, "ask": 1.2 }]
                }
            }
        }))
        .unwrap();

        let chain = format_chain(&raw, as_of());
        assert_eq!(chain.len(), 1);
        assert_eq!(chain.skipped, 2);
        assert_eq!(chain.rows[0].quote.volume, 1200);
        assert_eq!(chain.rows[0].metrics.vol_oi_ratio, 120.0);
    }

    #[test]
    fn test_empty_payload() {
        let chain = format_chain(&RawOptionChain::default(), as_of());
        assert!(chain.is_empty());
        assert_eq!(chain.skipped, 0);
    }

    #[test]
    fn test_rows_serialize_flat() {
        let chain = format_chain(&sample_chain(), as_of());
        let value = serde_json::to_value(&chain.rows[0]).unwrap();
        assert!(value.get("strike").is_some());
        assert!(value.get("vol_oi_ratio").is_some());
        assert_eq!(value.get("itm_otm").unwrap(), "ITM");
    }
}
