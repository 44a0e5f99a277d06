//! Broker option-chain payload.
//!
//! The market-data collaborator hands over one JSON document per underlying:
//!
//! ```json
//! {
//!   "symbol": "AAPL",
//!   "underlying": { "last": 195.12 },
//!   "callExpDateMap": { "2024-01-19:30": { "190.0": [ { ...contract... } ] } },
//!   "putExpDateMap":  { ... }
//! }
//! ```
//!
//! Contracts are kept as raw JSON values until they are parsed one by one, so
//! a single malformed contract cannot fail decoding of the whole chain.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use super::types::{Greeks, OptionQuote, OptionType};

/// Reasons a single contract is rejected while formatting a chain.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MalformedContract {
    #[error("Contract could not be decoded: {0}")]
    Decode(String),

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid strike: {0}")]
    InvalidStrike(f64),

    #[error("Invalid {field}: {value}")]
    InvalidPrice { field: &'static str, value: f64 },

    #[error("Invalid expiration key: {0}")]
    InvalidExpiration(String),

    #[error("Crossed market: bid {bid} > ask {ask}")]
    CrossedMarket { bid: Decimal, ask: Decimal },

    #[error("Expired {days} days before the analysis date")]
    Expired { days: i64 },
}

/// Contracts grouped by expiration key, then strike key.
pub type ExpirationMap = BTreeMap<String, BTreeMap<String, Vec<serde_json::Value>>>;

/// Underlying section of the payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawUnderlying {
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub last: Option<f64>,
}

/// Top-level option-chain payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawOptionChain {
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub underlying: Option<RawUnderlying>,
    #[serde(default)]
    pub underlying_price: Option<f64>,
    #[serde(default)]
    pub call_exp_date_map: ExpirationMap,
    #[serde(default)]
    pub put_exp_date_map: ExpirationMap,
}

impl RawOptionChain {
    /// Underlying last price, preferring the underlying sub-object.
    pub fn underlying_last(&self) -> f64 {
        self.underlying
            .as_ref()
            .and_then(|u| u.last)
            .or(self.underlying_price)
            .unwrap_or(0.0)
    }

    /// Total number of raw contract entries for both sides.
    pub fn contract_count(&self) -> usize {
        [&self.call_exp_date_map, &self.put_exp_date_map]
            .iter()
            .flat_map(|m| m.values())
            .flat_map(|strikes| strikes.values())
            .map(|contracts| contracts.len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.call_exp_date_map.is_empty() && self.put_exp_date_map.is_empty()
    }
}

/// Raw contract fields as sent by the broker.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawContract {
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub strike_price: Option<f64>,
    #[serde(default)]
    pub bid: Option<f64>,
    #[serde(default)]
    pub ask: Option<f64>,
    #[serde(default)]
    pub last: Option<f64>,
    #[serde(default)]
    pub mark: Option<f64>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub total_volume: Option<i64>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub open_interest: Option<i64>,
    #[serde(default)]
    pub volatility: Option<f64>,
    #[serde(default)]
    pub delta: Option<f64>,
    #[serde(default)]
    pub gamma: Option<f64>,
    #[serde(default)]
    pub theta: Option<f64>,
    #[serde(default)]
    pub vega: Option<f64>,
    #[serde(default)]
    pub rho: Option<f64>,
    #[serde(default)]
    pub time_value: Option<f64>,
    #[serde(default)]
    pub intrinsic_value: Option<f64>,
    #[serde(default)]
    pub in_the_money: Option<bool>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawCount {
    Int(i64),
    Float(f64),
}

/// Counts arrive as JSON integers or floats (`1200` or `1200.0`); fractions
/// are truncated.
fn lenient_count<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<RawCount>::deserialize(deserializer)? {
        None => Ok(None),
        Some(RawCount::Int(n)) => Ok(Some(n)),
        Some(RawCount::Float(f)) if f.is_finite() && f.abs() < i64::MAX as f64 => Ok(Some(f.trunc() as i64)),
        Some(RawCount::Float(f)) => Err(D::Error::custom(format!("count out of range: {}", f))),
    }
}

/// Parse the date part of an expiration key such as `"2024-01-19:30"`.
pub fn parse_expiration_key(key: &str) -> Result<NaiveDate, MalformedContract> {
    let date_part = key.split(':').next().unwrap_or(key).trim();
    let date_part = date_part.split('T').next().unwrap_or(date_part);

    NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(date_part, "%m/%d/%Y"))
        .map_err(|_| MalformedContract::InvalidExpiration(key.to_string()))
}

fn decimal_field(field: &'static str, value: Option<f64>) -> Result<Decimal, MalformedContract> {
    let value = value.unwrap_or(0.0);
    Decimal::try_from(value).map_err(|_| MalformedContract::InvalidPrice { field, value })
}

/// Feed values such as `NaN` or the -999 sentinel are reported as 0.
fn model_field(value: Option<f64>) -> f64 {
    match value {
        Some(v) if v.is_finite() && v > -999.0 => v,
        _ => 0.0,
    }
}

impl RawContract {
    /// Convert into an `OptionQuote`, enforcing the quote invariants.
    pub fn to_quote(
        &self,
        option_type: OptionType,
        expiration: NaiveDate,
        underlying_price: Decimal,
        as_of: NaiveDate,
    ) -> Result<OptionQuote, MalformedContract> {
        let strike = self
            .strike_price
            .ok_or(MalformedContract::MissingField("strikePrice"))?;
        if !strike.is_finite() || strike <= 0.0 {
            return Err(MalformedContract::InvalidStrike(strike));
        }
        let strike = Decimal::try_from(strike).map_err(|_| MalformedContract::InvalidStrike(strike))?;

        let bid = decimal_field("bid", self.bid)?;
        let ask = decimal_field("ask", self.ask)?;
        let last = decimal_field("last", self.last)?;
        let mark = decimal_field("mark", self.mark)?;

        if bid > Decimal::ZERO && ask > Decimal::ZERO && bid > ask {
            return Err(MalformedContract::CrossedMarket { bid, ask });
        }

        let dte = (expiration - as_of).num_days();
        if dte < 0 {
            return Err(MalformedContract::Expired { days: -dte });
        }

        let mid = if bid > Decimal::ZERO && ask > Decimal::ZERO {
            (bid + ask) / Decimal::from(2)
        } else if mark > Decimal::ZERO {
            mark
        } else {
            last
        };

        Ok(OptionQuote {
            symbol: self.symbol.clone().unwrap_or_default(),
            description: self.description.clone().unwrap_or_default(),
            option_type,
            strike,
            expiration,
            dte,
            underlying_price,
            bid,
            ask,
            last,
            mark,
            mid,
            volume: self.total_volume.unwrap_or(0),
            open_interest: self.open_interest.unwrap_or(0),
            implied_volatility: model_field(self.volatility),
            greeks: Greeks {
                delta: model_field(self.delta),
                gamma: model_field(self.gamma),
                theta: model_field(self.theta),
                vega: model_field(self.vega),
                rho: model_field(self.rho),
            },
            time_value: decimal_field("timeValue", self.time_value)?,
            intrinsic_value: decimal_field("intrinsicValue", self.intrinsic_value)?,
            in_the_money: self.in_the_money.unwrap_or(false),
        })
    }
}

/// Decode and convert one raw contract value.
pub fn parse_contract(
    value: &serde_json::Value,
    option_type: OptionType,
    expiration_key: &str,
    underlying_price: Decimal,
    as_of: NaiveDate,
) -> Result<OptionQuote, MalformedContract> {
    let raw = RawContract::deserialize(value).map_err(|e| MalformedContract::Decode(e.to_string()))?;
    let expiration = parse_expiration_key(expiration_key)?;
    raw.to_quote(option_type, expiration, underlying_price, as_of)
}
