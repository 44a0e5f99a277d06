//! Daily price series with the indicators the alert strategies read.
//!
//! Per bar:
//! - daily return (close over previous close)
//! - 20-bar volume moving average and volume ratio
//! - 20-bar close moving average and sample standard deviation
//! - Bollinger bands at +/- 2 standard deviations
//! - 14-bar RSI (simple moving averages of gains and losses)
//!
//! Rolling windows include the current bar. An indicator is `None` until
//! its window is full or when it is undefined (e.g., RSI with no movement).

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::data::DailyBar;

pub const VOLUME_WINDOW: usize = 20;
pub const PRICE_WINDOW: usize = 20;
pub const BOLLINGER_STD_DEVS: f64 = 2.0;
pub const RSI_WINDOW: usize = 14;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SeriesError {
    #[error("Bars must be strictly ascending by date: {current} follows {previous}")]
    UnorderedBars { previous: NaiveDate, current: NaiveDate },
}

/// One trading day with derived indicators.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: i64,

    pub daily_return: Option<f64>,
    pub volume_ma: Option<f64>,
    pub volume_ratio: Option<f64>,
    pub price_ma: Option<f64>,
    pub price_std: Option<f64>,
    pub bollinger_upper: Option<f64>,
    pub bollinger_lower: Option<f64>,
    pub rsi: Option<f64>,
}

impl PriceBar {
    pub fn close_f64(&self) -> f64 {
        self.close.try_into().unwrap_or(0.0)
    }
}

/// Chronologically ordered bars for one symbol.
#[derive(Debug, Clone, Default)]
pub struct PriceSeries {
    bars: Vec<PriceBar>,
}

fn rolling_mean(values: &[f64], window: usize) -> Vec<Option<f64>> {
    (0..values.len())
        .map(|i| {
            if i + 1 < window {
                return None;
            }
            let slice = &values[i + 1 - window..=i];
            Some(slice.iter().sum::<f64>() / window as f64)
        })
        .collect()
}

/// Rolling sample standard deviation (n - 1 denominator).
fn rolling_std(values: &[f64], window: usize) -> Vec<Option<f64>> {
    (0..values.len())
        .map(|i| {
            if window < 2 || i + 1 < window {
                return None;
            }
            let slice = &values[i + 1 - window..=i];
            let mean = slice.iter().sum::<f64>() / window as f64;
            let variance =
                slice.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (window - 1) as f64;
            Some(variance.sqrt())
        })
        .collect()
}

/// Simple-average RSI. The first bar has no prior close and contributes a
/// zero move, so the first value lands on bar `window - 1`.
fn rsi(closes: &[f64], window: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; closes.len()];
    if window == 0 || closes.len() < window {
        return out;
    }

    // moves[i] is the move into bar i
    let moves: Vec<f64> = std::iter::once(0.0)
        .chain(closes.windows(2).map(|w| w[1] - w[0]))
        .collect();

    for i in window - 1..closes.len() {
        let slice = &moves[i + 1 - window..=i];
        let gain = slice.iter().map(|d| d.max(0.0)).sum::<f64>() / window as f64;
        let loss = slice.iter().map(|d| (-d).max(0.0)).sum::<f64>() / window as f64;

        out[i] = if loss > 0.0 {
            Some(100.0 - 100.0 / (1.0 + gain / loss))
        } else if gain > 0.0 {
            Some(100.0)
        } else {
            None
        };
    }

    out
}

impl PriceSeries {
    /// Compute indicators over bars that are strictly ascending by date.
    pub fn from_bars(bars: &[DailyBar]) -> Result<Self, SeriesError> {
        for pair in bars.windows(2) {
            if pair[1].date <= pair[0].date {
                return Err(SeriesError::UnorderedBars {
                    previous: pair[0].date,
                    current: pair[1].date,
                });
            }
        }

        let closes: Vec<f64> = bars
            .iter()
            .map(|b| b.close.try_into().unwrap_or(0.0))
            .collect();
        let volumes: Vec<f64> = bars.iter().map(|b| b.volume as f64).collect();

        let volume_ma = rolling_mean(&volumes, VOLUME_WINDOW);
        let price_ma = rolling_mean(&closes, PRICE_WINDOW);
        let price_std = rolling_std(&closes, PRICE_WINDOW);
        let rsi = rsi(&closes, RSI_WINDOW);

        let bars = bars
            .iter()
            .enumerate()
            .map(|(i, bar)| {
                let daily_return = match i.checked_sub(1).map(|p| closes[p]) {
                    Some(prev) if prev > 0.0 => Some(closes[i] / prev - 1.0),
                    _ => None,
                };
                let volume_ratio = volume_ma[i]
                    .filter(|ma| *ma > 0.0)
                    .map(|ma| volumes[i] / ma);
                let (upper, lower) = match (price_ma[i], price_std[i]) {
                    (Some(ma), Some(sd)) => (
                        Some(ma + BOLLINGER_STD_DEVS * sd),
                        Some(ma - BOLLINGER_STD_DEVS * sd),
                    ),
                    _ => (None, None),
                };

                PriceBar {
                    date: bar.date,
                    open: bar.open,
                    high: bar.high,
                    low: bar.low,
                    close: bar.close,
                    volume: bar.volume,
                    daily_return,
                    volume_ma: volume_ma[i],
                    volume_ratio,
                    price_ma: price_ma[i],
                    price_std: price_std[i],
                    bollinger_upper: upper,
                    bollinger_lower: lower,
                    rsi: rsi[i],
                }
            })
            .collect();

        Ok(Self { bars })
    }

    pub fn bars(&self) -> &[PriceBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.bars.first().map(|b| b.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.bars.last().map(|b| b.date)
    }

    /// Bars with `start <= date <= end`; open bounds are unbounded.
    pub fn between(&self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> &[PriceBar] {
        let lo = match start {
            Some(s) => self.bars.partition_point(|b| b.date < s),
            None => 0,
        };
        let hi = match end {
            Some(e) => self.bars.partition_point(|b| b.date <= e),
            None => self.bars.len(),
        };
        if lo >= hi {
            return &[];
        }
        &self.bars[lo..hi]
    }
}
