//! Chain-level summary statistics.

use serde::{Deserialize, Serialize};

use super::chain::ChainRow;
use super::unusual::UnusualActivityFilter;
use crate::data::OptionType;

/// Aggregate view over a formatted chain.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChainSummary {
    pub total_contracts: usize,
    pub total_calls: usize,
    pub total_puts: usize,

    pub total_volume: i64,
    pub call_volume: i64,
    pub put_volume: i64,

    pub total_open_interest: i64,
    pub call_open_interest: i64,
    pub put_open_interest: i64,

    /// Mean feed implied volatility, in percentage points.
    pub avg_implied_vol: f64,

    /// Put volume / call volume; +inf when only puts traded.
    pub put_call_volume_ratio: f64,
    /// Put OI / call OI; +inf when only puts are open.
    pub put_call_oi_ratio: f64,

    pub unusual_activity_count: usize,

    /// Symbol and volume of the most traded contract.
    pub max_volume_contract: Option<(String, i64)>,
}

/// Ratio with a zero-denominator sentinel: +inf for a nonzero numerator,
/// otherwise 0.
pub fn guarded_ratio(numerator: i64, denominator: i64) -> f64 {
    if denominator != 0 {
        numerator as f64 / denominator as f64
    } else if numerator != 0 {
        f64::INFINITY
    } else {
        0.0
    }
}

/// Summarize rows using the default unusual-activity thresholds.
pub fn summarize(rows: &[ChainRow]) -> ChainSummary {
    summarize_with(rows, &UnusualActivityFilter::default())
}

/// Summarize rows, counting unusual activity with `filter`.
pub fn summarize_with(rows: &[ChainRow], filter: &UnusualActivityFilter) -> ChainSummary {
    if rows.is_empty() {
        return ChainSummary::default();
    }

    let mut summary = ChainSummary {
        total_contracts: rows.len(),
        ..ChainSummary::default()
    };

    for row in rows {
        let quote = &row.quote;
        match quote.option_type {
            OptionType::Call => {
                summary.total_calls += 1;
                summary.call_volume += quote.volume;
                summary.call_open_interest += quote.open_interest;
            }
            OptionType::Put => {
                summary.total_puts += 1;
                summary.put_volume += quote.volume;
                summary.put_open_interest += quote.open_interest;
            }
        }
    }

    summary.total_volume = summary.call_volume + summary.put_volume;
    summary.total_open_interest = summary.call_open_interest + summary.put_open_interest;
    summary.avg_implied_vol =
        rows.iter().map(|r| r.quote.implied_volatility).sum::<f64>() / rows.len() as f64;
    summary.put_call_volume_ratio = guarded_ratio(summary.put_volume, summary.call_volume);
    summary.put_call_oi_ratio = guarded_ratio(summary.put_open_interest, summary.call_open_interest);
    summary.unusual_activity_count = filter.count(rows);

    // First row wins ties
    summary.max_volume_contract = rows
        .iter()
        .fold(None::<&ChainRow>, |best, row| match best {
            Some(b) if b.quote.volume >= row.quote.volume => Some(b),
            _ => Some(row),
        })
        .map(|r| (r.quote.symbol.clone(), r.quote.volume));

    summary
}

/// Format large counts with K/M/B suffixes.
pub fn format_large_number(value: i64) -> String {
    let v = value as f64;
    match value.abs() {
        n if n >= 1_000_000_000 => format!("{:.1}B", v / 1_000_000_000.0),
        n if n >= 1_000_000 => format!("{:.1}M", v / 1_000_000.0),
        n if n >= 1_000 => format!("{:.1}K", v / 1_000.0),
        _ => value.to_string(),
    }
}

fn format_ratio(ratio: f64) -> String {
    if ratio.is_infinite() {
        "inf".to_string()
    } else {
        format!("{:.2}", ratio)
    }
}

impl ChainSummary {
    /// Generate a summary report.
    pub fn summary(&self) -> String {
        let top = match &self.max_volume_contract {
            Some((symbol, volume)) => format!("{} ({})", symbol, format_large_number(*volume)),
            None => "-".to_string(),
        };

        format!(
            "Chain Summary\n\
             ====================\n\
             Contracts: {} (C: {}, P: {})\n\
             Volume: {} (C: {}, P: {})\n\
             Open Interest: {} (C: {}, P: {})\n\
             Avg IV: {:.2}%\n\
             Put/Call Volume: {}\n\
             Put/Call OI: {}\n\
             Unusual Activity: {}\n\
             Most Active: {}",
            self.total_contracts,
            self.total_calls,
            self.total_puts,
            format_large_number(self.total_volume),
            format_large_number(self.call_volume),
            format_large_number(self.put_volume),
            format_large_number(self.total_open_interest),
            format_large_number(self.call_open_interest),
            format_large_number(self.put_open_interest),
            self.avg_implied_vol,
            format_ratio(self.put_call_volume_ratio),
            format_ratio(self.put_call_oi_ratio),
            self.unusual_activity_count,
            top,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::types::fixtures::call_quote;

    fn row(option_type: OptionType, volume: i64, open_interest: i64, iv: f64) -> ChainRow {
        let mut quote = call_quote();
        quote.symbol = format!("{}-{}", option_type.as_str(), volume);
        quote.option_type = option_type;
        quote.volume = volume;
        quote.open_interest = open_interest;
        quote.implied_volatility = iv;
        ChainRow::new(quote)
    }

    #[test]
    fn test_summary_counts_and_ratios() {
        let rows = vec![
            row(OptionType::Call, 400, 100, 20.0),
            row(OptionType::Call, 100, 300, 30.0),
            row(OptionType::Put, 250, 200, 40.0),
        ];

        let summary = summarize(&rows);
        assert_eq!(summary.total_contracts, 3);
        assert_eq!(summary.total_calls, 2);
        assert_eq!(summary.total_puts, 1);
        assert_eq!(summary.total_volume, 750);
        assert_eq!(summary.call_open_interest, 400);
        assert_eq!(summary.put_open_interest, 200);
        assert_eq!(summary.avg_implied_vol, 30.0);
        assert_eq!(summary.put_call_volume_ratio, 0.5);
        assert_eq!(summary.put_call_oi_ratio, 0.5);
        assert_eq!(summary.unusual_activity_count, 1);
        assert_eq!(summary.max_volume_contract, Some(("CALL-400".to_string(), 400)));
    }

    #[test]
    fn test_ratio_guard_no_put_volume() {
        let rows = vec![row(OptionType::Call, 400, 100, 20.0), row(OptionType::Put, 0, 0, 20.0)];
        let summary = summarize(&rows);
        assert_eq!(summary.put_call_volume_ratio, 0.0);
        assert_eq!(summary.put_call_oi_ratio, 0.0);
    }

    #[test]
    fn test_ratio_guard_no_call_volume() {
        let rows = vec![row(OptionType::Call, 0, 0, 20.0), row(OptionType::Put, 300, 10, 20.0)];
        let summary = summarize(&rows);
        assert_eq!(summary.put_call_volume_ratio, f64::INFINITY);
        assert_eq!(summary.put_call_oi_ratio, f64::INFINITY);
        assert!(summary.summary().contains("Put/Call Volume: inf"));
    }

    #[test]
    fn test_guarded_ratio_both_zero() {
        assert_eq!(guarded_ratio(0, 0), 0.0);
    }

    #[test]
    fn test_empty_summary() {
        let summary = summarize(&[]);
        assert_eq!(summary, ChainSummary::default());
        assert_eq!(summary.put_call_volume_ratio, 0.0);
    }

    #[test]
    fn test_format_large_number() {
        assert_eq!(format_large_number(950), "950");
        assert_eq!(format_large_number(12_500), "12.5K");
        assert_eq!(format_large_number(3_400_000), "3.4M");
        assert_eq!(format_large_number(2_000_000_000), "2.0B");
    }
}
