//! Unusual options activity.
//!
//! A contract is unusual when volume, open interest and the volume/OI
//! ratio all clear their thresholds. This is a hard conjunctive filter,
//! results ordered by ratio descending.

use serde::{Deserialize, Serialize};

use super::chain::ChainRow;

/// Thresholds for the unusual-activity filter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnusualActivityFilter {
    /// Minimum contract volume.
    pub volume_threshold: i64,
    /// Minimum open interest.
    pub oi_threshold: i64,
    /// Minimum volume / open interest ratio.
    pub ratio_threshold: f64,
}

impl Default for UnusualActivityFilter {
    fn default() -> Self {
        Self {
            volume_threshold: 100,
            oi_threshold: 50,
            ratio_threshold: 2.0,
        }
    }
}

impl UnusualActivityFilter {
    pub fn new(volume_threshold: i64, oi_threshold: i64, ratio_threshold: f64) -> Self {
        Self {
            volume_threshold,
            oi_threshold,
            ratio_threshold,
        }
    }

    /// Whether a single row passes all three thresholds.
    pub fn matches(&self, row: &ChainRow) -> bool {
        row.quote.volume >= self.volume_threshold
            && row.quote.open_interest >= self.oi_threshold
            && row.metrics.vol_oi_ratio >= self.ratio_threshold
    }

    /// Filter and rank rows by volume/OI ratio, highest first.
    pub fn apply<'a>(&self, rows: &'a [ChainRow]) -> Vec<&'a ChainRow> {
        let mut unusual: Vec<&ChainRow> = rows.iter().filter(|r| self.matches(r)).collect();
        unusual.sort_by(|a, b| b.metrics.vol_oi_ratio.total_cmp(&a.metrics.vol_oi_ratio));
        unusual
    }

    pub fn count(&self, rows: &[ChainRow]) -> usize {
        rows.iter().filter(|r| self.matches(r)).count()
    }
}

/// Rows with unusual activity, ranked by volume/OI ratio descending.
pub fn detect_unusual_activity(
    rows: &[ChainRow],
    volume_threshold: i64,
    oi_threshold: i64,
    ratio_threshold: f64,
) -> Vec<&ChainRow> {
    UnusualActivityFilter::new(volume_threshold, oi_threshold, ratio_threshold).apply(rows)
}
