//! Per-symbol cache of computed price series.
//!
//! Owned by whoever drives the data fetching; the backtest core never holds
//! a cache of its own.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::backtest::PriceSeries;

/// Caches one `PriceSeries` per symbol for the lifetime of a run.
#[derive(Debug, Default)]
pub struct BarCache {
    series: HashMap<String, Arc<PriceSeries>>,
}

impl BarCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached series for `symbol`, loading it on first use.
    ///
    /// A failed load is not cached, so the next call retries.
    pub fn get_or_load<F, E>(&mut self, symbol: &str, load: F) -> Result<Arc<PriceSeries>, E>
    where
        F: FnOnce(&str) -> Result<PriceSeries, E>,
    {
        let key = symbol.to_uppercase();
        if let Some(series) = self.series.get(&key) {
            debug!("Bar cache hit for {}", key);
            return Ok(Arc::clone(series));
        }

        let series = Arc::new(load(&key)?);
        self.series.insert(key, Arc::clone(&series));
        Ok(series)
    }

    pub fn get(&self, symbol: &str) -> Option<Arc<PriceSeries>> {
        self.series.get(&symbol.to_uppercase()).cloned()
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.series.contains_key(&symbol.to_uppercase())
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    pub fn clear(&mut self) {
        self.series.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loads_once_per_symbol() {
        let mut cache = BarCache::new();
        let mut loads = 0;

        for _ in 0..3 {
            cache
                .get_or_load("spy", |_| -> Result<PriceSeries, ()> {
                    loads += 1;
                    Ok(PriceSeries::default())
                })
                .unwrap();
        }

        assert_eq!(loads, 1);
        assert!(cache.contains("SPY"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_failed_load_not_cached() {
        let mut cache = BarCache::new();
        let result = cache.get_or_load("QQQ", |_| Err::<PriceSeries, _>("offline"));
        assert_eq!(result.unwrap_err(), "offline");
        assert!(cache.is_empty());
        assert!(cache.get("QQQ").is_none());
    }
}
