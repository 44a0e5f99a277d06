//! JSON loaders for option-chain payloads and daily bar series.
//!
//! Bar series live one file per symbol:
//! `{data_dir}/{SYMBOL}.json`, each file a JSON array of
//! `{ "date", "open", "high", "low", "close", "volume" }` objects.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use super::chain_payload::RawOptionChain;
use super::types::DailyBar;

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("JSON error in {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, LoaderError> {
    if !path.exists() {
        return Err(LoaderError::FileNotFound(path.display().to_string()));
    }
    let contents = fs::read_to_string(path)?;
    serde_json::from_str(&contents).map_err(|source| LoaderError::Json {
        path: path.display().to_string(),
        source,
    })
}

/// Load a broker option-chain payload from a JSON file.
pub fn load_chain(path: impl AsRef<Path>) -> Result<RawOptionChain, LoaderError> {
    let chain: RawOptionChain = read_json(path.as_ref())?;
    debug!(
        "Loaded chain {} with {} contracts",
        chain.symbol.as_deref().unwrap_or("?"),
        chain.contract_count()
    );
    Ok(chain)
}

/// Load a daily bar series from a JSON file.
pub fn load_bars(path: impl AsRef<Path>) -> Result<Vec<DailyBar>, LoaderError> {
    read_json(path.as_ref())
}

/// Directory-backed loader for per-symbol bar files.
pub struct BarLoader {
    data_dir: PathBuf,
}

impl BarLoader {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Path of the bar file for a symbol.
    pub fn bars_path(&self, symbol: &str) -> PathBuf {
        self.data_dir.join(format!("{}.json", symbol.to_uppercase()))
    }

    /// Load the bars for one symbol.
    pub fn load(&self, symbol: &str) -> Result<Vec<DailyBar>, LoaderError> {
        let bars = load_bars(self.bars_path(symbol))?;
        debug!("Loaded {} bars for {}", bars.len(), symbol);
        Ok(bars)
    }

    /// List symbols with a bar file in the data directory.
    pub fn available_symbols(&self) -> Result<Vec<String>, LoaderError> {
        if !self.data_dir.exists() {
            return Ok(vec![]);
        }

        let mut symbols = Vec::new();
        for entry in fs::read_dir(&self.data_dir)? {
            let entry = entry?;
            let file_name = entry.file_name();
            let name = file_name.to_string_lossy();
            if let Some(symbol) = name.strip_suffix(".json") {
                symbols.push(symbol.to_string());
            }
        }
        symbols.sort();
        Ok(symbols)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("optiflow-loader-{}-{}", name, std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_missing_file() {
        let loader = BarLoader::new("/nonexistent/optiflow");
        assert!(matches!(loader.load("SPY"), Err(LoaderError::FileNotFound(_))));
        assert!(loader.available_symbols().unwrap().is_empty());
    }

    #[test]
    fn test_load_bars_and_list_symbols() {
        let dir = temp_dir("bars");
        fs::write(
            dir.join("SPY.json"),
            r#"[{"date":"2024-01-02","open":472.1,"high":473.6,"low":470.5,"close":472.65,"volume":123456}]"#,
        )
        .unwrap();

        let loader = BarLoader::new(&dir);
        let bars = loader.load("spy").unwrap();
        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].volume, 123456);
        assert_eq!(loader.available_symbols().unwrap(), vec!["SPY".to_string()]);

        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_invalid_json() {
        let dir = temp_dir("invalid");
        let path = dir.join("chain.json");
        fs::write(&path, "{ not json").unwrap();

        assert!(matches!(load_chain(&path), Err(LoaderError::Json { .. })));

        fs::remove_dir_all(dir).unwrap();
    }
}
