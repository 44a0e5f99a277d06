pub mod cache;
pub mod chain_payload;
pub mod loader;
pub mod types;

pub use cache::BarCache;
pub use chain_payload::{
    parse_contract, parse_expiration_key, ExpirationMap, MalformedContract, RawContract, RawOptionChain,
    RawUnderlying,
};
pub use loader::{load_bars, load_chain, BarLoader, LoaderError};
pub use types::{DailyBar, Greeks, OptionQuote, OptionType};
