//! Data ingestion: symbol sources, normalization, loading and providers

pub mod loader;
pub mod normalize;
pub mod provider;
pub mod source;
pub mod yahoo;

pub use loader::load;
pub use normalize::{normalize, NormalizeError, Normalized, CANONICAL_COLUMNS};
pub use provider::{MarketDataProvider, MemoryProvider, ProviderError};
pub use source::{list_sources, read_source, source_path, write_source, SourceError};
pub use yahoo::YahooProvider;
