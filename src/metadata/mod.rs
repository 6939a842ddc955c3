pub mod fetchers;
pub mod types;

pub use fetchers::{CachedFetch, FetcherRegistry};
pub use types::{EnrichReport, FetcherStatus, Metadata};
