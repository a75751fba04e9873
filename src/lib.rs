//! precio-radar: cross-store grocery price comparison core.
//!
//! Queries four independent retail catalogs, normalizes their answers into
//! one product model, and derives the cheapest store for a product. See
//! [`aggregator::CrossStoreAggregator`] for the main entry point.

pub mod aggregator;
pub mod api;
pub mod error;
pub mod logging;
pub mod matching;
pub mod models;
pub mod normalization;
pub mod relevance;
pub mod stores;

pub mod util {
    pub mod env;
}

pub use aggregator::CrossStoreAggregator;
pub use error::CatalogError;
pub use matching::SimilarityConfig;
pub use models::{
    BestPriceResult, CanonicalProduct, ComparisonResult, MatchCandidate, SearchPage, SearchQuery,
    Store,
};
pub use stores::StoreCatalog;
