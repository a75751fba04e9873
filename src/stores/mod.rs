//! Upstream catalog clients, one per retailer.
//!
//! Walmart, MaxiPalí and MasXMenos run VTEX storefronts and share the
//! transport cascade in [`vtex`]; Automercado is backed by a single
//! facet-indexed search service ([`automercado`]). All clients present the
//! same [`StoreCatalog`] contract to the aggregator.

pub mod automercado;
pub mod vtex;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CACHE_CONTROL, PRAGMA};

use crate::error::CatalogError;
use crate::models::{CanonicalProduct, Store};
use crate::util::env::env_parse;

/// Browser-like client identity presented to every storefront. The VTEX
/// public endpoints throttle obvious bot agents.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Per-call budget for interactive search requests.
pub fn search_timeout() -> Duration {
    Duration::from_secs(env_parse("SEARCH_TIMEOUT_SECS", 8u64))
}

/// Per-call budget for barcode and other non-interactive lookups.
pub fn lookup_timeout() -> Duration {
    Duration::from_secs(env_parse("LOOKUP_TIMEOUT_SECS", 15u64))
}

/// Shared HTTP client: browser identity plus headers that disable
/// intermediary caching, so every invocation fetches live data.
pub(crate) fn build_http_client(timeout: Duration) -> Result<reqwest::Client, CatalogError> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));

    Ok(reqwest::Client::builder()
        .user_agent(BROWSER_USER_AGENT)
        .default_headers(headers)
        .timeout(timeout)
        .build()?)
}

/// Contract every retailer client implements.
///
/// `search` returns the first non-empty normalized result of the client's
/// transport cascade, or an empty set once every transport is exhausted; it
/// never propagates upstream failure. `lookup_by_code` only returns an item
/// whose code equals the requested code exactly.
#[async_trait]
pub trait StoreCatalog: Send + Sync {
    fn store(&self) -> Store;

    async fn search(
        &self,
        query: &str,
        page: u32,
        page_size: u32,
    ) -> Result<Vec<CanonicalProduct>, CatalogError>;

    async fn lookup_by_code(&self, code: &str) -> Result<CanonicalProduct, CatalogError>;
}

/// All four production catalogs, in canonical store order.
pub fn default_catalogs() -> Result<Vec<Arc<dyn StoreCatalog>>, CatalogError> {
    Ok(vec![
        Arc::new(vtex::VtexCatalog::walmart()?),
        Arc::new(vtex::VtexCatalog::maxipali()?),
        Arc::new(vtex::VtexCatalog::masxmenos()?),
        Arc::new(automercado::AutomercadoCatalog::from_env()?),
    ])
}

/// Last non-empty segment of a slash-delimited taxonomy path
/// ("/Abarrotes/Café/Café molido/" → "Café molido"), defaulting to the
/// generic bucket when the path is absent or empty.
pub(crate) fn category_leaf(path: Option<&str>) -> String {
    path.and_then(|p| {
        p.split('/')
            .map(str::trim)
            .filter(|segment| !segment.is_empty())
            .last()
    })
    .map(|segment| segment.to_string())
    .unwrap_or_else(|| "general".to_string())
}
