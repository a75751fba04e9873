//! Client for VTEX storefronts (Walmart, MaxiPalí, MasXMenos).
//!
//! Each storefront exposes three alternative search transports; the client
//! walks them as a declarative cascade and returns the first non-empty
//! normalized result set. Exhaustion yields an empty set, never an error.

use serde::Deserialize;
use tracing::{debug, warn};

use super::{
    build_http_client, category_leaf, lookup_timeout, search_timeout, StoreCatalog,
};
use crate::error::CatalogError;
use crate::models::{CanonicalProduct, Store, DEFAULT_CURRENCY};
use crate::util::env::env_opt;

/// Ordered fallback transports, tried top to bottom.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Transport {
    /// `GET /api/catalog_system/pub/products/search/{query}` (path-encoded).
    PathSearch,
    /// `GET /api/catalog_system/pub/products/search?ft={query}`.
    KeywordSearch,
    /// `GET /api/io/_v/api/intelligent-search/product_search/`, the vendor
    /// "intelligent search" endpoint with its own pagination semantics.
    IntelligentSearch,
}

impl Transport {
    const CASCADE: [Transport; 3] = [
        Transport::PathSearch,
        Transport::KeywordSearch,
        Transport::IntelligentSearch,
    ];

    fn name(&self) -> &'static str {
        match self {
            Transport::PathSearch => "path-search",
            Transport::KeywordSearch => "keyword-search",
            Transport::IntelligentSearch => "intelligent-search",
        }
    }
}

#[derive(Debug, Clone)]
pub struct VtexCatalog {
    store: Store,
    base_url: String,
    http: reqwest::Client,
}

impl VtexCatalog {
    pub fn new(store: Store, base_url: impl Into<String>) -> Result<Self, CatalogError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        // The client carries the longer lookup budget; interactive searches
        // are clamped tighter per call.
        let http = build_http_client(lookup_timeout())?;
        Ok(Self {
            store,
            base_url,
            http,
        })
    }

    pub fn walmart() -> Result<Self, CatalogError> {
        let base = env_opt("WALMART_BASE_URL")
            .unwrap_or_else(|| "https://www.walmart.co.cr".to_string());
        Self::new(Store::Walmart, base)
    }

    pub fn maxipali() -> Result<Self, CatalogError> {
        let base = env_opt("MAXIPALI_BASE_URL")
            .unwrap_or_else(|| "https://www.maxipali.co.cr".to_string());
        Self::new(Store::MaxiPali, base)
    }

    pub fn masxmenos() -> Result<Self, CatalogError> {
        let base = env_opt("MASXMENOS_BASE_URL")
            .unwrap_or_else(|| "https://www.masxmenos.cr".to_string());
        Self::new(Store::MasXMenos, base)
    }

    async fn run_transport(
        &self,
        transport: Transport,
        query: &str,
        page: u32,
        page_size: u32,
    ) -> Result<Vec<VtexProduct>, CatalogError> {
        let page = page.max(1);
        let page_size = page_size.max(1);
        // catalog_system paginates with inclusive offsets.
        let from = (page - 1) * page_size;
        let to = from + page_size - 1;

        let request = match transport {
            Transport::PathSearch => {
                let url = format!(
                    "{}/api/catalog_system/pub/products/search/{}",
                    self.base_url,
                    urlencoding::encode(query)
                );
                self.http
                    .get(url)
                    .query(&[("_from", from.to_string()), ("_to", to.to_string())])
            }
            Transport::KeywordSearch => {
                let url = format!("{}/api/catalog_system/pub/products/search", self.base_url);
                self.http.get(url).query(&[
                    ("ft", query.to_string()),
                    ("_from", from.to_string()),
                    ("_to", to.to_string()),
                ])
            }
            Transport::IntelligentSearch => {
                let url = format!(
                    "{}/api/io/_v/api/intelligent-search/product_search/",
                    self.base_url
                );
                self.http.get(url).query(&[
                    ("query", query.to_string()),
                    ("page", page.to_string()),
                    ("count", page_size.to_string()),
                ])
            }
        };

        let body = self.fetch_text(transport, request).await?;
        match transport {
            Transport::PathSearch | Transport::KeywordSearch => {
                serde_json::from_str::<Vec<VtexProduct>>(&body).map_err(|e| {
                    CatalogError::UpstreamSchemaMismatch {
                        store: self.store,
                        detail: format!("{}: {e}", transport.name()),
                    }
                })
            }
            Transport::IntelligentSearch => serde_json::from_str::<IntelligentSearchResponse>(
                &body,
            )
            .map(|r| r.products)
            .map_err(|e| CatalogError::UpstreamSchemaMismatch {
                store: self.store,
                detail: format!("{}: {e}", transport.name()),
            }),
        }
    }

    async fn fetch_text(
        &self,
        transport: Transport,
        request: reqwest::RequestBuilder,
    ) -> Result<String, CatalogError> {
        let send = async {
            let resp = request.send().await?.error_for_status()?;
            resp.text().await.map_err(CatalogError::Http)
        };
        match tokio::time::timeout(search_timeout(), send).await {
            Ok(result) => result,
            Err(_) => Err(CatalogError::UpstreamTimeout {
                store: self.store,
                transport: transport.name(),
            }),
        }
    }

    /// Upstream fq matching is fuzzy; only a candidate whose code equals the
    /// requested code exactly (and that carries a usable price) is accepted.
    /// Everything else is discarded, recording the mismatched code.
    fn verified_candidate(
        raw: Vec<VtexProduct>,
        store: Store,
        code: &str,
        mismatch: &mut Option<String>,
    ) -> Option<CanonicalProduct> {
        for product in raw {
            let returned = product.primary_ean();
            let Some(canonical) = product.into_canonical(store) else {
                continue;
            };
            if canonical.barcode.as_deref() == Some(code) {
                if canonical.has_usable_price() {
                    return Some(canonical);
                }
                continue;
            }
            if let Some(returned) = returned {
                warn!(
                    store = %store,
                    requested = code,
                    returned = %returned,
                    "barcode mismatch; discarding candidate"
                );
                *mismatch = Some(returned);
            }
        }
        None
    }

    async fn lookup_with_facet(
        &self,
        facet: &str,
        code: &str,
    ) -> Result<Vec<VtexProduct>, CatalogError> {
        let url = format!("{}/api/catalog_system/pub/products/search", self.base_url);
        let request = self.http.get(url).query(&[
            ("fq", format!("{facet}:{code}")),
            ("_from", "0".to_string()),
            ("_to", "9".to_string()),
        ]);
        let body = self.fetch_text(Transport::KeywordSearch, request).await?;
        serde_json::from_str::<Vec<VtexProduct>>(&body).map_err(|e| {
            CatalogError::UpstreamSchemaMismatch {
                store: self.store,
                detail: format!("fq={facet}: {e}"),
            }
        })
    }
}

#[async_trait::async_trait]
impl StoreCatalog for VtexCatalog {
    fn store(&self) -> Store {
        self.store
    }

    async fn search(
        &self,
        query: &str,
        page: u32,
        page_size: u32,
    ) -> Result<Vec<CanonicalProduct>, CatalogError> {
        for transport in Transport::CASCADE {
            match self.run_transport(transport, query, page, page_size).await {
                Ok(raw) => {
                    let products: Vec<CanonicalProduct> = raw
                        .into_iter()
                        .filter_map(|p| p.into_canonical(self.store))
                        .collect();
                    // A page of unpriced listings counts as empty: the next
                    // transport may still produce usable data.
                    if products.iter().any(|p| p.has_usable_price()) {
                        debug!(
                            store = %self.store,
                            transport = transport.name(),
                            count = products.len(),
                            "search transport succeeded"
                        );
                        return Ok(products);
                    }
                    debug!(
                        store = %self.store,
                        transport = transport.name(),
                        "transport returned no usable items"
                    );
                }
                Err(err) if err.is_recoverable() => {
                    warn!(
                        store = %self.store,
                        transport = transport.name(),
                        error = %err,
                        "transport failed; advancing cascade"
                    );
                }
                Err(err) => return Err(err),
            }
        }
        Ok(Vec::new())
    }

    async fn lookup_by_code(&self, code: &str) -> Result<CanonicalProduct, CatalogError> {
        let code = code.trim();
        if code.is_empty() {
            return Err(CatalogError::Validation("empty barcode".into()));
        }

        let mut mismatch: Option<String> = None;
        for facet in ["alternateIds_Ean", "alternateIds_RefId"] {
            let raw = match self.lookup_with_facet(facet, code).await {
                Ok(raw) => raw,
                Err(err) if err.is_recoverable() => {
                    warn!(store = %self.store, facet, error = %err, "barcode facet failed");
                    continue;
                }
                Err(err) => return Err(err),
            };

            if let Some(hit) = Self::verified_candidate(raw, self.store, code, &mut mismatch) {
                return Ok(hit);
            }
        }

        match mismatch {
            Some(received) => Err(CatalogError::BarcodeMismatch {
                requested: code.to_string(),
                received,
            }),
            None => Err(CatalogError::UpstreamEmpty { store: self.store }),
        }
    }
}

/// Raw VTEX product payload. Every field is optional: the two catalog
/// transports and intelligent search agree on structure but not on casing
/// or completeness, so the offer fields accept both spellings.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VtexProduct {
    #[serde(default)]
    pub product_id: Option<String>,
    #[serde(default)]
    pub product_name: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub items: Vec<VtexItem>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VtexItem {
    #[serde(default)]
    pub item_id: Option<String>,
    #[serde(default)]
    pub ean: Option<String>,
    #[serde(default)]
    pub images: Vec<VtexImage>,
    #[serde(default)]
    pub sellers: Vec<VtexSeller>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VtexImage {
    #[serde(default)]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VtexSeller {
    #[serde(default)]
    pub commertial_offer: Option<VtexOffer>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VtexOffer {
    #[serde(default, rename = "Price", alias = "price")]
    pub price: Option<f64>,
    #[serde(default, rename = "ListPrice", alias = "listPrice")]
    pub list_price: Option<f64>,
    #[serde(default, rename = "IsAvailable", alias = "isAvailable")]
    pub is_available: Option<bool>,
    #[serde(default, rename = "AvailableQuantity", alias = "availableQuantity")]
    pub available_quantity: Option<f64>,
}

impl VtexProduct {
    fn primary_ean(&self) -> Option<String> {
        self.items
            .iter()
            .find_map(|i| i.ean.as_ref())
            .filter(|e| !e.trim().is_empty())
            .cloned()
    }

    /// Normalize into the canonical record. Listings with no sellable item
    /// are dropped; price selection prefers the active price, then the list
    /// price, then zero (filtered out downstream).
    pub fn into_canonical(self, store: Store) -> Option<CanonicalProduct> {
        let VtexProduct {
            product_id,
            product_name,
            brand,
            description,
            categories,
            items,
        } = self;

        let name = product_name.filter(|n| !n.trim().is_empty())?;
        let item = items.into_iter().find(|i| !i.sellers.is_empty())?;
        let offer = item
            .sellers
            .iter()
            .find_map(|s| s.commertial_offer.clone())
            .unwrap_or_default();

        let active = offer.price.filter(|p| *p > 0.0);
        let list_price = offer.list_price.filter(|p| *p > 0.0);
        let price = active.or(list_price).unwrap_or(0.0);

        let id = product_id
            .filter(|p| !p.trim().is_empty())
            .or_else(|| item.item_id.clone())?;
        let in_stock = offer
            .is_available
            .unwrap_or_else(|| offer.available_quantity.unwrap_or(0.0) > 0.0);

        Some(CanonicalProduct {
            id,
            name,
            brand: brand.unwrap_or_default(),
            is_on_sale: CanonicalProduct::compute_sale_flag(price, list_price),
            price,
            list_price,
            image_url: item.images.into_iter().find_map(|i| i.image_url),
            store,
            category: category_leaf(categories.first().map(String::as_str)),
            barcode: item.ean.filter(|e| !e.trim().is_empty()),
            sku: item.item_id,
            description: description.filter(|d| !d.trim().is_empty()),
            currency: DEFAULT_CURRENCY.to_string(),
            in_stock,
        })
    }
}

/// Intelligent search wraps the product list in an envelope.
#[derive(Debug, Clone, Deserialize)]
struct IntelligentSearchResponse {
    #[serde(default)]
    products: Vec<VtexProduct>,
}
