//! Client for the Automercado storefront, which exposes no catalog API.
//! Search goes through the store's hosted facet index (Algolia); the client
//! presents the same contract as the VTEX catalogs but with a single
//! transport.

use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use super::{build_http_client, category_leaf, lookup_timeout, search_timeout, StoreCatalog};
use crate::error::CatalogError;
use crate::models::{CanonicalProduct, Store, DEFAULT_CURRENCY};
use crate::util::env::env_opt;

#[derive(Debug, Clone)]
pub struct AutomercadoCatalog {
    http: reqwest::Client,
    base_url: String,
    app_id: String,
    api_key: String,
    index: String,
}

impl AutomercadoCatalog {
    /// Credentials and index name come from the environment; the endpoint
    /// host is derived from the application id unless overridden. With no
    /// credentials configured the client still constructs; calls fail and
    /// the store degrades to zero results like any other upstream outage.
    pub fn from_env() -> Result<Self, CatalogError> {
        let app_id = env_opt("ALGOLIA_APP_ID").unwrap_or_default();
        let api_key = env_opt("ALGOLIA_API_KEY").unwrap_or_default();
        let index = env_opt("ALGOLIA_INDEX").unwrap_or_else(|| "Products".to_string());
        let base_url = env_opt("ALGOLIA_BASE_URL")
            .unwrap_or_else(|| format!("https://{}-dsn.algolia.net", app_id.to_lowercase()));

        if app_id.is_empty() || api_key.is_empty() {
            warn!("ALGOLIA_APP_ID / ALGOLIA_API_KEY not configured; automercado will return empty results");
        }

        Ok(Self {
            http: build_http_client(lookup_timeout())?,
            base_url: base_url.trim_end_matches('/').to_string(),
            app_id,
            api_key,
            index,
        })
    }

    async fn query_index(&self, body: serde_json::Value) -> Result<Vec<AlgoliaHit>, CatalogError> {
        let url = format!("{}/1/indexes/{}/query", self.base_url, self.index);
        let request = self
            .http
            .post(url)
            .header("X-Algolia-Application-Id", self.app_id.as_str())
            .header("X-Algolia-API-Key", self.api_key.as_str())
            .json(&body);

        let send = async {
            let resp = request.send().await?.error_for_status()?;
            resp.text().await.map_err(CatalogError::Http)
        };
        let text = match tokio::time::timeout(search_timeout(), send).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(CatalogError::UpstreamTimeout {
                    store: Store::Automercado,
                    transport: "facet-search",
                })
            }
        };

        serde_json::from_str::<AlgoliaResponse>(&text)
            .map(|r| r.hits)
            .map_err(|e| CatalogError::UpstreamSchemaMismatch {
                store: Store::Automercado,
                detail: e.to_string(),
            })
    }
}

#[async_trait::async_trait]
impl StoreCatalog for AutomercadoCatalog {
    fn store(&self) -> Store {
        Store::Automercado
    }

    async fn search(
        &self,
        query: &str,
        page: u32,
        page_size: u32,
    ) -> Result<Vec<CanonicalProduct>, CatalogError> {
        // Algolia pages are 0-based.
        let body = json!({
            "query": query,
            "page": page.max(1) - 1,
            "hitsPerPage": page_size.max(1),
        });

        match self.query_index(body).await {
            Ok(hits) => {
                let products: Vec<CanonicalProduct> =
                    hits.into_iter().filter_map(AlgoliaHit::into_canonical).collect();
                debug!(count = products.len(), "automercado facet search complete");
                Ok(products)
            }
            Err(err) if err.is_recoverable() => {
                // Single transport: an upstream failure is an empty result,
                // never a caller-visible error.
                warn!(error = %err, "automercado facet search failed");
                Ok(Vec::new())
            }
            Err(err) => Err(err),
        }
    }

    async fn lookup_by_code(&self, code: &str) -> Result<CanonicalProduct, CatalogError> {
        let code = code.trim();
        if code.is_empty() {
            return Err(CatalogError::Validation("empty barcode".into()));
        }

        let body = json!({
            "query": "",
            "filters": format!("barCode:{code}"),
            "hitsPerPage": 5,
        });
        let hits = self.query_index(body).await?;

        let mut mismatch: Option<String> = None;
        for hit in hits {
            let returned = hit.barcode.clone();
            if let Some(product) = hit.into_canonical() {
                if product.barcode.as_deref() == Some(code) {
                    if product.has_usable_price() {
                        return Ok(product);
                    }
                    continue;
                }
                if let Some(returned) = returned {
                    warn!(
                        requested = code,
                        returned = %returned,
                        "automercado barcode mismatch; discarding candidate"
                    );
                    mismatch = Some(returned);
                }
            }
        }

        match mismatch {
            Some(received) => Err(CatalogError::BarcodeMismatch {
                requested: code.to_string(),
                received,
            }),
            None => Err(CatalogError::UpstreamEmpty {
                store: Store::Automercado,
            }),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct AlgoliaResponse {
    #[serde(default)]
    hits: Vec<AlgoliaHit>,
}

/// One facet-index record. Field names drifted across index rebuilds, so
/// the common spellings are accepted as aliases.
#[derive(Debug, Clone, Deserialize)]
pub struct AlgoliaHit {
    #[serde(rename = "objectID")]
    pub object_id: String,
    #[serde(default, alias = "productName")]
    pub name: Option<String>,
    #[serde(default, alias = "brandName")]
    pub brand: Option<String>,
    #[serde(default, alias = "imageUrl")]
    pub image: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Slash-delimited taxonomy path.
    #[serde(default, alias = "categoryPath", alias = "category")]
    pub categories: Option<String>,
    #[serde(default, alias = "unitPrice", alias = "amount")]
    pub price: Option<f64>,
    #[serde(default, alias = "listPrice", alias = "regularPrice")]
    pub list_price: Option<f64>,
    #[serde(default, alias = "barCode", alias = "ean")]
    pub barcode: Option<String>,
    #[serde(default, alias = "skuId")]
    pub sku: Option<String>,
    #[serde(default, alias = "inStock", alias = "available")]
    pub in_stock: Option<bool>,
}

impl AlgoliaHit {
    pub fn into_canonical(self) -> Option<CanonicalProduct> {
        let name = self.name.filter(|n| !n.trim().is_empty())?;

        let active = self.price.filter(|p| *p > 0.0);
        let list_price = self.list_price.filter(|p| *p > 0.0);
        let price = active.or(list_price).unwrap_or(0.0);

        Some(CanonicalProduct {
            id: self.object_id,
            name,
            brand: self.brand.unwrap_or_default(),
            is_on_sale: CanonicalProduct::compute_sale_flag(price, list_price),
            price,
            list_price,
            image_url: self.image.filter(|i| !i.trim().is_empty()),
            store: Store::Automercado,
            category: category_leaf(self.categories.as_deref()),
            barcode: self.barcode.filter(|b| !b.trim().is_empty()),
            sku: self.sku,
            description: self.description.filter(|d| !d.trim().is_empty()),
            currency: DEFAULT_CURRENCY.to_string(),
            in_stock: self.in_stock.unwrap_or(true),
        })
    }
}
