//! Cross-store aggregator: concurrent fan-out across the four catalog
//! clients, per-store fallback retries, and best-price derivation.
//!
//! Scheduling is per-request: each comparison spawns one task per retailer
//! and joins on all of them. Branches share no mutable state; each returns
//! an immutable product list that a pure reducer merges. One store's
//! failure never cancels or blocks its siblings.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use itertools::Itertools;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::error::CatalogError;
use crate::matching::{self, SimilarityConfig};
use crate::models::{
    BestPriceResult, CanonicalProduct, ComparisonResult, SearchPage, SearchQuery, Store,
    StoreResults,
};
use crate::normalization::{category, quantity, text};
use crate::relevance;
use crate::stores::{default_catalogs, StoreCatalog};
use crate::util::env::{env_flag, env_parse};

/// How many listings each store contributes to a comparison.
fn compare_page_size() -> u32 {
    env_parse("COMPARE_PAGE_SIZE", 10u32)
}

pub struct CrossStoreAggregator {
    catalogs: Vec<Arc<dyn StoreCatalog>>,
    similarity: SimilarityConfig,
}

impl CrossStoreAggregator {
    pub fn new(catalogs: Vec<Arc<dyn StoreCatalog>>, similarity: SimilarityConfig) -> Self {
        Self {
            catalogs,
            similarity,
        }
    }

    /// Production wiring: all four storefront clients, env-tuned weights.
    pub fn from_env() -> Result<Self, CatalogError> {
        Ok(Self::new(default_catalogs()?, SimilarityConfig::from_env()))
    }

    /// Alternate query reformulations for a store that returned nothing,
    /// in the order they are tried: leading significant words, then
    /// longer/numeric keyword tokens, then detected category + measurement.
    pub fn fallback_queries(name: &str) -> Vec<String> {
        let tokens = text::tokenize(name);
        let normalized = text::normalize(name);
        let mut queries: Vec<String> = Vec::new();

        let lead = tokens.iter().take(3).join(" ");
        queries.push(lead);

        let keywords = tokens
            .iter()
            .filter(|t| t.chars().count() >= 5 || t.chars().any(|c| c.is_ascii_digit()))
            .join(" ");
        queries.push(keywords);

        let mut focused: Vec<String> = Vec::new();
        if let Some(cat) = category::detect(name) {
            focused.push(cat.token);
        }
        if let Some(q) = quantity::detect(name) {
            focused.push(q.raw);
        }
        queries.push(focused.join(" "));

        queries
            .into_iter()
            .filter(|q| !q.is_empty() && *q != normalized)
            .unique()
            .collect()
    }

    /// One store branch: barcode lookup first when a code is supplied, then
    /// the name search, then the fallback reformulations. Reformulations run
    /// sequentially to bound upstream call volume. Every failure is absorbed
    /// into an empty result.
    async fn fetch_store(
        catalog: Arc<dyn StoreCatalog>,
        name: String,
        barcode: Option<String>,
        page_size: u32,
    ) -> Vec<CanonicalProduct> {
        let store = catalog.store();

        if let Some(code) = barcode {
            match catalog.lookup_by_code(&code).await {
                Ok(product) => return vec![product],
                Err(err) => debug!(
                    store = %store,
                    error = %err,
                    "barcode lookup missed; falling back to name search"
                ),
            }
        }

        match catalog.search(&name, 1, page_size).await {
            Ok(products) if !products.is_empty() => return products,
            Ok(_) => debug!(store = %store, "initial search empty; trying reformulations"),
            Err(err) => warn!(store = %store, error = %err, "initial search failed"),
        }

        for alt in Self::fallback_queries(&name) {
            match catalog.search(&alt, 1, page_size).await {
                Ok(products) if !products.is_empty() => {
                    debug!(store = %store, query = %alt, "fallback query succeeded");
                    return products;
                }
                Ok(_) => {}
                Err(err) => warn!(store = %store, query = %alt, error = %err, "fallback query failed"),
            }
        }

        Vec::new()
    }

    /// Compare a product across all stores and derive the cheapest offer.
    ///
    /// Fails only on empty caller input; upstream unavailability degrades to
    /// fewer stores represented.
    pub async fn compare(
        &self,
        name: &str,
        barcode: Option<&str>,
        original_store: Option<Store>,
    ) -> Result<ComparisonResult, CatalogError> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(CatalogError::Validation("empty product name".into()));
        }
        let page_size = compare_page_size();

        let mut branches = JoinSet::new();
        for catalog in &self.catalogs {
            let catalog = Arc::clone(catalog);
            let name = trimmed.to_string();
            let barcode = barcode.map(|c| c.to_string());
            branches.spawn(async move {
                let store = catalog.store();
                (
                    store,
                    Self::fetch_store(catalog, name, barcode, page_size).await,
                )
            });
        }

        let mut collected: HashMap<Store, Vec<CanonicalProduct>> = HashMap::new();
        while let Some(joined) = branches.join_next().await {
            match joined {
                Ok((store, products)) => {
                    collected.insert(store, products);
                }
                // Catch-all boundary: a panicked branch degrades to zero
                // results for that store.
                Err(err) => warn!(error = %err, "store branch failed to join"),
            }
        }

        let query = SearchQuery {
            text: trimmed.to_string(),
            page: 1,
            page_size,
            original_store,
        };

        let mut products_by_store = Vec::with_capacity(Store::ALL.len());
        for store in Store::ALL {
            let mut products = collected.remove(&store).unwrap_or_default();
            // Upstream schema drift can mislabel listings; every product is
            // stamped with the branch it came from.
            for product in &mut products {
                product.store = store;
            }
            let products = relevance::filter_products(products, &query);
            products_by_store.push(StoreResults { store, products });
        }

        if env_flag("COMPARE_MATCH_NARROWING", true) {
            if let Some(reference) = self.reference_product(original_store, &products_by_store) {
                self.narrow_to_matches(&reference, original_store, &mut products_by_store);
            }
        }

        let best_price = Self::best_price(&products_by_store);
        info!(
            query = %trimmed,
            stores_with_results = products_by_store.iter().filter(|s| !s.products.is_empty()).count(),
            best_store = best_price.as_ref().map(|b| b.store.slug()).unwrap_or("none"),
            "comparison complete"
        );

        Ok(ComparisonResult {
            products_by_store,
            best_price,
        })
    }

    /// Concurrent search across every catalog for the `store=all` scope.
    /// No reformulation retries here: interactive search reports what the
    /// first-pass cascades return.
    pub async fn search_all(&self, query: &SearchQuery) -> SearchPage {
        let branches = self.catalogs.iter().map(|catalog| {
            let catalog = Arc::clone(catalog);
            let text = query.text.clone();
            let (page, page_size) = (query.page, query.page_size);
            async move {
                let store = catalog.store();
                (store, catalog.search(&text, page, page_size).await)
            }
        });

        let mut collected: HashMap<Store, Vec<CanonicalProduct>> = HashMap::new();
        let mut any_full_page = false;
        for (store, outcome) in join_all(branches).await {
            match outcome {
                Ok(products) => {
                    any_full_page |= products.len() as u32 >= query.page_size;
                    collected.insert(store, products);
                }
                Err(err) => {
                    warn!(store = %store, error = %err, "store search failed");
                }
            }
        }

        let mut merged = Vec::new();
        for store in Store::ALL {
            let mut products = collected.remove(&store).unwrap_or_default();
            for product in &mut products {
                product.store = store;
            }
            merged.extend(relevance::filter_products(products, query));
        }

        SearchPage {
            total: merged.len() as u64,
            page: query.page,
            page_size: query.page_size,
            has_more: any_full_page,
            products: merged,
        }
    }

    /// The listing the comparison is anchored on: the cheapest product the
    /// hinted origin store returned.
    fn reference_product(
        &self,
        original_store: Option<Store>,
        products_by_store: &[StoreResults],
    ) -> Option<CanonicalProduct> {
        let store = original_store?;
        let entry = products_by_store.iter().find(|s| s.store == store)?;
        Self::cheapest(&entry.products).cloned()
    }

    /// Keep only listings the scorer considers the same product as the
    /// reference. A store with no confident match contributes nothing:
    /// ambiguous listings must not masquerade as price comparisons.
    fn narrow_to_matches(
        &self,
        reference: &CanonicalProduct,
        original_store: Option<Store>,
        products_by_store: &mut [StoreResults],
    ) {
        for entry in products_by_store.iter_mut() {
            if Some(entry.store) == original_store {
                continue;
            }
            let before = entry.products.len();
            entry.products.retain(|candidate| {
                matching::evaluate(reference, candidate, &self.similarity).matched
            });
            if before != entry.products.len() {
                debug!(
                    store = %entry.store,
                    kept = entry.products.len(),
                    dropped = before - entry.products.len(),
                    "similarity narrowing applied"
                );
            }
        }
    }

    /// Minimum-price item of one store's list; ties keep the first seen.
    fn cheapest(products: &[CanonicalProduct]) -> Option<&CanonicalProduct> {
        products
            .iter()
            .filter(|p| p.has_usable_price())
            .fold(None, |best, p| match best {
                Some(b) if p.price < b.price => Some(p),
                Some(b) => Some(b),
                None => Some(p),
            })
    }

    /// Global minimum across the per-store cheapest items, with savings
    /// against the next-cheapest known price.
    fn best_price(products_by_store: &[StoreResults]) -> Option<BestPriceResult> {
        let ranked: Vec<(Store, f64)> = products_by_store
            .iter()
            .filter_map(|entry| Self::cheapest(&entry.products).map(|p| (entry.store, p.price)))
            .sorted_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
            .collect();

        let (store, price) = *ranked.first()?;
        let (savings, savings_percentage) = match ranked.get(1) {
            Some((_, second)) => {
                let savings = second - price;
                (savings, (savings / price * 100.0).round() as u32)
            }
            None => (0.0, 0),
        };

        Some(BestPriceResult {
            store,
            price,
            savings,
            savings_percentage,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    fn product(store: Store, id: &str, name: &str, price: f64) -> CanonicalProduct {
        CanonicalProduct {
            id: id.into(),
            name: name.into(),
            brand: "Quetzal".into(),
            price,
            list_price: None,
            image_url: None,
            store,
            category: "general".into(),
            barcode: None,
            sku: None,
            description: None,
            currency: "CRC".into(),
            in_stock: true,
            is_on_sale: false,
        }
    }

    /// Stub catalog: answers `responses` for any query it has an entry for,
    /// and empty otherwise. `only_query` restricts answers to one exact
    /// query string, for exercising the reformulation ladder.
    struct StubCatalog {
        store: Store,
        products: Vec<CanonicalProduct>,
        only_query: Option<String>,
    }

    impl StubCatalog {
        fn new(store: Store, products: Vec<CanonicalProduct>) -> Self {
            Self {
                store,
                products,
                only_query: None,
            }
        }
    }

    #[async_trait]
    impl StoreCatalog for StubCatalog {
        fn store(&self) -> Store {
            self.store
        }

        async fn search(
            &self,
            query: &str,
            _page: u32,
            _page_size: u32,
        ) -> Result<Vec<CanonicalProduct>, CatalogError> {
            match &self.only_query {
                Some(only) if only != query => Ok(Vec::new()),
                _ => Ok(self.products.clone()),
            }
        }

        async fn lookup_by_code(&self, code: &str) -> Result<CanonicalProduct, CatalogError> {
            self.products
                .iter()
                .find(|p| p.barcode.as_deref() == Some(code))
                .cloned()
                .ok_or(CatalogError::UpstreamEmpty { store: self.store })
        }
    }

    fn aggregator(catalogs: Vec<Arc<dyn StoreCatalog>>) -> CrossStoreAggregator {
        CrossStoreAggregator::new(catalogs, SimilarityConfig::default())
    }

    #[tokio::test]
    async fn derives_best_price_and_savings() {
        let agg = aggregator(vec![
            Arc::new(StubCatalog::new(
                Store::Walmart,
                vec![product(Store::Walmart, "w1", "Cafe Quetzal 275g", 1000.0)],
            )),
            Arc::new(StubCatalog::new(
                Store::MaxiPali,
                vec![product(Store::MaxiPali, "m1", "Cafe Quetzal 275g", 900.0)],
            )),
            Arc::new(StubCatalog::new(
                Store::MasXMenos,
                vec![product(Store::MasXMenos, "x1", "Cafe Quetzal 275g", 950.0)],
            )),
            Arc::new(StubCatalog::new(Store::Automercado, vec![])),
        ]);

        let result = agg.compare("Cafe Quetzal 275g", None, None).await.unwrap();
        let best = result.best_price.unwrap();
        assert_eq!(best.store, Store::MaxiPali);
        assert_eq!(best.price, 900.0);
        assert_eq!(best.savings, 50.0);
        assert_eq!(best.savings_percentage, 6);
    }

    #[tokio::test]
    async fn single_priced_store_has_zero_savings() {
        let agg = aggregator(vec![
            Arc::new(StubCatalog::new(
                Store::Walmart,
                vec![product(Store::Walmart, "w1", "Cafe Quetzal 275g", 1200.0)],
            )),
            Arc::new(StubCatalog::new(Store::MaxiPali, vec![])),
            Arc::new(StubCatalog::new(Store::MasXMenos, vec![])),
            Arc::new(StubCatalog::new(Store::Automercado, vec![])),
        ]);

        let best = agg
            .compare("Cafe Quetzal 275g", None, None)
            .await
            .unwrap()
            .best_price
            .unwrap();
        assert_eq!(best.store, Store::Walmart);
        assert_eq!(best.savings, 0.0);
        assert_eq!(best.savings_percentage, 0);
    }

    #[tokio::test]
    async fn empty_stores_yield_no_best_price() {
        let agg = aggregator(
            Store::ALL
                .iter()
                .map(|&s| Arc::new(StubCatalog::new(s, vec![])) as Arc<dyn StoreCatalog>)
                .collect(),
        );

        let result = agg.compare("Cafe Quetzal 275g", None, None).await.unwrap();
        assert!(result.best_price.is_none());
        assert_eq!(result.products_by_store.len(), 4);
        assert!(result.products_by_store.iter().all(|s| s.products.is_empty()));
    }

    #[tokio::test]
    async fn empty_query_is_rejected() {
        let agg = aggregator(vec![]);
        let err = agg.compare("   ", None, None).await.unwrap_err();
        assert!(matches!(err, CatalogError::Validation(_)));
    }

    #[tokio::test]
    async fn zero_priced_listings_never_reach_the_result() {
        let agg = aggregator(vec![
            Arc::new(StubCatalog::new(
                Store::Walmart,
                vec![product(Store::Walmart, "w1", "Cafe Quetzal 275g", 0.0)],
            )),
            Arc::new(StubCatalog::new(Store::MaxiPali, vec![])),
            Arc::new(StubCatalog::new(Store::MasXMenos, vec![])),
            Arc::new(StubCatalog::new(Store::Automercado, vec![])),
        ]);

        let result = agg.compare("Cafe Quetzal 275g", None, None).await.unwrap();
        assert!(result.products_for(Store::Walmart).is_empty());
        assert!(result.best_price.is_none());
    }

    #[tokio::test]
    async fn reformulations_recover_an_empty_store() {
        let mut stub = StubCatalog::new(
            Store::Walmart,
            vec![product(Store::Walmart, "w1", "Cafe Quetzal 275g", 2500.0)],
        );
        // Only the category+measurement reformulation hits.
        stub.only_query = Some("cafe 275g".to_string());

        let agg = aggregator(vec![
            Arc::new(stub),
            Arc::new(StubCatalog::new(Store::MaxiPali, vec![])),
            Arc::new(StubCatalog::new(Store::MasXMenos, vec![])),
            Arc::new(StubCatalog::new(Store::Automercado, vec![])),
        ]);

        let result = agg
            .compare("Café Quetzal Tueste Oscuro Molido 275g", None, None)
            .await
            .unwrap();
        assert_eq!(result.products_for(Store::Walmart).len(), 1);
    }

    #[tokio::test]
    async fn barcode_hits_short_circuit_the_name_search() {
        let mut with_code = product(Store::MaxiPali, "m1", "Cafe Quetzal 275g", 880.0);
        with_code.barcode = Some("7441001600401".into());

        let agg = aggregator(vec![
            Arc::new(StubCatalog::new(Store::Walmart, vec![])),
            Arc::new(StubCatalog::new(Store::MaxiPali, vec![with_code])),
            Arc::new(StubCatalog::new(Store::MasXMenos, vec![])),
            Arc::new(StubCatalog::new(Store::Automercado, vec![])),
        ]);

        let result = agg
            .compare("Cafe Quetzal 275g", Some("7441001600401"), None)
            .await
            .unwrap();
        assert_eq!(result.products_for(Store::MaxiPali).len(), 1);
        assert_eq!(result.best_price.unwrap().store, Store::MaxiPali);
    }

    #[tokio::test]
    async fn similarity_narrowing_excludes_lookalike_listings() {
        let reference = product(Store::Walmart, "w1", "Coffee Quetzal 275g", 2500.0);
        let real_match = product(Store::MaxiPali, "m1", "Quetzal Coffee 275g", 2300.0);
        let mut mug = product(Store::MaxiPali, "m2", "Quetzal taza de cafe ceramica", 500.0);
        mug.brand = String::new();

        let agg = aggregator(vec![
            Arc::new(StubCatalog::new(Store::Walmart, vec![reference])),
            Arc::new(StubCatalog::new(Store::MaxiPali, vec![mug, real_match])),
            Arc::new(StubCatalog::new(Store::MasXMenos, vec![])),
            Arc::new(StubCatalog::new(Store::Automercado, vec![])),
        ]);

        let result = agg
            .compare("Coffee Quetzal 275g", None, Some(Store::Walmart))
            .await
            .unwrap();

        // The cheap ceramic mug passes the relevance filter ("quetzal") but
        // is not the same product; the comparison must not crown it.
        assert_eq!(result.products_for(Store::MaxiPali).len(), 1);
        let best = result.best_price.unwrap();
        assert_eq!(best.store, Store::MaxiPali);
        assert_eq!(best.price, 2300.0);
    }

    #[test]
    fn fallback_queries_are_ordered_and_deduplicated() {
        let queries =
            CrossStoreAggregator::fallback_queries("Café Quetzal Tueste Oscuro Molido 275g");
        assert_eq!(
            queries,
            vec![
                "cafe quetzal tueste".to_string(),
                "quetzal tueste oscuro molido 275g".to_string(),
                "cafe 275g".to_string(),
            ]
        );

        // A short name collapses to fewer, non-identical reformulations.
        let short = CrossStoreAggregator::fallback_queries("Leche 1L");
        assert!(!short.iter().any(|q| q == "leche 1l"));
    }
}
