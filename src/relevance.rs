//! Post-normalization relevance filter. Runs on every result set before it
//! leaves the core: drops unusable prices unconditionally and drops listings
//! with no textual overlap with the query.

use crate::models::{CanonicalProduct, SearchQuery};

/// Query keywords: lowercased tokens longer than two characters.
pub fn query_keywords(query: &str) -> Vec<String> {
    query
        .to_lowercase()
        .split_whitespace()
        .filter(|t| t.chars().count() > 2)
        .map(|t| t.to_string())
        .collect()
}

/// Keyword test: `name + brand + category`, lowercased, must contain at
/// least one keyword as a substring. An empty keyword list passes everything
/// (a query of only stopwords should not blank the results).
pub fn is_relevant(product: &CanonicalProduct, keywords: &[String]) -> bool {
    if keywords.is_empty() {
        return true;
    }
    let haystack = format!("{} {} {}", product.name, product.brand, product.category)
        .to_lowercase();
    keywords.iter().any(|k| haystack.contains(k.as_str()))
}

/// Apply the full filter to one store's normalized results.
///
/// The price gate (`price > 0`) always applies. The keyword test is skipped
/// for products whose store matches the query's `original_store` hint: a
/// product is never refiltered against its own source.
pub fn filter_products(
    products: Vec<CanonicalProduct>,
    query: &SearchQuery,
) -> Vec<CanonicalProduct> {
    let keywords = query_keywords(&query.text);
    products
        .into_iter()
        .filter(|p| p.has_usable_price())
        .filter(|p| {
            query.original_store == Some(p.store) || is_relevant(p, &keywords)
        })
        .collect()
}
