//! Canonical domain model shared by every retailer client.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Default currency for all four storefronts (Costa Rican colón).
pub const DEFAULT_CURRENCY: &str = "CRC";

/// The fixed set of supported retailers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Store {
    Walmart,
    #[serde(rename = "maxipali")]
    MaxiPali,
    #[serde(rename = "masxmenos")]
    MasXMenos,
    Automercado,
}

impl Store {
    /// Canonical iteration order; comparison results always report stores in
    /// this order.
    pub const ALL: [Store; 4] = [
        Store::Walmart,
        Store::MaxiPali,
        Store::MasXMenos,
        Store::Automercado,
    ];

    pub fn slug(&self) -> &'static str {
        match self {
            Store::Walmart => "walmart",
            Store::MaxiPali => "maxipali",
            Store::MasXMenos => "masxmenos",
            Store::Automercado => "automercado",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Store::Walmart => "Walmart",
            Store::MaxiPali => "MaxiPalí",
            Store::MasXMenos => "MasXMenos",
            Store::Automercado => "Automercado",
        }
    }
}

impl fmt::Display for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for Store {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "walmart" => Ok(Store::Walmart),
            "maxipali" | "maxi-pali" | "maxi_pali" => Ok(Store::MaxiPali),
            "masxmenos" | "mas-x-menos" | "mas_x_menos" => Ok(Store::MasXMenos),
            "automercado" | "auto-mercado" | "auto_mercado" => Ok(Store::Automercado),
            other => Err(format!("unknown store: {other}")),
        }
    }
}

/// One product listing after schema translation, common to all retailers.
///
/// Invariant: `price >= 0`. Listings with `price == 0` are discarded by the
/// relevance filter before any result leaves the core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalProduct {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub brand: String,
    pub price: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub list_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub store: Store,
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub barcode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub currency: String,
    pub in_stock: bool,
    pub is_on_sale: bool,
}

impl CanonicalProduct {
    /// Sale flag per the shared normalization rule: both prices known and the
    /// list price strictly above the active price.
    pub fn compute_sale_flag(price: f64, list_price: Option<f64>) -> bool {
        match list_price {
            Some(lp) => lp > 0.0 && price > 0.0 && lp > price,
            None => false,
        }
    }

    pub fn has_usable_price(&self) -> bool {
        self.price > 0.0
    }
}

/// Caller search input. `page` is 1-based.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchQuery {
    pub text: String,
    pub page: u32,
    pub page_size: u32,
    /// When set, products originating from this store skip the keyword
    /// relevance test (a product is never refiltered against its own source).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_store: Option<Store>,
}

impl SearchQuery {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            page: 1,
            page_size: 20,
            original_store: None,
        }
    }
}

/// A page of ranked search results for the inbound `search` operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchPage {
    pub products: Vec<CanonicalProduct>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
    pub has_more: bool,
}

/// A cross-store product pair with its heuristic similarity verdict.
#[derive(Debug, Clone, Serialize)]
pub struct MatchCandidate {
    pub product_a: CanonicalProduct,
    pub product_b: CanonicalProduct,
    /// Heuristic confidence in [0, 100].
    pub score: u8,
    /// `score >= threshold` for the active similarity configuration.
    pub matched: bool,
}

/// The winning store of one comparison, with savings against the
/// next-cheapest known price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BestPriceResult {
    pub store: Store,
    pub price: f64,
    pub savings: f64,
    pub savings_percentage: u32,
}

/// Per-store slice of a comparison result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreResults {
    pub store: Store,
    pub products: Vec<CanonicalProduct>,
}

/// Outcome of one cross-store comparison: the (possibly empty) product list
/// for each of the four stores plus the derived best price, if any store
/// produced a usable one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub products_by_store: Vec<StoreResults>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_price: Option<BestPriceResult>,
}

impl ComparisonResult {
    pub fn products_for(&self, store: Store) -> &[CanonicalProduct] {
        self.products_by_store
            .iter()
            .find(|s| s.store == store)
            .map(|s| s.products.as_slice())
            .unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_round_trips_through_str() {
        for store in Store::ALL {
            assert_eq!(store.slug().parse::<Store>().unwrap(), store);
        }
        assert!("sorpresa".parse::<Store>().is_err());
    }

    #[test]
    fn sale_flag_requires_list_price_above_active() {
        assert!(CanonicalProduct::compute_sale_flag(900.0, Some(1200.0)));
        assert!(!CanonicalProduct::compute_sale_flag(1200.0, Some(1200.0)));
        assert!(!CanonicalProduct::compute_sale_flag(0.0, Some(1200.0)));
        assert!(!CanonicalProduct::compute_sale_flag(900.0, None));
    }
}
