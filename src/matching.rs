//! Cross-catalog similarity scorer: a 0–100 heuristic confidence that two
//! listings from different retailers denote the same physical product.

use serde::{Deserialize, Serialize};

use crate::models::{CanonicalProduct, MatchCandidate};
use crate::normalization::{category, quantity, text};
use crate::util::env::{env_parse, env_parse_opt};

/// Empirically tuned scoring weights. These are preserved as configuration,
/// not derived; the defaults are the production values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarityConfig {
    /// Weight of the token-overlap name similarity, in score points.
    pub name_weight: f64,
    /// Bonus when normalized brand strings are exactly equal.
    pub brand_bonus: f64,
    /// Bonus when both names carry a quantity token within tolerance.
    pub quantity_bonus: f64,
    /// Relative tolerance for gram-normalized quantities (0.05 = 5%).
    pub quantity_tolerance: f64,
    /// Bonus when both names map to the same category dictionary entry.
    pub category_bonus: f64,
    /// Blend weight for description overlap; the other terms are scaled to
    /// `1 - description_weight` when both sides carry a description.
    pub description_weight: f64,
    /// Domain-tuned multiplier applied when both products classify as
    /// coffee, before capping.
    pub coffee_multiplier: f64,
    /// A pair at or above this score is considered the same product.
    pub match_threshold: u8,
}

impl Default for SimilarityConfig {
    fn default() -> Self {
        Self {
            name_weight: 60.0,
            brand_bonus: 20.0,
            quantity_bonus: 15.0,
            quantity_tolerance: 0.05,
            category_bonus: 10.0,
            description_weight: 0.10,
            coffee_multiplier: 1.2,
            match_threshold: 45,
        }
    }
}

impl SimilarityConfig {
    /// Production defaults with env overrides (SIMILARITY_* keys).
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            name_weight: env_parse("SIMILARITY_NAME_WEIGHT", d.name_weight),
            brand_bonus: env_parse("SIMILARITY_BRAND_BONUS", d.brand_bonus),
            quantity_bonus: env_parse("SIMILARITY_QUANTITY_BONUS", d.quantity_bonus),
            quantity_tolerance: env_parse("SIMILARITY_QUANTITY_TOLERANCE", d.quantity_tolerance),
            category_bonus: env_parse("SIMILARITY_CATEGORY_BONUS", d.category_bonus),
            description_weight: env_parse("SIMILARITY_DESCRIPTION_WEIGHT", d.description_weight),
            coffee_multiplier: env_parse("SIMILARITY_COFFEE_MULTIPLIER", d.coffee_multiplier),
            match_threshold: env_parse_opt("SIMILARITY_MATCH_THRESHOLD")
                .unwrap_or(d.match_threshold),
        }
    }
}

/// Score two products. Returns an integer in [0, 100].
///
/// The same listing scored against itself (same store and id) is always 100.
pub fn score(a: &CanonicalProduct, b: &CanonicalProduct, cfg: &SimilarityConfig) -> u8 {
    if a.store == b.store && a.id == b.id {
        return 100;
    }

    let tokens_a = text::tokenize(&a.name);
    let tokens_b = text::tokenize(&b.name);
    let name_sim = text::token_overlap(&tokens_a, &tokens_b);

    let mut combined = name_sim * cfg.name_weight;

    let brand_a = text::normalize(&a.brand);
    if !brand_a.is_empty() && brand_a == text::normalize(&b.brand) {
        combined += cfg.brand_bonus;
    }

    if let (Some(qa), Some(qb)) = (quantity::detect(&a.name), quantity::detect(&b.name)) {
        if quantity::within_tolerance(qa.grams(), qb.grams(), cfg.quantity_tolerance) {
            combined += cfg.quantity_bonus;
        }
    }

    let cat_a = category::detect(&a.name);
    let cat_b = category::detect(&b.name);
    let same_category = match (&cat_a, &cat_b) {
        (Some(ca), Some(cb)) => ca.key == cb.key,
        _ => false,
    };
    if same_category {
        combined += cfg.category_bonus;
    }

    // Description overlap blends in at its own weight, scaling everything
    // else down to the remaining share.
    if let (Some(da), Some(db)) = (non_empty(&a.description), non_empty(&b.description)) {
        let desc_sim = text::token_overlap(&text::tokenize(da), &text::tokenize(db));
        combined = combined * (1.0 - cfg.description_weight)
            + desc_sim * cfg.description_weight * 100.0;
    }

    if same_category && cat_a.as_ref().map(|c| c.key) == Some("coffee") {
        combined *= cfg.coffee_multiplier;
    }

    combined.round().clamp(0.0, 100.0) as u8
}

/// Score a pair and wrap it as a `MatchCandidate` with the matched verdict.
pub fn evaluate(
    a: &CanonicalProduct,
    b: &CanonicalProduct,
    cfg: &SimilarityConfig,
) -> MatchCandidate {
    let score = score(a, b, cfg);
    MatchCandidate {
        product_a: a.clone(),
        product_b: b.clone(),
        score,
        matched: score >= cfg.match_threshold,
    }
}

fn non_empty(opt: &Option<String>) -> Option<&String> {
    opt.as_ref().filter(|s| !s.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Store;

    fn product(store: Store, id: &str, name: &str, brand: &str) -> CanonicalProduct {
        CanonicalProduct {
            id: id.into(),
            name: name.into(),
            brand: brand.into(),
            price: 2500.0,
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

    #[test]
    fn a_product_matches_itself_exactly() {
        let cfg = SimilarityConfig::default();
        let p = product(Store::Walmart, "1", "Galletas saladas", "");
        assert_eq!(score(&p, &p, &cfg), 100);
    }

    #[test]
    fn reordered_coffee_names_cross_the_match_threshold() {
        let cfg = SimilarityConfig::default();
        let a = product(Store::Walmart, "1", "Coffee Quetzal 275g", "Quetzal");
        let b = product(Store::MaxiPali, "2", "Quetzal Coffee 275g", "Quetzal");

        let candidate = evaluate(&a, &b, &cfg);
        assert!(candidate.score >= cfg.match_threshold);
        assert!(candidate.matched);
        // name 60 + brand 20 + quantity 15 + category 10, coffee-boosted, capped
        assert_eq!(candidate.score, 100);
    }

    #[test]
    fn scoring_is_symmetric_for_representative_pairs() {
        let cfg = SimilarityConfig::default();
        let pairs = [
            (
                product(Store::Walmart, "1", "Coffee Quetzal 275g", "Quetzal"),
                product(Store::MaxiPali, "2", "Quetzal Coffee 275g", "Quetzal"),
            ),
            (
                product(Store::Walmart, "3", "Leche Entera Dos Pinos 1L", "Dos Pinos"),
                product(Store::Automercado, "4", "Leche Dos Pinos Entera 1 L", "Dos Pinos"),
            ),
            (
                product(Store::MasXMenos, "5", "Arroz Tío Pelón 1kg", "Tío Pelón"),
                product(Store::MaxiPali, "6", "Detergente Ariel 900ml", "Ariel"),
            ),
        ];
        for (a, b) in &pairs {
            assert_eq!(score(a, b, &cfg), score(b, a, &cfg));
        }
    }

    #[test]
    fn unrelated_products_stay_below_threshold() {
        let cfg = SimilarityConfig::default();
        let a = product(Store::Walmart, "1", "Arroz Tío Pelón 1kg", "Tío Pelón");
        let b = product(Store::MaxiPali, "2", "Detergente Ariel 900ml", "Ariel");
        let candidate = evaluate(&a, &b, &cfg);
        assert!(!candidate.matched);
    }

    #[test]
    fn quantity_mismatch_withholds_the_bonus() {
        let cfg = SimilarityConfig::default();
        let a = product(Store::Walmart, "1", "Cafe Quetzal 250g", "Quetzal");
        let b = product(Store::MaxiPali, "2", "Cafe Quetzal 275g", "Quetzal");
        let c = product(Store::MaxiPali, "3", "Cafe Quetzal 275g", "Quetzal");
        let d = product(Store::Walmart, "4", "Cafe Quetzal 280g", "Quetzal");
        // 250 vs 275 is outside 5%; 275 vs 280 is inside
        assert!(score(&a, &b, &cfg) < score(&d, &c, &cfg));
    }

    #[test]
    fn description_overlap_blends_into_the_score() {
        let cfg = SimilarityConfig::default();
        let mut a = product(Store::Walmart, "1", "Galletas saladas", "Pozuelo");
        let mut b = product(Store::MaxiPali, "2", "Galletas sodas", "Pozuelo");
        let without = score(&a, &b, &cfg);

        a.description = Some("Galletas saladas de soda en paquete familiar".into());
        b.description = Some("Galletas saladas de soda en paquete familiar".into());
        let with = score(&a, &b, &cfg);
        assert!(with > without);
    }
}
