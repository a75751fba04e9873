use super::text;

/// Small fixed dictionary mapping pantry-staple keywords to a canonical
/// category key. Keys are stable identifiers used by the similarity scorer;
/// keyword lists cover the Spanish and English spellings seen across the
/// four storefronts.
const CATEGORY_KEYWORDS: &[(&str, &[&str])] = &[
    ("coffee", &["cafe", "coffee", "espresso"]),
    ("rice", &["arroz", "rice"]),
    ("beans", &["frijol", "frijoles", "beans"]),
    ("milk", &["leche", "milk"]),
    ("sugar", &["azucar", "sugar"]),
    ("oil", &["aceite", "oil"]),
    ("bread", &["pan", "bread", "tortilla", "tortillas"]),
    ("pasta", &["pasta", "espagueti", "spaghetti", "macarrones"]),
    ("cereal", &["cereal", "avena", "granola"]),
    ("cheese", &["queso", "cheese"]),
    ("butter", &["mantequilla", "margarina", "butter"]),
    ("eggs", &["huevo", "huevos", "eggs"]),
    ("water", &["agua", "water"]),
    ("detergent", &["detergente", "detergent", "jabon"]),
];

/// A detected category: the canonical key plus the name token that
/// triggered the detection (kept for fallback query building).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectedCategory {
    pub key: &'static str,
    pub token: String,
}

/// Scan a product name for a category keyword. Tokens must equal a keyword
/// exactly, or start with a keyword of four letters or more ("frijoles"
/// matches "frijol" without "pantalón" matching "pan").
pub fn detect(name: &str) -> Option<DetectedCategory> {
    let tokens = text::tokenize(name);
    for token in &tokens {
        for (key, keywords) in CATEGORY_KEYWORDS {
            for keyword in *keywords {
                let hit = token == keyword
                    || (keyword.len() >= 4 && token.starts_with(keyword));
                if hit {
                    return Some(DetectedCategory {
                        key,
                        token: token.clone(),
                    });
                }
            }
        }
    }
    None
}
