/// Minimum token length considered significant. Shorter tokens (articles,
/// prepositions, unit letters) carry no signal for matching.
pub const MIN_TOKEN_LEN: usize = 3;

/// Replace Spanish-range accented characters with their ASCII base letter.
/// Input is expected to be lowercased already.
pub fn strip_accents(input: &str) -> String {
    input
        .chars()
        .map(|c| match c {
            'á' | 'à' | 'ä' | 'â' | 'ã' => 'a',
            'é' | 'è' | 'ë' | 'ê' => 'e',
            'í' | 'ì' | 'ï' | 'î' => 'i',
            'ó' | 'ò' | 'ö' | 'ô' | 'õ' => 'o',
            'ú' | 'ù' | 'ü' | 'û' => 'u',
            'ñ' => 'n',
            'ç' => 'c',
            other => other,
        })
        .collect()
}

/// Canonical comparison form: lowercase, accents stripped, punctuation
/// collapsed to spaces.
pub fn normalize(input: &str) -> String {
    strip_accents(&input.to_lowercase())
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Significant tokens of a normalized string, first-seen order, deduplicated.
pub fn tokenize(input: &str) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    normalize(input)
        .split_whitespace()
        .filter(|t| t.chars().count() >= MIN_TOKEN_LEN)
        .filter(|t| seen.insert(t.to_string()))
        .map(|t| t.to_string())
        .collect()
}

/// Jaccard-like token overlap: per token of `a`, an exact match in `b`
/// counts 1.0 and a substring containment (either direction) counts 0.5;
/// the sum is divided by the size of the token union. Returns a value in
/// [0, 1].
pub fn token_overlap(a: &[String], b: &[String]) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let union: std::collections::HashSet<&str> =
        a.iter().chain(b.iter()).map(|t| t.as_str()).collect();

    let mut matches = 0.0;
    for ta in a {
        if b.iter().any(|tb| tb == ta) {
            matches += 1.0;
        } else if b
            .iter()
            .any(|tb| tb.contains(ta.as_str()) || ta.contains(tb.as_str()))
        {
            matches += 0.5;
        }
    }

    matches / union.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_accents_and_punctuation() {
        assert_eq!(normalize("Café Británt® 275g."), "cafe britant 275g");
        assert_eq!(normalize("AZÚCAR  Doña María"), "azucar dona maria");
    }

    #[test]
    fn tokenize_drops_short_and_duplicate_tokens() {
        let tokens = tokenize("Leche de Vaca 1L leche");
        assert_eq!(tokens, vec!["leche", "vaca"]);
    }

    #[test]
    fn identical_names_overlap_fully() {
        let a = tokenize("Cafe Quetzal 275g");
        assert!((token_overlap(&a, &a) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn reordered_names_overlap_fully() {
        let a = tokenize("Coffee Quetzal 275g");
        let b = tokenize("Quetzal Coffee 275g");
        assert!((token_overlap(&a, &b) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn substring_containment_counts_half() {
        let a = tokenize("frijol");
        let b = tokenize("frijoles");
        // one token each, union of 2, containment scores 0.5
        assert!((token_overlap(&a, &b) - 0.25).abs() < f64::EPSILON);
    }

    #[test]
    fn disjoint_names_do_not_overlap() {
        let a = tokenize("arroz tio pelon");
        let b = tokenize("detergente ariel");
        assert_eq!(token_overlap(&a, &b), 0.0);
    }
}
