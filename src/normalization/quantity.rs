use std::sync::OnceLock;

use regex::Regex;

/// Net-content units we can read out of a product name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    Grams,
    Kilograms,
    Milliliters,
    Liters,
    Ounces,
    Pounds,
}

impl Unit {
    fn parse(raw: &str) -> Option<Unit> {
        match raw {
            "g" | "gr" | "grs" | "gramos" => Some(Unit::Grams),
            "kg" | "kgs" | "kilo" | "kilos" => Some(Unit::Kilograms),
            "ml" | "mililitros" => Some(Unit::Milliliters),
            "l" | "lt" | "lts" | "litro" | "litros" => Some(Unit::Liters),
            "oz" | "onza" | "onzas" => Some(Unit::Ounces),
            "lb" | "lbs" | "libra" | "libras" => Some(Unit::Pounds),
            _ => None,
        }
    }
}

/// A quantity+unit token detected inside a product name, e.g. "275g",
/// "1 kg", "500ml".
#[derive(Debug, Clone, PartialEq)]
pub struct Quantity {
    pub amount: f64,
    pub unit: Unit,
    /// The matched text as it appeared in the name, with whitespace removed
    /// ("275g"). Used to rebuild fallback queries.
    pub raw: String,
}

impl Quantity {
    /// Normalize to grams so quantities in different units compare.
    /// Milliliters are treated 1:1 with grams (grocery liquids are close to
    /// water density, and this is a heuristic signal, not a scale).
    pub fn grams(&self) -> f64 {
        match self.unit {
            Unit::Grams => self.amount,
            Unit::Kilograms => self.amount * 1000.0,
            Unit::Milliliters => self.amount,
            Unit::Liters => self.amount * 1000.0,
            Unit::Ounces => self.amount * 28.35,
            Unit::Pounds => self.amount * 453.59,
        }
    }
}

fn quantity_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)(\d+(?:[.,]\d+)?)\s*(kgs?|kilos?|grs?|gramos|g|ml|mililitros|lts?|litros?|l|oz|onzas?|lbs?|libras?)\b",
        )
        .expect("quantity regex is valid")
    })
}

/// First quantity+unit token found in a product name, if any.
pub fn detect(name: &str) -> Option<Quantity> {
    let caps = quantity_re().captures(name)?;
    let amount: f64 = caps[1].replace(',', ".").parse().ok()?;
    let unit = Unit::parse(&caps[2].to_lowercase())?;
    if amount <= 0.0 {
        return None;
    }
    Some(Quantity {
        amount,
        unit,
        raw: format!("{}{}", &caps[1], caps[2].to_lowercase()),
    })
}

/// Whether two gram-normalized quantities are within `tolerance` (a ratio,
/// e.g. 0.05 for 5%) of each other.
pub fn within_tolerance(a: f64, b: f64, tolerance: f64) -> bool {
    if a <= 0.0 || b <= 0.0 {
        return false;
    }
    let max = a.max(b);
    ((a - b).abs() / max) <= tolerance
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_compact_gram_token() {
        let q = detect("Café Quetzal 275g molido").unwrap();
        assert_eq!(q.unit, Unit::Grams);
        assert_eq!(q.amount, 275.0);
        assert_eq!(q.raw, "275g");
    }

    #[test]
    fn detects_spaced_kilo_and_liter_tokens() {
        let kg = detect("Arroz Tío Pelón 1 kg").unwrap();
        assert_eq!(kg.grams(), 1000.0);

        let ml = detect("Detergente Ariel 900ml").unwrap();
        assert_eq!(ml.unit, Unit::Milliliters);
        assert_eq!(ml.grams(), 900.0);

        let l = detect("Leche Entera Dos Pinos 1L").unwrap();
        assert_eq!(l.unit, Unit::Liters);
        assert_eq!(l.grams(), 1000.0);
    }

    #[test]
    fn decimal_comma_is_accepted() {
        let q = detect("Aceite 1,5 L").unwrap();
        assert_eq!(q.grams(), 1500.0);
    }

    #[test]
    fn names_without_quantities_yield_none() {
        assert_eq!(detect("Pan cuadrado Bimbo"), None);
    }

    #[test]
    fn tolerance_compares_across_units() {
        let a = detect("Cafe 1kg").unwrap();
        let b = detect("Cafe 1000g").unwrap();
        assert!(within_tolerance(a.grams(), b.grams(), 0.05));

        let c = detect("Cafe 250g").unwrap();
        let d = detect("Cafe 275g").unwrap();
        // 25g apart on 275g is ~9%, outside the 5% window
        assert!(!within_tolerance(c.grams(), d.grams(), 0.05));
    }
}
