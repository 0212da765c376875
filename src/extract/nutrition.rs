//! Nutrition value normalization

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Per-serving nutrition facts
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NutritionInfo {
    pub calories: Option<f64>,
    pub protein_g: Option<f64>,
    pub carbs_g: Option<f64>,
    pub fat_g: Option<f64>,
    pub saturated_fat_g: Option<f64>,
    pub fiber_g: Option<f64>,
    pub sugar_g: Option<f64>,
    pub salt_g: Option<f64>,
    pub sodium_mg: Option<f64>,
}

impl NutritionInfo {
    /// Builds nutrition facts from raw nutrient fields
    ///
    /// Keys are matched case-insensitively against both schema.org names
    /// (`proteinContent`) and short names (`protein`). Aliases are tried in
    /// the listed order and the first one that parses wins. Returns None when
    /// no field yields a number.
    pub fn from_raw(raw: &HashMap<String, Value>) -> Option<Self> {
        let lookup = |keys: &[&str]| -> Option<f64> {
            keys.iter().find_map(|key| {
                raw.iter()
                    .filter(|(k, _)| k.eq_ignore_ascii_case(key))
                    .find_map(|(_, v)| normalize_nutrient(v))
            })
        };

        let info = Self {
            calories: lookup(&["calories", "kcal", "energy"]),
            protein_g: lookup(&["proteinContent", "protein"]),
            carbs_g: lookup(&["carbohydrateContent", "carbohydrates", "carbs"]),
            fat_g: lookup(&["fatContent", "fat"]),
            saturated_fat_g: lookup(&["saturatedFatContent", "saturatedFat", "saturates"]),
            fiber_g: lookup(&["fiberContent", "fibreContent", "fiber", "fibre"]),
            sugar_g: lookup(&["sugarContent", "sugar", "sugars"]),
            salt_g: lookup(&["saltContent", "salt"]),
            sodium_mg: lookup(&["sodiumContent", "sodium"]),
        };

        (!info.is_empty()).then_some(info)
    }

    /// True if every field is absent
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Gram-denominated fields with their names, for range checks
    pub fn gram_values(&self) -> [(&'static str, Option<f64>); 7] {
        [
            ("protein_g", self.protein_g),
            ("carbs_g", self.carbs_g),
            ("fat_g", self.fat_g),
            ("saturated_fat_g", self.saturated_fat_g),
            ("fiber_g", self.fiber_g),
            ("sugar_g", self.sugar_g),
            ("salt_g", self.salt_g),
        ]
    }
}

/// Normalizes a nutrient value that may be numeric or a string with a unit
///
/// Unparsable input yields None.
///
/// ```
/// use serde_json::json;
/// use recipe_harvest::extract::normalize_nutrient;
///
/// assert_eq!(normalize_nutrient(&json!("45g")), Some(45.0));
/// assert_eq!(normalize_nutrient(&json!(12.5)), Some(12.5));
/// assert_eq!(normalize_nutrient(&json!("n/a")), None);
/// ```
pub fn normalize_nutrient(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_nutrient_str(s),
        _ => None,
    }
}

/// Strips everything but digits, decimal point and a leading minus, then parses
pub fn parse_nutrient_str(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    let negative = trimmed.starts_with('-');

    let digits: String = trimmed
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();

    if digits.is_empty() {
        return None;
    }

    let value: f64 = digits.parse().ok()?;
    value.is_finite().then_some(if negative { -value } else { value })
}
