//! Canonical unit table

/// Raw unit spellings and the canonical token each maps to
const UNIT_ALIASES: &[(&str, &str)] = &[
    // Weight - metric
    ("g", "g"),
    ("gr", "g"),
    ("gram", "g"),
    ("grams", "g"),
    ("gramme", "g"),
    ("grammes", "g"),
    ("kg", "kg"),
    ("kgs", "kg"),
    ("kilo", "kg"),
    ("kilos", "kg"),
    ("kilogram", "kg"),
    ("kilograms", "kg"),
    ("mg", "mg"),
    ("milligram", "mg"),
    ("milligrams", "mg"),
    // Weight - imperial
    ("oz", "oz"),
    ("ounce", "oz"),
    ("ounces", "oz"),
    ("lb", "lb"),
    ("lbs", "lb"),
    ("pound", "lb"),
    ("pounds", "lb"),
    // Volume - metric
    ("ml", "ml"),
    ("millilitre", "ml"),
    ("millilitres", "ml"),
    ("milliliter", "ml"),
    ("milliliters", "ml"),
    ("cl", "cl"),
    ("l", "l"),
    ("litre", "l"),
    ("litres", "l"),
    ("liter", "l"),
    ("liters", "l"),
    // Volume - spoons and cups
    ("tsp", "tsp"),
    ("tsps", "tsp"),
    ("teaspoon", "tsp"),
    ("teaspoons", "tsp"),
    ("tbsp", "tbsp"),
    ("tbsps", "tbsp"),
    ("tablespoon", "tbsp"),
    ("tablespoons", "tbsp"),
    ("cup", "cup"),
    ("cups", "cup"),
    // Counts
    ("pc", "piece"),
    ("pcs", "piece"),
    ("piece", "piece"),
    ("pieces", "piece"),
    ("clove", "clove"),
    ("cloves", "clove"),
    ("pinch", "pinch"),
    ("pinches", "pinch"),
];

/// Maps a raw unit token to its canonical form
///
/// Matching ignores case and a trailing period. Unknown tokens are returned
/// lowercased rather than dropped, so no information is lost.
///
/// ```
/// use recipe_harvest::extract::canonical_unit;
///
/// assert_eq!(canonical_unit("Grams"), "g");
/// assert_eq!(canonical_unit("tbsp."), "tbsp");
/// assert_eq!(canonical_unit("Handful"), "handful");
/// ```
pub fn canonical_unit(raw: &str) -> String {
    let token = raw.trim().trim_end_matches('.').to_lowercase();
    UNIT_ALIASES
        .iter()
        .find(|(alias, _)| *alias == token)
        .map(|(_, canonical)| canonical.to_string())
        .unwrap_or(token)
}
