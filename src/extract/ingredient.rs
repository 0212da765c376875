//! Ingredient line parsing
//!
//! A line such as `"Garlic, crushed (10g) x2"` is parsed by running an ordered
//! list of rules over a mutable draft. Each rule consumes the part of the text
//! it understands and leaves the rest for the next one:
//!
//! 1. `multiplier`: strip a trailing ` x<N>` from the whole line
//! 2. `parenthetical`: strip trailing `(...)` groups; the first one shaped like
//!    `<number><unit>` becomes the quantity, any other becomes a note
//! 3. `preparation`: text after the first comma becomes the preparation note,
//!    falling back to a parenthetical note
//! 4. `apply_multiplier`: scale the quantity by N, or mark the ingredient
//!    optional when N is exactly 0
//! 5. `unit`: map the unit token through the canonical unit table
//!
//! Because the multiplier is peeled off first, a quantity and a comma note in
//! the same line are always both found.

use crate::extract::units::canonical_unit;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Structured form of one ingredient line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedIngredient {
    pub name: String,
    pub quantity: Option<f64>,
    pub unit: Option<String>,
    pub preparation: Option<String>,
    pub is_optional: bool,
    pub original: String,
}

/// Intermediate state the rules operate on
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct IngredientDraft {
    pub rest: String,
    pub quantity: Option<f64>,
    pub raw_unit: Option<String>,
    pub multiplier: Option<f64>,
    pub paren_note: Option<String>,
    pub preparation: Option<String>,
    pub is_optional: bool,
}

type Rule = fn(&mut IngredientDraft);

/// The extraction rules, in the order they run
pub(crate) const INGREDIENT_RULES: &[(&str, Rule)] = &[
    ("multiplier", strip_multiplier),
    ("parenthetical", strip_parentheticals),
    ("preparation", extract_preparation),
    ("apply_multiplier", apply_multiplier),
    ("unit", canonicalize_unit),
];

static MULTIPLIER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s+[x×]\s*(\d+(?:\.\d+)?)\s*$").expect("valid regex"));

static TRAILING_PAREN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\(([^()]*)\)\s*$").expect("valid regex"));

static QUANTITY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(\d+(?:[.,]\d+)?|\d+/\d+)\s*([A-Za-z]+\.?)?\s*$").expect("valid regex")
});

/// Parses an ingredient line
///
/// ```
/// use recipe_harvest::extract::parse_ingredient;
///
/// let parsed = parse_ingredient("Onion (100g) x2");
/// assert_eq!(parsed.name, "Onion");
/// assert_eq!(parsed.quantity, Some(200.0));
/// assert_eq!(parsed.unit.as_deref(), Some("g"));
/// ```
pub fn parse_ingredient(line: &str) -> ParsedIngredient {
    let mut draft = IngredientDraft {
        rest: collapse_whitespace(line),
        ..Default::default()
    };

    for (name, rule) in INGREDIENT_RULES {
        rule(&mut draft);
        tracing::trace!("ingredient rule {} -> {:?}", name, draft);
    }

    let name = draft.rest.trim().trim_end_matches(',').trim().to_string();

    ParsedIngredient {
        name,
        quantity: draft.quantity,
        unit: draft.raw_unit,
        preparation: draft.preparation,
        is_optional: draft.is_optional,
        original: line.to_string(),
    }
}

pub(crate) fn strip_multiplier(draft: &mut IngredientDraft) {
    let Some(caps) = MULTIPLIER_RE.captures(&draft.rest) else {
        return;
    };
    let Ok(value) = caps[1].parse::<f64>() else {
        return;
    };
    let start = caps.get(0).map(|m| m.start()).unwrap_or(draft.rest.len());
    draft.multiplier = Some(value);
    draft.rest.truncate(start);
}

pub(crate) fn strip_parentheticals(draft: &mut IngredientDraft) {
    while let Some(caps) = TRAILING_PAREN_RE.captures(&draft.rest) {
        let inner = caps[1].trim().to_string();
        let start = caps.get(0).map(|m| m.start()).unwrap_or(draft.rest.len());
        draft.rest.truncate(start);

        if inner.eq_ignore_ascii_case("optional") {
            draft.is_optional = true;
            continue;
        }

        if draft.quantity.is_none() {
            if let Some((quantity, unit)) = parse_quantity(&inner) {
                draft.quantity = Some(quantity);
                draft.raw_unit = unit;
                continue;
            }
        }

        // Innermost-to-outermost: the note closest to the name wins
        if !inner.is_empty() {
            draft.paren_note = Some(inner);
        }
    }
}

pub(crate) fn extract_preparation(draft: &mut IngredientDraft) {
    if let Some((name, note)) = draft.rest.split_once(',') {
        let note = note.trim();
        if !note.is_empty() {
            draft.preparation = Some(note.to_string());
        }
        draft.rest = name.trim().to_string();
    }

    if draft.preparation.is_none() {
        draft.preparation = draft.paren_note.take();
    }
}

pub(crate) fn apply_multiplier(draft: &mut IngredientDraft) {
    match draft.multiplier {
        Some(m) if m == 0.0 => draft.is_optional = true,
        Some(m) => {
            if let Some(q) = draft.quantity.as_mut() {
                *q *= m;
            }
        }
        None => {}
    }
}

pub(crate) fn canonicalize_unit(draft: &mut IngredientDraft) {
    if let Some(unit) = draft.raw_unit.take() {
        draft.raw_unit = Some(canonical_unit(&unit));
    }
}

/// Parses `<number><unit-word>` (e.g. "250g", "1.5 kg", "1/2 cup", "2")
fn parse_quantity(text: &str) -> Option<(f64, Option<String>)> {
    let caps = QUANTITY_RE.captures(text)?;
    let number = &caps[1];

    let value = match number.split_once('/') {
        Some((num, den)) => {
            let den: f64 = den.parse().ok()?;
            if den == 0.0 {
                return None;
            }
            num.parse::<f64>().ok()? / den
        }
        None => number.replace(',', ".").parse().ok()?,
    };

    Some((value, caps.get(2).map(|m| m.as_str().to_string())))
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
