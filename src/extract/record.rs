//! Assembly of a normalized recipe record from raw page fields

use crate::extract::ingredient::{parse_ingredient, ParsedIngredient};
use crate::extract::instruction::parse_instruction;
use crate::extract::nutrition::NutritionInfo;
use crate::extract::page::RawRecipe;
use crate::url::slug_from_url;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// One numbered instruction step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstructionStep {
    /// 1-based position within the recipe
    pub step_number: u32,
    pub text: String,
    pub variants: Vec<String>,
    pub duration_minutes: Option<u32>,
}

/// Structured recipe data, ready for validation and persistence
///
/// Built once by [`normalize_recipe`] and not mutated afterwards. Times and
/// servings are signed so the validator can report out-of-range source data
/// instead of it being lost in conversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRecord {
    /// Stable identity derived from the source URL
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
    pub ingredients: Vec<ParsedIngredient>,
    pub instructions: Vec<InstructionStep>,
    pub nutrition: Option<NutritionInfo>,
    pub prep_time_minutes: Option<i64>,
    pub cook_time_minutes: Option<i64>,
    pub total_time_minutes: Option<i64>,
    pub servings: Option<i64>,
    pub source_url: String,
    pub image_urls: Vec<String>,
}

static ISO_DURATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^P(?:(\d+)D)?(?:T(?:(\d+)H)?(?:(\d+)M)?(?:(\d+(?:\.\d+)?)S)?)?$")
        .expect("valid regex")
});

static LEADING_INT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-?\d+").expect("valid regex"));

/// Runs every raw field through the structured extractor
pub fn normalize_recipe(raw: &RawRecipe, source_url: &str) -> NormalizedRecord {
    let ingredients = raw
        .ingredients
        .iter()
        .map(|line| parse_ingredient(line))
        .filter(|ing| !ing.name.is_empty())
        .collect();

    let instructions: Vec<InstructionStep> = raw
        .instructions
        .iter()
        .map(|text| parse_instruction(text))
        .filter(|step| !step.base_text.is_empty())
        .zip(1u32..)
        .map(|(parsed, step_number)| InstructionStep {
            step_number,
            text: parsed.base_text,
            variants: parsed.variants,
            duration_minutes: parsed.duration_minutes,
        })
        .collect();

    let prep_time_minutes = raw.prep_time.as_deref().and_then(parse_iso_duration);
    let cook_time_minutes = raw.cook_time.as_deref().and_then(parse_iso_duration);
    let total_time_minutes = raw
        .total_time
        .as_deref()
        .and_then(parse_iso_duration)
        .or_else(|| match (prep_time_minutes, cook_time_minutes) {
            (None, None) => None,
            (prep, cook) => prep.unwrap_or(0).checked_add(cook.unwrap_or(0)),
        })
        .or_else(|| summed_step_minutes(&instructions));

    NormalizedRecord {
        slug: slug_from_url(source_url).unwrap_or_default(),
        name: raw.title.clone().unwrap_or_default(),
        description: raw.description.clone(),
        ingredients,
        instructions,
        nutrition: NutritionInfo::from_raw(&raw.nutrients),
        prep_time_minutes,
        cook_time_minutes,
        total_time_minutes,
        servings: raw.recipe_yield.as_deref().and_then(parse_yield),
        source_url: source_url.to_string(),
        image_urls: raw.image_urls.clone(),
    }
}

fn summed_step_minutes(steps: &[InstructionStep]) -> Option<i64> {
    let durations: Vec<i64> = steps
        .iter()
        .filter_map(|s| s.duration_minutes.map(i64::from))
        .collect();
    if durations.is_empty() {
        return None;
    }
    durations.iter().try_fold(0i64, |acc, d| acc.checked_add(*d))
}

/// Converts an ISO-8601 duration such as `PT1H30M` to whole minutes
///
/// Seconds are rounded up to the next minute. Returns None when the text is
/// not a duration or its total does not fit in an `i64`.
pub fn parse_iso_duration(text: &str) -> Option<i64> {
    let caps = ISO_DURATION_RE.captures(text.trim())?;

    if caps.iter().skip(1).all(|m| m.is_none()) {
        return None;
    }

    let part = |i: usize| -> Option<i64> {
        match caps.get(i) {
            Some(m) => m.as_str().parse::<i64>().ok(),
            None => Some(0),
        }
    };

    let seconds = caps
        .get(4)
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .unwrap_or(0.0);
    let second_minutes = (seconds / 60.0).ceil();
    if !second_minutes.is_finite() || second_minutes >= i64::MAX as f64 {
        return None;
    }

    part(1)?
        .checked_mul(24 * 60)?
        .checked_add(part(2)?.checked_mul(60)?)?
        .checked_add(part(3)?)?
        .checked_add(second_minutes as i64)
}

/// Reads the first integer of a yield string like `"Serves 4"` or `"4 servings"`
pub fn parse_yield(text: &str) -> Option<i64> {
    LEADING_INT_RE
        .find(text)
        .and_then(|m| m.as_str().parse().ok())
}
