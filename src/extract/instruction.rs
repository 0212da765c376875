//! Instruction step parsing
//!
//! Steps may carry alternate-serving values in brackets, e.g.
//! `"Add 200g [300g] [400g] flour"` where the bracketed values apply to larger
//! batch sizes, and a cooking time such as `"Simmer for 15-20 minutes"`.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Structured form of one instruction step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedInstruction {
    /// Step text with bracketed alternates removed
    pub base_text: String,
    /// Bracketed alternate values, in order of appearance
    pub variants: Vec<String>,
    /// Estimated duration in minutes, if the step mentions one
    pub duration_minutes: Option<u32>,
}

static VARIANT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\[([^\[\]]*)\]").expect("valid regex"));

static RANGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d+)\s*(?:-|–|to)\s*(\d+)\s*min(?:ute)?s?\b").expect("valid regex")
});

static SINGLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(\d+)\s*min(?:ute)?s?\b").expect("valid regex"));

/// Parses a single instruction step
///
/// ```
/// use recipe_harvest::extract::parse_instruction;
///
/// let step = parse_instruction("Add 200g [300g] flour and simmer for 15-20 minutes");
/// assert_eq!(step.base_text, "Add 200g flour and simmer for 15-20 minutes");
/// assert_eq!(step.variants, vec!["300g".to_string()]);
/// assert_eq!(step.duration_minutes, Some(20));
/// ```
pub fn parse_instruction(text: &str) -> ParsedInstruction {
    let (base_text, variants) = split_variants(text);
    let duration_minutes = extract_duration(&base_text);

    ParsedInstruction {
        base_text,
        variants,
        duration_minutes,
    }
}

/// Removes `[alt]` tokens from a step, returning the cleaned text and the alternates
pub fn split_variants(text: &str) -> (String, Vec<String>) {
    let variants = VARIANT_RE
        .captures_iter(text)
        .map(|caps| caps[1].trim().to_string())
        .filter(|v| !v.is_empty())
        .collect();

    let stripped = VARIANT_RE.replace_all(text, "");
    let base_text = stripped.split_whitespace().collect::<Vec<_>>().join(" ");

    (base_text, variants)
}

/// Extracts a duration in minutes
///
/// Ranges (`"15-20 minutes"`, `"15 to 20 mins"`) resolve to the upper bound.
/// Returns None when the text mentions no minutes.
pub fn extract_duration(text: &str) -> Option<u32> {
    if let Some(caps) = RANGE_RE.captures(text) {
        let low: u32 = caps[1].parse().ok()?;
        let high: u32 = caps[2].parse().ok()?;
        return Some(low.max(high));
    }

    SINGLE_RE
        .captures(text)
        .and_then(|caps| caps[1].parse().ok())
}
