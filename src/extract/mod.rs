//! Structured extraction
//!
//! Turns free text scraped from a recipe page into typed fields:
//! - ingredient lines into quantity, unit and preparation
//! - instruction steps into base text, alternates and duration
//! - nutrient values into numbers
//!
//! The page-level collaborator ([`PageExtractor`]) finds those texts in HTML;
//! [`normalize_recipe`] combines both into a [`NormalizedRecord`].

mod ingredient;
mod instruction;
mod nutrition;
mod page;
mod record;
mod units;

pub use ingredient::{parse_ingredient, ParsedIngredient};
pub use instruction::{extract_duration, parse_instruction, split_variants, ParsedInstruction};
pub use nutrition::{normalize_nutrient, parse_nutrient_str, NutritionInfo};
pub use page::{HtmlRecipeExtractor, PageExtractor, RawRecipe};
pub use record::{
    normalize_recipe, parse_iso_duration, parse_yield, InstructionStep, NormalizedRecord,
};
pub use units::canonical_unit;
