//! HTML page extraction
//!
//! Turns a fetched recipe page into raw, still-unparsed fields. The default
//! extractor reads the schema.org `Recipe` JSON-LD block that most recipe
//! sites embed, and falls back to microdata/CSS selectors when there is none.

use crate::fetch::RawDocument;
use scraper::{Html, Selector};
use serde_json::Value;
use std::collections::HashMap;

/// Raw recipe fields as found on the page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRecipe {
    pub title: Option<String>,
    pub description: Option<String>,
    pub ingredients: Vec<String>,
    pub instructions: Vec<String>,
    pub nutrients: HashMap<String, Value>,
    pub recipe_yield: Option<String>,
    pub total_time: Option<String>,
    pub prep_time: Option<String>,
    pub cook_time: Option<String>,
    pub image_urls: Vec<String>,
}

/// Capability that maps fetched HTML to raw recipe fields
pub trait PageExtractor: Send + Sync {
    /// Extracts raw fields, or describes why the page holds no recipe
    fn extract(&self, document: &RawDocument) -> Result<RawRecipe, String>;
}

/// Default extractor: JSON-LD first, selectors second
#[derive(Debug, Clone, Default)]
pub struct HtmlRecipeExtractor;

impl PageExtractor for HtmlRecipeExtractor {
    fn extract(&self, document: &RawDocument) -> Result<RawRecipe, String> {
        let html = Html::parse_document(&document.body);

        if let Some(recipe) = find_json_ld_recipe(&html) {
            tracing::trace!("Using JSON-LD recipe data for {}", document.url);
            return Ok(recipe_from_json_ld(&recipe));
        }

        let recipe = recipe_from_markup(&html);
        if recipe.title.is_none() && recipe.ingredients.is_empty() {
            return Err("no recipe content found".to_string());
        }
        Ok(recipe)
    }
}

fn find_json_ld_recipe(html: &Html) -> Option<Value> {
    let selector = Selector::parse(r#"script[type="application/ld+json"]"#).ok()?;

    html.select(&selector)
        .filter_map(|script| {
            let text = script.text().collect::<String>();
            serde_json::from_str::<Value>(text.trim()).ok()
        })
        .find_map(|value| find_recipe_node(&value).cloned())
}

/// Searches a JSON-LD value for a node typed `Recipe`
fn find_recipe_node(value: &Value) -> Option<&Value> {
    match value {
        Value::Array(items) => items.iter().find_map(find_recipe_node),
        Value::Object(map) => {
            if is_recipe_type(map.get("@type")) {
                return Some(value);
            }
            map.get("@graph").and_then(find_recipe_node)
        }
        _ => None,
    }
}

fn is_recipe_type(value: Option<&Value>) -> bool {
    match value {
        Some(Value::String(t)) => t == "Recipe",
        Some(Value::Array(types)) => types.iter().any(|t| t.as_str() == Some("Recipe")),
        _ => false,
    }
}

fn recipe_from_json_ld(node: &Value) -> RawRecipe {
    let nutrients = node
        .get("nutrition")
        .and_then(Value::as_object)
        .map(|obj| {
            obj.iter()
                .filter(|(k, _)| !k.starts_with('@'))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect()
        })
        .unwrap_or_default();

    RawRecipe {
        title: string_field(node, "name"),
        description: string_field(node, "description"),
        ingredients: string_list(node.get("recipeIngredient").or_else(|| node.get("ingredients"))),
        instructions: node
            .get("recipeInstructions")
            .map(flatten_instructions)
            .unwrap_or_default(),
        nutrients,
        recipe_yield: node.get("recipeYield").and_then(first_scalar),
        total_time: string_field(node, "totalTime"),
        prep_time: string_field(node, "prepTime"),
        cook_time: string_field(node, "cookTime"),
        image_urls: node.get("image").map(image_urls).unwrap_or_default(),
    }
}

fn string_field(node: &Value, key: &str) -> Option<String> {
    node.get(key)
        .and_then(Value::as_str)
        .map(clean_text)
        .filter(|s| !s.is_empty())
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(clean_text)
            .filter(|s| !s.is_empty())
            .collect(),
        Some(Value::String(s)) => s
            .lines()
            .map(clean_text)
            .filter(|s| !s.is_empty())
            .collect(),
        _ => Vec::new(),
    }
}

/// Flattens plain strings, `HowToStep` objects and nested `HowToSection`s
fn flatten_instructions(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) => s
            .lines()
            .map(clean_text)
            .filter(|s| !s.is_empty())
            .collect(),
        Value::Array(items) => items.iter().flat_map(flatten_instructions).collect(),
        Value::Object(map) => {
            if let Some(children) = map.get("itemListElement") {
                return flatten_instructions(children);
            }
            map.get("text")
                .or_else(|| map.get("name"))
                .and_then(Value::as_str)
                .map(clean_text)
                .filter(|s| !s.is_empty())
                .into_iter()
                .collect()
        }
        _ => Vec::new(),
    }
}

fn first_scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(clean_text(s)),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(items) => items.iter().find_map(first_scalar),
        _ => None,
    }
}

fn image_urls(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) => vec![s.trim().to_string()],
        Value::Array(items) => items.iter().flat_map(image_urls).collect(),
        Value::Object(map) => map
            .get("url")
            .and_then(Value::as_str)
            .map(|s| vec![s.trim().to_string()])
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}

fn recipe_from_markup(html: &Html) -> RawRecipe {
    let title = first_text(html, &["[itemprop='name']", "h1", "title"]);
    let description = first_attr(
        html,
        &[
            ("meta[name='description']", "content"),
            ("meta[property='og:description']", "content"),
        ],
    );

    let ingredients = all_text(
        html,
        &["[itemprop='recipeIngredient']", ".ingredients li", ".recipe-ingredients li"],
    );
    let instructions = all_text(
        html,
        &[
            "[itemprop='recipeInstructions'] li",
            "[itemprop='recipeInstructions']",
            ".instructions li",
            ".method li",
        ],
    );

    let image_urls = first_attr(html, &[("meta[property='og:image']", "content")])
        .into_iter()
        .collect();

    RawRecipe {
        title,
        description,
        ingredients,
        instructions,
        image_urls,
        ..Default::default()
    }
}

fn first_text(html: &Html, selectors: &[&str]) -> Option<String> {
    selectors.iter().find_map(|sel| {
        let selector = Selector::parse(sel).ok()?;
        html.select(&selector)
            .map(|el| clean_text(&el.text().collect::<String>()))
            .find(|s| !s.is_empty())
    })
}

fn first_attr(html: &Html, selectors: &[(&str, &str)]) -> Option<String> {
    selectors.iter().find_map(|(sel, attr)| {
        let selector = Selector::parse(sel).ok()?;
        html.select(&selector)
            .filter_map(|el| el.value().attr(attr))
            .map(clean_text)
            .find(|s| !s.is_empty())
    })
}

/// Texts of the first selector that matches anything
fn all_text(html: &Html, selectors: &[&str]) -> Vec<String> {
    for sel in selectors {
        let Ok(selector) = Selector::parse(sel) else {
            continue;
        };
        let items: Vec<String> = html
            .select(&selector)
            .map(|el| clean_text(&el.text().collect::<String>()))
            .filter(|s| !s.is_empty())
            .collect();
        if !items.is_empty() {
            return items;
        }
    }
    Vec::new()
}

fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
