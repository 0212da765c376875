//! URL handling module for Recipe-Harvest
//!
//! This module provides link normalization, domain extraction, wildcard domain
//! matching, slug derivation, and the recipe-URL classification rule shared by
//! every discovery strategy.

mod domain;
mod matcher;
mod normalize;

use url::Url;

pub use domain::{extract_domain, slug_from_url};
pub use matcher::matches_wildcard;
pub use normalize::normalize_url;

/// Path segments that mark listing, taxonomy, or pagination pages
pub const EXCLUDED_SEGMENTS: &[&str] = &["category", "categories", "tag", "tags", "page"];

/// Second path segment that always identifies a recipe collection
const RECIPES_SEGMENT: &str = "recipes";

/// Decides whether a URL points at an individual recipe page
///
/// A URL qualifies if its path has exactly three segments shaped like
/// `{section}/{category}/{slug}` or `{section}/recipes/{slug}`, and none of
/// its segments is in [`EXCLUDED_SEGMENTS`].
///
/// When `sections` is non-empty, the `{section}/{category}/{slug}` shape only
/// matches if the first segment is one of them. The `{section}/recipes/{slug}`
/// shape matches regardless of section.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use recipe_harvest::url::is_recipe_url;
///
/// let sections = vec!["food".to_string()];
/// let ok = Url::parse("https://example.com/food/dinner/beef-stew").unwrap();
/// let listing = Url::parse("https://example.com/food/category/dinner").unwrap();
/// assert!(is_recipe_url(&ok, &sections));
/// assert!(!is_recipe_url(&listing, &sections));
/// ```
pub fn is_recipe_url(url: &Url, sections: &[String]) -> bool {
    let segments: Vec<String> = match url.path_segments() {
        Some(segments) => segments
            .filter(|s| !s.is_empty())
            .map(|s| s.to_lowercase())
            .collect(),
        None => return false,
    };

    if segments.len() != 3 {
        return false;
    }

    if segments
        .iter()
        .any(|s| EXCLUDED_SEGMENTS.contains(&s.as_str()))
    {
        return false;
    }

    if segments[1] == RECIPES_SEGMENT {
        return true;
    }

    sections.is_empty() || sections.iter().any(|s| s.eq_ignore_ascii_case(&segments[0]))
}
