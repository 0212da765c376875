//! Link extraction from category listing pages

use scraper::{Html, Selector};
use url::Url;

/// Extracts every followable link from an HTML document as an absolute URL
///
/// # Link Extraction Rules
///
/// **Include:** `<a href="...">` anywhere in the document.
///
/// **Exclude:**
/// - `<a href="..." download>`
/// - `javascript:`, `mailto:`, `tel:`, `data:` links
/// - fragment-only links
/// - anything that does not resolve to HTTP(S)
pub fn extract_links(html: &str, base_url: &Url) -> Vec<String> {
    let document = Html::parse_document(html);
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    document
        .select(&selector)
        .filter(|element| element.value().attr("download").is_none())
        .filter_map(|element| element.value().attr("href"))
        .filter_map(|href| resolve_link(href, base_url))
        .collect()
}

fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| href.starts_with(scheme))
    {
        return None;
    }

    let absolute = base_url.join(href).ok()?;
    matches!(absolute.scheme(), "http" | "https").then(|| absolute.to_string())
}
