//! Sitemap document parsing
//!
//! Handles both `<urlset>` documents (content URLs) and `<sitemapindex>`
//! documents (locations of child sitemaps).

use quick_xml::events::Event;
use quick_xml::Reader;
use serde::Deserialize;

/// A parsed sitemap document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SitemapDocument {
    /// `<sitemapindex>`: child sitemap locations
    Index(Vec<String>),
    /// `<urlset>`: page locations
    UrlSet(Vec<String>),
}

#[derive(Debug, Deserialize)]
struct SitemapIndex {
    #[serde(rename = "sitemap", default)]
    entries: Vec<LocEntry>,
}

#[derive(Debug, Deserialize)]
struct UrlSet {
    #[serde(rename = "url", default)]
    entries: Vec<LocEntry>,
}

#[derive(Debug, Deserialize)]
struct LocEntry {
    loc: String,
}

/// Parses sitemap XML into its locations
///
/// # Errors
///
/// Returns a description of the problem if the document is not well-formed
/// XML or its root element is neither `urlset` nor `sitemapindex`.
pub fn parse_sitemap(xml: &str) -> Result<SitemapDocument, String> {
    let root = root_element(xml)?;

    match root.as_str() {
        "sitemapindex" => {
            let index: SitemapIndex =
                quick_xml::de::from_str(xml).map_err(|e| e.to_string())?;
            Ok(SitemapDocument::Index(collect_locs(index.entries)))
        }
        "urlset" => {
            let set: UrlSet = quick_xml::de::from_str(xml).map_err(|e| e.to_string())?;
            Ok(SitemapDocument::UrlSet(collect_locs(set.entries)))
        }
        other => Err(format!("unexpected root element <{}>", other)),
    }
}

fn collect_locs(entries: Vec<LocEntry>) -> Vec<String> {
    entries
        .into_iter()
        .map(|e| e.loc.trim().to_string())
        .filter(|loc| !loc.is_empty())
        .collect()
}

/// Returns the local name of the first element in the document
fn root_element(xml: &str) -> Result<String, String> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                return Ok(String::from_utf8_lossy(e.local_name().as_ref()).to_lowercase());
            }
            Ok(Event::Eof) => return Err("document has no root element".to_string()),
            Ok(_) => continue,
            Err(e) => {
                return Err(format!(
                    "XML error at position {}: {}",
                    reader.buffer_position(),
                    e
                ))
            }
        }
    }
}
