//! Candidate URL discovery
//!
//! Two independent strategies feed one deduplicated [`CandidateSet`]:
//! - **Sitemap**: walk the root sitemap, following sitemap indexes
//! - **Category**: scan category landing pages for recipe links
//!
//! Both apply the same recipe-URL classification rule.

mod links;
mod sitemap;

pub use links::extract_links;
pub use sitemap::{parse_sitemap, SitemapDocument};

use crate::config::SiteConfig;
use crate::fetch::{RawDocument, ThrottledClient};
use crate::url::{is_recipe_url, normalize_url};
use crate::{DiscoveryError, FetchError};
use std::collections::{BTreeSet, HashSet, VecDeque};
use url::Url;

/// Nesting limit for sitemap indexes pointing at further indexes
const MAX_SITEMAP_DEPTH: u32 = 3;

/// Which strategy produced a candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiscoverySource {
    Sitemap,
    Category,
}

/// A discovered URL and where it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryTarget {
    pub url: String,
    pub source: DiscoverySource,
}

/// Deduplicated set of recipe URLs
///
/// Membership is by exact URL string. Iteration order is sorted, so repeated
/// discoveries over the same site yield the same target order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidateSet {
    urls: BTreeSet<String>,
}

impl CandidateSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a URL; returns false if it was already present
    pub fn insert(&mut self, url: impl Into<String>) -> bool {
        self.urls.insert(url.into())
    }

    pub fn extend_targets<I: IntoIterator<Item = DiscoveryTarget>>(&mut self, targets: I) {
        for target in targets {
            self.insert(target.url);
        }
    }

    pub fn contains(&self, url: &str) -> bool {
        self.urls.contains(url)
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.urls.iter()
    }

    pub fn into_vec(self) -> Vec<String> {
        self.urls.into_iter().collect()
    }
}

/// Enumerates recipe URLs on the target site
pub struct Discoverer {
    client: ThrottledClient,
    sitemap_url: Option<String>,
    category_urls: Vec<String>,
    sections: Vec<String>,
}

impl Discoverer {
    pub fn new(client: ThrottledClient, site: &SiteConfig) -> Self {
        Self {
            client,
            sitemap_url: site.sitemap_url.clone(),
            category_urls: site.category_urls.clone(),
            sections: site.sections.clone(),
        }
    }

    /// Runs the requested strategies and unions their results
    ///
    /// Each strategy fails on its own: category pages are skipped one by one,
    /// and a sitemap root that cannot be fetched or parsed only disables the
    /// sitemap strategy. That sitemap error is returned only when no other
    /// strategy produced a candidate. Cancellation always aborts discovery.
    pub async fn discover_all(
        &self,
        use_sitemap: bool,
        use_categories: bool,
    ) -> Result<CandidateSet, DiscoveryError> {
        let mut candidates = CandidateSet::new();
        let mut sitemap_error = None;

        if use_sitemap {
            match &self.sitemap_url {
                Some(root) => match self.discover_from_sitemap(root).await {
                    Ok(targets) => {
                        tracing::info!("Sitemap strategy found {} recipe URLs", targets.len());
                        candidates.extend_targets(targets);
                    }
                    Err(DiscoveryError::Cancelled) => return Err(DiscoveryError::Cancelled),
                    Err(e) => {
                        tracing::warn!("Sitemap strategy failed: {}", e);
                        sitemap_error = Some(e);
                    }
                },
                None => tracing::warn!("Sitemap strategy requested but no sitemap-url configured"),
            }
        }

        if use_categories {
            let targets = self.discover_from_categories().await?;
            tracing::info!("Category strategy found {} recipe URLs", targets.len());
            candidates.extend_targets(targets);
        }

        if let Some(e) = sitemap_error {
            if candidates.is_empty() {
                return Err(e);
            }
        }

        tracing::info!("Discovery complete: {} unique candidates", candidates.len());
        Ok(candidates)
    }

    /// Walks a sitemap (or sitemap index) and returns the recipe URLs in it
    ///
    /// Child sitemaps that fail to fetch or parse are skipped with a warning.
    pub async fn discover_from_sitemap(
        &self,
        root_url: &str,
    ) -> Result<Vec<DiscoveryTarget>, DiscoveryError> {
        let root_doc = self.fetch_document(root_url).await?;
        let root = parse_sitemap(&root_doc.body).map_err(|message| DiscoveryError::Parse {
            url: root_url.to_string(),
            message,
        })?;

        let mut targets = Vec::new();
        let mut seen_urls = HashSet::new();
        let mut visited_sitemaps = HashSet::from([root_url.to_string()]);
        let mut queue: VecDeque<(SitemapDocument, u32)> = VecDeque::from([(root, 0)]);

        while let Some((document, depth)) = queue.pop_front() {
            match document {
                SitemapDocument::UrlSet(locs) => {
                    for loc in locs {
                        if let Some(url) = self.classify(&loc) {
                            if seen_urls.insert(url.clone()) {
                                targets.push(DiscoveryTarget {
                                    url,
                                    source: DiscoverySource::Sitemap,
                                });
                            }
                        }
                    }
                }
                SitemapDocument::Index(children) => {
                    if depth >= MAX_SITEMAP_DEPTH {
                        tracing::warn!(
                            "Sitemap index nesting exceeds {}; ignoring {} children",
                            MAX_SITEMAP_DEPTH,
                            children.len()
                        );
                        continue;
                    }

                    for child in children {
                        if !visited_sitemaps.insert(child.clone()) {
                            continue;
                        }
                        if let Some(doc) = self.fetch_child_sitemap(&child).await? {
                            queue.push_back((doc, depth + 1));
                        }
                    }
                }
            }
        }

        Ok(targets)
    }

    /// None if the child could not be fetched or parsed
    async fn fetch_child_sitemap(
        &self,
        url: &str,
    ) -> Result<Option<SitemapDocument>, DiscoveryError> {
        let doc = match self.fetch_document(url).await {
            Ok(doc) => doc,
            Err(DiscoveryError::Cancelled) => return Err(DiscoveryError::Cancelled),
            Err(e) => {
                tracing::warn!("Skipping child sitemap {}: {}", url, e);
                return Ok(None);
            }
        };

        match parse_sitemap(&doc.body) {
            Ok(parsed) => Ok(Some(parsed)),
            Err(e) => {
                tracing::warn!("Skipping malformed child sitemap {}: {}", url, e);
                Ok(None)
            }
        }
    }

    /// Scans every configured category page for recipe links
    ///
    /// Each page is independent: a failure is logged and the next one is
    /// tried. Only cancellation is returned as an error.
    pub async fn discover_from_categories(&self) -> Result<Vec<DiscoveryTarget>, DiscoveryError> {
        let mut targets = Vec::new();
        let mut seen = HashSet::new();

        for category_url in &self.category_urls {
            let doc = match self.fetch_document(category_url).await {
                Ok(doc) => doc,
                Err(DiscoveryError::Cancelled) => return Err(DiscoveryError::Cancelled),
                Err(e) => {
                    tracing::warn!("Skipping category {}: {}", category_url, e);
                    continue;
                }
            };

            let base = match Url::parse(&doc.final_url).or_else(|_| Url::parse(category_url)) {
                Ok(base) => base,
                Err(e) => {
                    tracing::warn!("Skipping category {}: bad base URL: {}", category_url, e);
                    continue;
                }
            };

            let before = targets.len();
            for link in extract_links(&doc.body, &base) {
                if let Some(url) = self.classify(&link) {
                    if seen.insert(url.clone()) {
                        targets.push(DiscoveryTarget {
                            url,
                            source: DiscoverySource::Category,
                        });
                    }
                }
            }
            tracing::debug!(
                "Category {} yielded {} new recipe URLs",
                category_url,
                targets.len() - before
            );
        }

        Ok(targets)
    }

    /// Normalizes a candidate and keeps it only if it is a recipe URL
    fn classify(&self, candidate: &str) -> Option<String> {
        let url = normalize_url(candidate).ok()?;
        is_recipe_url(&url, &self.sections).then(|| url.to_string())
    }

    async fn fetch_document(&self, url: &str) -> Result<RawDocument, DiscoveryError> {
        let attempts = self.client.max_attempts();
        match self.client.fetch_with_retry(url, attempts).await {
            Ok(Some(doc)) => Ok(doc),
            Ok(None) => Err(DiscoveryError::Fetch(FetchError::Network {
                url: url.to_string(),
                message: format!("gave up after {} attempts", attempts),
            })),
            Err(FetchError::Cancelled { .. }) => Err(DiscoveryError::Cancelled),
            Err(e) => Err(e.into()),
        }
    }
}
