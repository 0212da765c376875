//! Robots.txt caching with daily expiry

use crate::robots::ParsedRobots;
use chrono::{DateTime, Duration, Utc};

/// How long fetched rules stay valid before they are refetched
const MAX_AGE_HOURS: i64 = 24;

/// Parsed robots.txt together with the moment it was fetched
#[derive(Debug, Clone)]
pub struct CachedRobots {
    pub content: ParsedRobots,
    pub fetched_at: DateTime<Utc>,
}

impl CachedRobots {
    pub fn new(content: ParsedRobots) -> Self {
        Self {
            content,
            fetched_at: Utc::now(),
        }
    }

    /// Checks if the cached rules are older than 24 hours
    pub fn is_stale(&self) -> bool {
        self.age() > Duration::hours(MAX_AGE_HOURS)
    }

    pub fn age(&self) -> Duration {
        Utc::now() - self.fetched_at
    }

    pub fn is_allowed(&self, url: &str, user_agent: &str) -> bool {
        self.content.is_allowed(url, user_agent)
    }

    pub fn crawl_delay(&self, user_agent: &str) -> Option<f64> {
        self.content.crawl_delay(user_agent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_cache_not_stale() {
        let cache = CachedRobots::new(ParsedRobots::allow_all());
        assert!(!cache.is_stale());
    }

    #[test]
    fn test_cache_stale_after_a_day() {
        let mut cache = CachedRobots::new(ParsedRobots::allow_all());
        cache.fetched_at = Utc::now() - Duration::hours(25);
        assert!(cache.is_stale());

        cache.fetched_at = Utc::now() - Duration::hours(23);
        assert!(!cache.is_stale());
    }

    #[test]
    fn test_delegates_to_rules() {
        let cache = CachedRobots::new(ParsedRobots::from_content(
            "User-agent: *\nDisallow: /print\nCrawl-delay: 3",
        ));
        assert!(!cache.is_allowed("https://example.com/print/stew", "RecipeBot"));
        assert_eq!(cache.crawl_delay("RecipeBot"), Some(3.0));
    }
}
