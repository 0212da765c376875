//! Robots.txt handling module
//!
//! The target site's exclusion rules are fetched once, cached for a day, and
//! consulted before every request. Failing to fetch them never blocks a run.

mod cache;
mod parser;

pub use cache::CachedRobots;
pub use parser::ParsedRobots;

use reqwest::{Client, StatusCode};
use url::Url;

/// Fetches and parses robots.txt for the site rooted at `base_url`
///
/// Fails open: a missing file (4xx) means no restrictions, and any other
/// failure is logged as a warning and also treated as "allow all".
pub async fn fetch_robots(client: &Client, base_url: &Url, user_agent: &str) -> ParsedRobots {
    let robots_url = match base_url.join("/robots.txt") {
        Ok(url) => url,
        Err(e) => {
            tracing::warn!("Cannot build robots.txt URL from {}: {}", base_url, e);
            return ParsedRobots::allow_all();
        }
    };

    let response = match client
        .get(robots_url.as_str())
        .header(reqwest::header::USER_AGENT, user_agent)
        .send()
        .await
    {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!(
                "robots.txt unavailable at {} ({}); allowing all paths",
                robots_url,
                e
            );
            return ParsedRobots::allow_all();
        }
    };

    let status = response.status();
    if status.is_client_error() {
        tracing::debug!("No robots.txt at {} (HTTP {})", robots_url, status.as_u16());
        return ParsedRobots::allow_all();
    }

    if status != StatusCode::OK {
        tracing::warn!(
            "robots.txt at {} returned HTTP {}; allowing all paths",
            robots_url,
            status.as_u16()
        );
        return ParsedRobots::allow_all();
    }

    match response.text().await {
        Ok(body) => {
            tracing::info!("Loaded robots.txt from {}", robots_url);
            ParsedRobots::from_content(&body)
        }
        Err(e) => {
            tracing::warn!("Failed to read robots.txt body from {}: {}", robots_url, e);
            ParsedRobots::allow_all()
        }
    }
}
