//! Throttled HTTP fetch client
//!
//! This module handles all outbound requests for the pipeline:
//! - Building the reqwest client
//! - robots.txt enforcement (fail-open)
//! - Global request pacing
//! - User-agent rotation
//! - Retry with exponential backoff for transient failures
//! - Error classification

use crate::config::FetchConfig;
use crate::fetch::pacer::Pacer;
use crate::robots::{fetch_robots, CachedRobots, ParsedRobots};
use crate::{FetchError, HarvestError};
use chrono::{DateTime, Utc};
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use reqwest::Client;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Longest wait between two attempts at the same URL
pub const MAX_BACKOFF: Duration = Duration::from_secs(300);

/// Fetched page content plus response metadata
#[derive(Debug, Clone)]
pub struct RawDocument {
    /// URL that was requested
    pub url: String,
    /// URL after redirects
    pub final_url: String,
    /// HTTP status code
    pub status: u16,
    /// Content-Type header value, if any
    pub content_type: Option<String>,
    /// Response body
    pub body: String,
    pub fetched_at: DateTime<Utc>,
}

/// Politeness-compliant HTTP client
///
/// Cloning is cheap and every clone shares the pacing clock, robots cache and
/// user-agent rotation, so concurrent users are still paced globally.
#[derive(Debug, Clone)]
pub struct ThrottledClient {
    http: Client,
    pacer: Pacer,
    base_url: Url,
    user_agents: Arc<[String]>,
    next_agent: Arc<AtomicUsize>,
    robots: Arc<RwLock<Option<CachedRobots>>>,
    respect_robots: bool,
    max_attempts: u32,
    backoff_base: f64,
    backoff_unit: Duration,
    cancel: CancellationToken,
}

/// Builds the underlying reqwest client
///
/// No default user agent is set; one is chosen per request from the rotation.
pub fn build_http_client(config: &FetchConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(config.timeout_secs.min(10)))
        .redirect(reqwest::redirect::Policy::limited(10))
        .gzip(true)
        .brotli(true)
        .build()
}

impl ThrottledClient {
    /// Creates a client for the site rooted at `base_url`
    pub fn new(config: &FetchConfig, base_url: &str) -> Result<Self, HarvestError> {
        let http = build_http_client(config)?;
        let base_url = Url::parse(base_url)?;

        Ok(Self {
            http,
            pacer: Pacer::new(Duration::from_millis(config.min_delay_ms)),
            base_url,
            user_agents: config.user_agents.clone().into(),
            next_agent: Arc::new(AtomicUsize::new(0)),
            robots: Arc::new(RwLock::new(None)),
            respect_robots: config.respect_robots,
            max_attempts: config.max_attempts.max(1),
            backoff_base: config.backoff_base,
            backoff_unit: Duration::from_secs(1),
            cancel: CancellationToken::new(),
        })
    }

    /// Ties this client to a cancellation token; pending waits abort when it fires
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Scales the backoff schedule; one "second" of `base^attempt` becomes `unit`
    pub fn with_backoff_unit(mut self, unit: Duration) -> Self {
        self.backoff_unit = unit;
        self
    }

    /// Overrides the crawl delay (e.g., from the command line)
    pub async fn set_min_delay(&self, delay: Duration) {
        self.pacer.set_min_delay(delay).await;
    }

    pub async fn min_delay(&self) -> Duration {
        self.pacer.min_delay().await
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn respects_robots(&self) -> bool {
        self.respect_robots
    }

    /// The identity robots.txt rules are evaluated against
    pub fn primary_user_agent(&self) -> &str {
        self.user_agents.first().map(String::as_str).unwrap_or("*")
    }

    fn rotate_user_agent(&self) -> &str {
        if self.user_agents.is_empty() {
            return "*";
        }
        let index = self.next_agent.fetch_add(1, Ordering::Relaxed) % self.user_agents.len();
        &self.user_agents[index]
    }

    /// Fetches robots.txt and caches it, honoring any declared crawl delay
    ///
    /// The request is paced like any other. Never fails: unavailable rules
    /// mean "allow all".
    pub async fn load_robots(&self) -> ParsedRobots {
        let user_agent = self.primary_user_agent().to_string();
        let parsed = match self.pacer.acquire(&self.cancel).await {
            Some(_slot) => fetch_robots(&self.http, &self.base_url, &user_agent).await,
            None => ParsedRobots::allow_all(),
        };

        if let Some(delay) = parsed.crawl_delay(&user_agent) {
            if delay.is_finite() && delay > 0.0 {
                self.pacer
                    .raise_min_delay(Duration::from_secs_f64(delay))
                    .await;
            }
        }

        *self.robots.write().await = Some(CachedRobots::new(parsed.clone()));
        parsed
    }

    /// Installs rules directly, bypassing the network
    pub async fn set_robots(&self, robots: ParsedRobots) {
        *self.robots.write().await = Some(CachedRobots::new(robots));
    }

    async fn is_allowed(&self, url: &str) -> bool {
        if !self.respect_robots {
            return true;
        }

        {
            let cache = self.robots.read().await;
            if let Some(cached) = cache.as_ref().filter(|c| !c.is_stale()) {
                return cached.is_allowed(url, self.primary_user_agent());
            }
        }

        tracing::debug!("robots.txt cache empty or stale, refreshing");
        self.load_robots()
            .await
            .is_allowed(url, self.primary_user_agent())
    }

    /// Performs a single paced GET
    ///
    /// # Errors
    ///
    /// * `Disallowed` - robots.txt forbids the URL; no request is made
    /// * `Timeout` - the request timed out
    /// * `Network` - connection or body read failure
    /// * `HttpStatus` - any non-2xx response
    /// * `Cancelled` - the run was cancelled while waiting for a slot
    pub async fn fetch(&self, url: &str) -> Result<RawDocument, FetchError> {
        if !self.is_allowed(url).await {
            tracing::info!("Skipping {}: disallowed by robots.txt", url);
            return Err(FetchError::Disallowed {
                url: url.to_string(),
            });
        }

        let _slot = self
            .pacer
            .acquire(&self.cancel)
            .await
            .ok_or_else(|| FetchError::Cancelled {
                url: url.to_string(),
            })?;

        let user_agent = self.rotate_user_agent();
        tracing::debug!("GET {}", url);

        let response = self
            .http
            .get(url)
            .header(USER_AGENT, user_agent)
            .send()
            .await
            .map_err(|e| classify_reqwest_error(url, &e))?;

        let status = response.status();
        let final_url = response.url().to_string();

        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let body = response
            .text()
            .await
            .map_err(|e| classify_reqwest_error(url, &e))?;

        Ok(RawDocument {
            url: url.to_string(),
            final_url,
            status: status.as_u16(),
            content_type,
            body,
            fetched_at: Utc::now(),
        })
    }

    /// Fetches with retries on transient failures
    ///
    /// Retries HTTP 429/500/502/503/504, timeouts and network errors up to
    /// `max_attempts` total attempts, sleeping `base^attempt` seconds between
    /// them (attempt counted from 0).
    ///
    /// # Returns
    ///
    /// * `Ok(Some(doc))` - fetched successfully
    /// * `Ok(None)` - every attempt failed with a transient error
    /// * `Err(FetchError)` - a non-retryable failure, returned immediately
    pub async fn fetch_with_retry(
        &self,
        url: &str,
        max_attempts: u32,
    ) -> Result<Option<RawDocument>, FetchError> {
        let max_attempts = max_attempts.max(1);

        for attempt in 0..max_attempts {
            match self.fetch(url).await {
                Ok(doc) => return Ok(Some(doc)),
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) => {
                    if attempt + 1 == max_attempts {
                        tracing::warn!(
                            "Giving up on {} after {} attempts: {}",
                            url,
                            max_attempts,
                            e
                        );
                        break;
                    }

                    let wait = self.backoff_delay(attempt);
                    tracing::warn!(
                        "Attempt {}/{} for {} failed ({}); retrying in {:?}",
                        attempt + 1,
                        max_attempts,
                        url,
                        e,
                        wait
                    );

                    tokio::select! {
                        _ = tokio::time::sleep(wait) => {}
                        _ = self.cancel.cancelled() => {
                            return Err(FetchError::Cancelled { url: url.to_string() });
                        }
                    }
                }
            }
        }

        Ok(None)
    }

    /// Backoff before the retry that follows failed attempt `attempt`
    ///
    /// Capped at [`MAX_BACKOFF`].
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let secs = self.backoff_unit.as_secs_f64() * self.backoff_base.powi(exponent);
        Duration::try_from_secs_f64(secs)
            .map(|wait| wait.min(MAX_BACKOFF))
            .unwrap_or(MAX_BACKOFF)
    }
}

fn classify_reqwest_error(url: &str, error: &reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else {
        FetchError::Network {
            url: url.to_string(),
            message: error.to_string(),
        }
    }
}
