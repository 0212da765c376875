//! Recipe-Harvest: a polite, resumable recipe acquisition pipeline
//!
//! This crate discovers recipe URLs on a target site, fetches them under strict
//! pacing and robots.txt constraints, turns the scraped text into structured
//! records, validates them, and persists them idempotently. Progress is tracked
//! in a durable checkpoint so an interrupted run can pick up where it stopped.

pub mod checkpoint;
pub mod config;
pub mod discovery;
pub mod extract;
pub mod fetch;
pub mod pipeline;
pub mod robots;
pub mod storage;
pub mod url;
pub mod validate;

use thiserror::Error;

/// Main error type for Recipe-Harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Discovery error: {0}")]
    Discovery(#[from] DiscoveryError),

    #[error("Checkpoint error: {0}")]
    Checkpoint(#[from] CheckpointError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid domain pattern: {0}")]
    InvalidPattern(String),
}

/// Errors produced by a single logical fetch
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("URL disallowed by robots.txt: {url}")]
    Disallowed { url: String },

    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("Network error for {url}: {message}")]
    Network { url: String, message: String },

    #[error("HTTP {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Fetch cancelled for {url}")]
    Cancelled { url: String },
}

impl FetchError {
    /// Returns true if a later attempt at the same URL might succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout { .. } | Self::Network { .. } => true,
            Self::HttpStatus { status, .. } => matches!(status, 429 | 500 | 502 | 503 | 504),
            Self::Disallowed { .. } | Self::Cancelled { .. } => false,
        }
    }

    /// Short label used when aggregating failures in run statistics
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Disallowed { .. } => "disallowed",
            Self::Timeout { .. } => "timeout",
            Self::Network { .. } => "network",
            Self::HttpStatus { .. } => "http_status",
            Self::Cancelled { .. } => "cancelled",
        }
    }
}

/// Errors raised while enumerating candidate URLs
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("Failed to fetch {0}")]
    Fetch(#[from] FetchError),

    #[error("Malformed sitemap at {url}: {message}")]
    Parse { url: String, message: String },

    #[error("Discovery cancelled")]
    Cancelled,
}

/// Errors raised by the checkpoint store
#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("Checkpoint IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt checkpoint at {path}: {message}")]
    Corrupt { path: String, message: String },

    #[error("Unsupported checkpoint version {0}")]
    UnsupportedVersion(u32),

    #[error("Failed to serialize checkpoint: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Unknown target id: {0}")]
    UnknownTarget(String),

    #[error("No active session")]
    NoSession,
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,
}

/// Result type alias for Recipe-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use checkpoint::{CheckpointSession, CheckpointStore};
pub use config::Config;
pub use discovery::{CandidateSet, Discoverer};
pub use extract::NormalizedRecord;
pub use fetch::{RawDocument, ThrottledClient};
pub use pipeline::{Orchestrator, RunStats};
pub use validate::{ValidationResult, Validator};
