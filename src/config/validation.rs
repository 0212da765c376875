use crate::config::types::{
    CheckpointConfig, Config, FetchConfig, OutputConfig, SiteConfig, ValidationConfig,
};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_site_config(&config.site)?;
    validate_fetch_config(&config.fetch)?;
    validate_validation_config(&config.validation)?;
    validate_checkpoint_config(&config.checkpoint)?;
    validate_output_config(&config.output)?;
    Ok(())
}

fn validate_site_config(config: &SiteConfig) -> Result<(), ConfigError> {
    validate_http_url("base-url", &config.base_url)?;
    validate_domain_pattern(&config.expected_domain)?;

    if let Some(sitemap) = &config.sitemap_url {
        validate_http_url("sitemap-url", sitemap)?;
    }

    for category in &config.category_urls {
        validate_http_url("category-urls", category)?;
    }

    Ok(())
}

/// Upper bound on `max-attempts`
const MAX_ATTEMPTS: u32 = 10;

/// Upper bound on `backoff-base`
const MAX_BACKOFF_BASE: f64 = 10.0;

fn validate_fetch_config(config: &FetchConfig) -> Result<(), ConfigError> {
    if !(1..=MAX_ATTEMPTS).contains(&config.max_attempts) {
        return Err(ConfigError::Validation(format!(
            "max-attempts must be between 1 and {}, got {}",
            MAX_ATTEMPTS, config.max_attempts
        )));
    }

    if !(1.0..=MAX_BACKOFF_BASE).contains(&config.backoff_base) {
        return Err(ConfigError::Validation(format!(
            "backoff-base must be between 1.0 and {}, got {}",
            MAX_BACKOFF_BASE, config.backoff_base
        )));
    }

    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "timeout-secs must be >= 1".to_string(),
        ));
    }

    if config.user_agents.is_empty() {
        return Err(ConfigError::Validation(
            "user-agents must contain at least one entry".to_string(),
        ));
    }

    if config.user_agents.iter().any(|ua| ua.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "user-agents cannot contain blank entries".to_string(),
        ));
    }

    Ok(())
}

fn validate_validation_config(config: &ValidationConfig) -> Result<(), ConfigError> {
    if config.min_calories > config.max_calories {
        return Err(ConfigError::Validation(format!(
            "min-calories ({}) cannot exceed max-calories ({})",
            config.min_calories, config.max_calories
        )));
    }
    Ok(())
}

fn validate_checkpoint_config(config: &CheckpointConfig) -> Result<(), ConfigError> {
    if config.path.is_empty() {
        return Err(ConfigError::Validation(
            "checkpoint path cannot be empty".to_string(),
        ));
    }

    if config.autosave_interval < 1 {
        return Err(ConfigError::Validation(format!(
            "autosave-interval must be >= 1, got {}",
            config.autosave_interval
        )));
    }

    Ok(())
}

fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database-path cannot be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_http_url(field: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", field, value, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "{} '{}' must use http or https",
            field, value
        )));
    }

    Ok(())
}

/// Validates a domain pattern (supports a leading "*." wildcard)
fn validate_domain_pattern(pattern: &str) -> Result<(), ConfigError> {
    let domain = pattern.strip_prefix("*.").unwrap_or(pattern);

    if domain.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Domain pattern cannot be empty".to_string(),
        ));
    }

    if !domain
        .chars()
        .all(|c| c.is_alphanumeric() || c == '.' || c == '-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' contains invalid characters",
            domain
        )));
    }

    if domain.starts_with('.')
        || domain.ends_with('.')
        || domain.starts_with('-')
        || domain.ends_with('-')
        || domain.contains("..")
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' is malformed",
            domain
        )));
    }

    Ok(())
}
