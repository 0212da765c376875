//! Configuration module for Recipe-Harvest
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use recipe_harvest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! println!("Crawl delay: {}ms", config.fetch.min_delay_ms);
//! ```

mod parser;
mod types;
mod validation;

pub use types::{
    CheckpointConfig, Config, CorruptCheckpointPolicy, FetchConfig, OutputConfig, RunConfig,
    SiteConfig, ValidationConfig,
};

pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::validate;
