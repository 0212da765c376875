use serde::Deserialize;

/// Main configuration structure for Recipe-Harvest
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub site: SiteConfig,
    pub fetch: FetchConfig,
    #[serde(default)]
    pub validation: ValidationConfig,
    #[serde(default)]
    pub checkpoint: CheckpointConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub run: RunConfig,
}

/// Target site description
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// Root URL of the site; robots.txt is fetched from here
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Domain pattern recipes are expected to come from (e.g., "*.example.com")
    #[serde(rename = "expected-domain")]
    pub expected_domain: String,

    /// Root sitemap document (may be a sitemap index)
    #[serde(rename = "sitemap-url", default)]
    pub sitemap_url: Option<String>,

    /// Category landing pages to scan for recipe links
    #[serde(rename = "category-urls", default)]
    pub category_urls: Vec<String>,

    /// First path segments that hold recipes; empty accepts any section
    #[serde(default)]
    pub sections: Vec<String>,
}

/// Throttled fetch client behavior
#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    /// Minimum time between consecutive requests (milliseconds)
    #[serde(rename = "min-delay-ms")]
    pub min_delay_ms: u64,

    /// Maximum attempts for a single URL, including the first one
    #[serde(rename = "max-attempts", default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Base of the exponential backoff, in seconds (wait = base^attempt)
    #[serde(rename = "backoff-base", default = "default_backoff_base")]
    pub backoff_base: f64,

    /// Per-request timeout (seconds)
    #[serde(rename = "timeout-secs", default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// User agent strings, rotated per request
    #[serde(rename = "user-agents")]
    pub user_agents: Vec<String>,

    /// Whether robots.txt rules are applied
    #[serde(rename = "respect-robots", default = "default_true")]
    pub respect_robots: bool,
}

/// Record validation behavior
#[derive(Debug, Clone, Deserialize)]
pub struct ValidationConfig {
    /// Treat every warning as an error
    #[serde(default)]
    pub strict: bool,

    #[serde(rename = "require-ingredients", default = "default_true")]
    pub require_ingredients: bool,

    #[serde(rename = "require-instructions", default = "default_true")]
    pub require_instructions: bool,

    #[serde(rename = "min-calories", default)]
    pub min_calories: f64,

    #[serde(rename = "max-calories", default = "default_max_calories")]
    pub max_calories: f64,

    /// Persist records that failed validation in non-strict mode
    #[serde(rename = "continue-on-error", default = "default_true")]
    pub continue_on_error: bool,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            strict: false,
            require_ingredients: true,
            require_instructions: true,
            min_calories: 0.0,
            max_calories: default_max_calories(),
            continue_on_error: true,
        }
    }
}

/// What to do when a checkpoint file exists but cannot be read back
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CorruptCheckpointPolicy {
    /// Abort the run
    #[default]
    Fail,
    /// Log, delete the file, and start a new session
    Discard,
}

/// Checkpoint persistence configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CheckpointConfig {
    /// Path to the JSON snapshot
    #[serde(default = "default_checkpoint_path")]
    pub path: String,

    /// Save automatically after this many mark operations
    #[serde(rename = "autosave-interval", default = "default_autosave_interval")]
    pub autosave_interval: u32,

    #[serde(rename = "on-corrupt", default)]
    pub on_corrupt: CorruptCheckpointPolicy,
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            path: default_checkpoint_path(),
            autosave_interval: default_autosave_interval(),
            on_corrupt: CorruptCheckpointPolicy::default(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}

/// Run loop configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RunConfig {
    /// Log a progress line every N targets
    #[serde(rename = "progress-interval", default = "default_progress_interval")]
    pub progress_interval: u32,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            progress_interval: default_progress_interval(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_base() -> f64 {
    2.0
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_calories() -> f64 {
    5000.0
}

fn default_checkpoint_path() -> String {
    "./harvest-checkpoint.json".to_string()
}

fn default_autosave_interval() -> u32 {
    10
}

fn default_progress_interval() -> u32 {
    10
}
