//! Recipe-Harvest main entry point
//!
//! This is the command-line interface for the recipe harvesting pipeline.

use anyhow::{bail, Context};
use clap::Parser;
use recipe_harvest::checkpoint::read_snapshot;
use recipe_harvest::config::{load_config_with_hash, Config};
use recipe_harvest::discovery::Discoverer;
use recipe_harvest::pipeline::{print_summary, Orchestrator, RunRequest, TargetSource};
use recipe_harvest::storage::{open_storage, RecipeStore};
use recipe_harvest::ThrottledClient;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Recipe-Harvest: a polite, resumable recipe harvester
///
/// Recipe-Harvest discovers recipe pages on a site via its sitemap and
/// category pages, fetches them under robots.txt and crawl-delay rules,
/// extracts structured recipes, validates them and stores them in SQLite.
/// Interrupted runs resume from a checkpoint file.
#[derive(Parser, Debug)]
#[command(name = "recipe-harvest")]
#[command(version = "1.0.0")]
#[command(about = "A polite, resumable recipe harvester", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Process at most N targets
    #[arg(long, value_name = "N")]
    limit: Option<usize>,

    /// Override the minimum delay between requests
    #[arg(long, value_name = "MS")]
    delay_ms: Option<u64>,

    /// Resume an interrupted run (default behavior)
    #[arg(long, conflicts_with = "fresh")]
    resume: bool,

    /// Start a fresh run, discarding any saved checkpoint
    #[arg(long, conflicts_with = "resume")]
    fresh: bool,

    /// Harvest these URLs instead of running discovery
    #[arg(long, value_name = "URL", num_args = 1..)]
    urls: Vec<String>,

    /// Read target URLs from a file, one per line
    #[arg(long, value_name = "PATH")]
    urls_file: Option<PathBuf>,

    /// Skip the sitemap discovery strategy
    #[arg(long)]
    no_sitemap: bool,

    /// Skip the category-page discovery strategy
    #[arg(long)]
    no_categories: bool,

    /// Treat validation warnings as errors
    #[arg(long)]
    strict: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be harvested without fetching
    #[arg(long, conflicts_with_all = ["stats", "discover_only"])]
    dry_run: bool,

    /// Show statistics from the database and checkpoint, then exit
    #[arg(long, conflicts_with_all = ["dry_run", "discover_only"])]
    stats: bool,

    /// Run discovery only and print the candidate URLs
    #[arg(long, conflicts_with_all = ["dry_run", "stats"])]
    discover_only: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if let Some(delay) = cli.delay_ms {
        config.fetch.min_delay_ms = delay;
    }
    if cli.strict {
        config.validation.strict = true;
    }

    let source = target_source(&cli, &config)?;

    if cli.dry_run {
        handle_dry_run(&config, &source);
    } else if cli.stats {
        handle_stats(&config)?;
    } else if cli.discover_only {
        handle_discover_only(&config, &cli).await?;
    } else {
        return handle_run(config, config_hash, source, &cli).await;
    }

    Ok(ExitCode::SUCCESS)
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("recipe_harvest=info,warn"),
            1 => EnvFilter::new("recipe_harvest=debug,info"),
            2 => EnvFilter::new("recipe_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Explicit URLs win over discovery
fn target_source(cli: &Cli, config: &Config) -> anyhow::Result<TargetSource> {
    let mut urls = cli.urls.clone();
    if let Some(path) = &cli.urls_file {
        urls.extend(read_url_file(path)?);
    }

    if !urls.is_empty() {
        return Ok(TargetSource::Explicit(urls));
    }

    let use_sitemap = !cli.no_sitemap && config.site.sitemap_url.is_some();
    let use_categories = !cli.no_categories && !config.site.category_urls.is_empty();
    if !use_sitemap && !use_categories {
        bail!("no target source: pass --urls/--urls-file or configure sitemap-url or category-urls");
    }

    Ok(TargetSource::Discover {
        use_sitemap,
        use_categories,
    })
}

/// One URL per line; blank lines and `#` comments are ignored
fn read_url_file(path: &Path) -> anyhow::Result<Vec<String>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read URL file {}", path.display()))?;

    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect())
}

/// Handles the --dry-run mode: shows what a run would do
fn handle_dry_run(config: &Config, source: &TargetSource) {
    println!("=== Recipe-Harvest Dry Run ===\n");

    println!("Site:");
    println!("  Base URL: {}", config.site.base_url);
    println!("  Expected domain: {}", config.site.expected_domain);
    if !config.site.sections.is_empty() {
        println!("  Sections: {}", config.site.sections.join(", "));
    }

    println!("\nFetch:");
    println!("  Minimum delay: {}ms", config.fetch.min_delay_ms);
    println!("  Max attempts: {}", config.fetch.max_attempts);
    println!("  Backoff base: {}", config.fetch.backoff_base);
    println!("  Timeout: {}s", config.fetch.timeout_secs);
    println!("  User agents: {}", config.fetch.user_agents.len());
    println!("  Respect robots.txt: {}", config.fetch.respect_robots);

    println!("\nValidation:");
    println!("  Strict: {}", config.validation.strict);
    println!("  Continue on error: {}", config.validation.continue_on_error);

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);
    println!("  Checkpoint: {}", config.checkpoint.path);

    match source {
        TargetSource::Explicit(urls) => {
            println!("\nExplicit Targets ({}):", urls.len());
            for url in urls {
                println!("  - {}", url);
            }
        }
        TargetSource::Discover {
            use_sitemap,
            use_categories,
        } => {
            println!("\nDiscovery:");
            if *use_sitemap {
                if let Some(sitemap) = &config.site.sitemap_url {
                    println!("  Sitemap: {}", sitemap);
                }
            }
            if *use_categories {
                println!("  Category pages ({}):", config.site.category_urls.len());
                for url in &config.site.category_urls {
                    println!("    * {}", url);
                }
            }
        }
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the --stats mode: shows database and checkpoint status
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}\n", config.output.database_path);

    let store = open_storage(Path::new(&config.output.database_path))?;
    println!("Recipes stored: {}", store.count_recipes()?);

    if let Some(run) = store.get_latest_run()? {
        println!(
            "Latest run: #{} {} (started {}, finished {})",
            run.id,
            run.status.to_db_string(),
            run.started_at,
            run.finished_at.as_deref().unwrap_or("-")
        );
    }

    match read_snapshot(Path::new(&config.checkpoint.path)) {
        Ok(Some(session)) => println!(
            "Checkpoint: session {} with {} pending, {} processed, {} failed of {}",
            session.session_id(),
            session.pending().len(),
            session.success_count(),
            session.failure_count(),
            session.total_count()
        ),
        Ok(None) => println!("Checkpoint: none"),
        Err(e) => println!("Checkpoint: unreadable ({})", e),
    }

    Ok(())
}

/// Handles the --discover-only mode: prints candidate URLs
async fn handle_discover_only(config: &Config, cli: &Cli) -> anyhow::Result<()> {
    let client = ThrottledClient::new(&config.fetch, &config.site.base_url)?;
    if client.respects_robots() {
        client.load_robots().await;
    }

    let use_sitemap = !cli.no_sitemap && config.site.sitemap_url.is_some();
    let use_categories = !cli.no_categories;

    let discoverer = Discoverer::new(client, &config.site);
    let candidates = discoverer.discover_all(use_sitemap, use_categories).await?;

    for url in candidates.iter().take(cli.limit.unwrap_or(usize::MAX)) {
        println!("{}", url);
    }
    tracing::info!("{} candidate URLs", candidates.len());

    Ok(())
}

/// Handles the main harvest run
async fn handle_run(
    config: Config,
    config_hash: String,
    source: TargetSource,
    cli: &Cli,
) -> anyhow::Result<ExitCode> {
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupt received; stopping after the current target");
                cancel.cancel();
            }
        });
    }

    let client =
        ThrottledClient::new(&config.fetch, &config.site.base_url)?.with_cancellation(cancel.clone());
    let store = open_storage(Path::new(&config.output.database_path))?;

    if cli.fresh {
        tracing::info!("Starting fresh run (ignoring previous checkpoint)");
    } else {
        tracing::info!("Starting run (will resume if a checkpoint exists)");
    }

    let mut orchestrator = Orchestrator::new(&config, client, store)
        .with_cancellation(cancel)
        .with_config_hash(config_hash);

    let request = RunRequest {
        source,
        resume: !cli.fresh,
        limit: cli.limit,
    };

    let stats = match orchestrator.run(request).await {
        Ok(stats) => stats,
        Err(e) => {
            tracing::error!("Run failed: {}", e);
            return Err(e.into());
        }
    };

    print_summary(&stats);

    Ok(if stats.interrupted {
        ExitCode::from(130)
    } else {
        ExitCode::SUCCESS
    })
}
