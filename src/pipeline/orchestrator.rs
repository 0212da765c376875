//! Pipeline orchestrator - one end-to-end harvest run
//!
//! This module contains the main run loop that coordinates:
//! - Resolving targets (discovery, explicit list, or checkpoint resume)
//! - Fetching, extracting, validating and persisting each target
//! - Isolating per-target failures
//! - Checkpoint marks, progress logging and cancellation

use crate::checkpoint::CheckpointStore;
use crate::config::{Config, CorruptCheckpointPolicy};
use crate::discovery::Discoverer;
use crate::extract::{normalize_recipe, HtmlRecipeExtractor, PageExtractor};
use crate::fetch::ThrottledClient;
use crate::pipeline::outcome::{FailureKind, TargetFailure, TargetOutcome};
use crate::pipeline::stats::RunStats;
use crate::storage::{RecipeStore, RunStatus, UpsertOutcome};
use crate::url::{normalize_url, slug_from_url};
use crate::validate::Validator;
use crate::{CheckpointError, DiscoveryError, FetchError, HarvestError};
use std::collections::{BTreeMap, HashSet};
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// Where a fresh run gets its targets from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetSource {
    /// Run the discovery strategies
    Discover {
        use_sitemap: bool,
        use_categories: bool,
    },
    /// Use exactly these URLs
    Explicit(Vec<String>),
}

impl TargetSource {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Discover { .. } => "discovery",
            Self::Explicit(_) => "explicit",
        }
    }
}

/// Parameters for one run
#[derive(Debug, Clone)]
pub struct RunRequest {
    /// Used when there is no session to resume
    pub source: TargetSource,
    /// Continue the saved checkpoint session if one exists
    pub resume: bool,
    /// Process at most this many targets
    pub limit: Option<usize>,
}

/// Main pipeline coordinator structure
pub struct Orchestrator<S: RecipeStore> {
    client: ThrottledClient,
    discoverer: Discoverer,
    extractor: Box<dyn PageExtractor>,
    validator: Validator,
    store: S,
    checkpoint: CheckpointStore,
    on_corrupt: CorruptCheckpointPolicy,
    progress_interval: usize,
    config_hash: String,
    cancel: CancellationToken,
}

impl<S: RecipeStore> Orchestrator<S> {
    /// Wires the pipeline from configuration
    ///
    /// The client is shared with discovery, so both use one pacing clock.
    pub fn new(config: &Config, client: ThrottledClient, store: S) -> Self {
        let validator = Validator::new(config.validation.clone())
            .with_expected_domain(config.site.expected_domain.clone());

        Self {
            discoverer: Discoverer::new(client.clone(), &config.site),
            client,
            extractor: Box::new(HtmlRecipeExtractor),
            validator,
            store,
            checkpoint: CheckpointStore::from_config(&config.checkpoint),
            on_corrupt: config.checkpoint.on_corrupt,
            progress_interval: config.run.progress_interval.max(1) as usize,
            config_hash: String::new(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_extractor(mut self, extractor: Box<dyn PageExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validator = validator;
        self
    }

    pub fn with_checkpoint(mut self, checkpoint: CheckpointStore) -> Self {
        self.checkpoint = checkpoint;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Stored in checkpoint metadata and on the run record
    pub fn with_config_hash(mut self, hash: impl Into<String>) -> Self {
        self.config_hash = hash.into();
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn checkpoint(&self) -> &CheckpointStore {
        &self.checkpoint
    }

    /// Produces the ordered target list for a fresh session
    ///
    /// Explicit URLs are normalized and deduplicated; ones that fail to
    /// normalize are dropped with a warning.
    pub async fn resolve_targets(&self, source: &TargetSource) -> Result<Vec<String>, HarvestError> {
        match source {
            TargetSource::Discover {
                use_sitemap,
                use_categories,
            } => {
                let candidates = self
                    .discoverer
                    .discover_all(*use_sitemap, *use_categories)
                    .await?;
                Ok(candidates.into_vec())
            }
            TargetSource::Explicit(urls) => {
                let mut seen = HashSet::new();
                let mut targets = Vec::new();
                for raw in urls {
                    match normalize_url(raw) {
                        Ok(url) => {
                            let url = url.to_string();
                            if seen.insert(url.clone()) {
                                targets.push(url);
                            }
                        }
                        Err(e) => tracing::warn!("Ignoring target {}: {}", raw, e),
                    }
                }
                Ok(targets)
            }
        }
    }

    /// Runs the pipeline over every pending target
    ///
    /// Per-target failures are recorded, never returned. Errors here mean the
    /// run could not start or its checkpoint could not be written.
    pub async fn run(&mut self, request: RunRequest) -> Result<RunStats, HarvestError> {
        let started = Instant::now();

        if self.client.respects_robots() {
            self.client.load_robots().await;
        }

        let targets = match self.prepare_session(&request).await {
            Ok(targets) => targets,
            Err(HarvestError::Discovery(DiscoveryError::Cancelled)) => {
                tracing::warn!("Run interrupted during discovery; no session was created");
                let mut stats = RunStats::new(0);
                stats.interrupted = true;
                stats.elapsed = started.elapsed();
                return Ok(stats);
            }
            Err(e) => return Err(e),
        };
        let mut stats = RunStats::new(targets.len());
        let run_id = self.store.create_run(&self.config_hash)?;

        tracing::info!("Starting harvest run {} over {} targets", run_id, targets.len());

        if let Err(e) = self.drive(&targets, &mut stats, started).await {
            tracing::error!("Run {} aborted: {}", run_id, e);
            self.store.finish_run(run_id, RunStatus::Failed)?;
            return Err(e);
        }

        stats.elapsed = started.elapsed();

        if stats.interrupted {
            self.checkpoint.save()?;
            self.store.finish_run(run_id, RunStatus::Interrupted)?;
            tracing::warn!(
                "Run interrupted after {} targets; checkpoint saved to {}",
                stats.processed(),
                self.checkpoint.path().display()
            );
        } else {
            self.checkpoint.finish()?;
            self.store.finish_run(run_id, RunStatus::Completed)?;
            tracing::info!(
                "Run completed: {} stored, {} skipped, {} failed in {:?}",
                stats.success,
                stats.skipped,
                stats.failed,
                stats.elapsed
            );
        }

        Ok(stats)
    }

    /// Processes targets in order until done or cancelled
    async fn drive(
        &mut self,
        targets: &[String],
        stats: &mut RunStats,
        started: Instant,
    ) -> Result<(), HarvestError> {
        for (index, url) in targets.iter().enumerate() {
            if self.cancel.is_cancelled() {
                stats.interrupted = true;
                break;
            }

            let outcome = self.process_target(url).await;
            stats.record(&outcome);

            if outcome.is_failure() {
                self.checkpoint.mark_failure(url)?;
            } else if outcome.is_success() {
                self.checkpoint.mark_success(url)?;
            } else {
                break;
            }

            let done = index + 1;
            if done % self.progress_interval == 0 {
                let elapsed = started.elapsed().as_secs_f64();
                let rate = if elapsed > 0.0 { done as f64 / elapsed } else { 0.0 };
                tracing::info!(
                    "Progress: {}/{} targets ({} stored, {} skipped, {} failed), {:.2} targets/sec",
                    done,
                    stats.total,
                    stats.success,
                    stats.skipped,
                    stats.failed,
                    rate
                );
            }
        }

        Ok(())
    }

    /// Processes one target, turning any failure into an outcome
    pub async fn process_target(&mut self, url: &str) -> TargetOutcome {
        match self.try_process(url).await {
            Ok(outcome) => {
                tracing::debug!("{} -> {:?}", url, outcome);
                outcome
            }
            Err(failure) => {
                tracing::warn!("Failed {}: {}", url, failure);
                TargetOutcome::Failed(failure)
            }
        }
    }

    async fn try_process(&mut self, url: &str) -> Result<TargetOutcome, TargetFailure> {
        let slug = slug_from_url(url)
            .ok_or_else(|| TargetFailure::new(FailureKind::NoSlug, url))?;

        if self.store.exists(&slug)? {
            tracing::debug!("Skipping {}: already stored as {}", url, slug);
            return Ok(TargetOutcome::Skipped);
        }

        let attempts = self.client.max_attempts();
        let document = match self.client.fetch_with_retry(url, attempts).await {
            Ok(Some(doc)) => doc,
            Ok(None) => {
                return Err(TargetFailure::new(
                    FailureKind::RetriesExhausted,
                    format!("gave up after {} attempts", attempts),
                ))
            }
            Err(FetchError::Cancelled { .. }) => return Ok(TargetOutcome::Interrupted),
            Err(e) => return Err(e.into()),
        };

        let raw = self
            .extractor
            .extract(&document)
            .map_err(|message| TargetFailure::new(FailureKind::Extraction, message))?;
        let record = normalize_recipe(&raw, url);

        let validation = self.validator.validate(&record);
        for warning in &validation.warnings {
            tracing::debug!("{}: {}", url, warning);
        }

        if !validation.valid {
            if self.validator.continue_on_error() && !self.validator.is_strict() {
                tracing::warn!(
                    "Storing {} despite validation errors: {}",
                    url,
                    validation.error_summary()
                );
            } else {
                return Err(TargetFailure::new(
                    FailureKind::Validation,
                    validation.error_summary(),
                ));
            }
        }

        Ok(match self.store.upsert_recipe(&record)? {
            UpsertOutcome::Created if !validation.valid => TargetOutcome::StoredInvalid,
            UpsertOutcome::Created => TargetOutcome::Stored,
            UpsertOutcome::AlreadyExists => TargetOutcome::Skipped,
        })
    }

    /// Loads or creates the checkpoint session and returns the targets to process
    async fn prepare_session(&mut self, request: &RunRequest) -> Result<Vec<String>, HarvestError> {
        if request.resume {
            if let Some(mut pending) = self.load_resumable()? {
                if let Some(limit) = request.limit {
                    pending.truncate(limit);
                }
                return Ok(pending);
            }
            tracing::info!("No resumable checkpoint found, starting a new session");
        } else if self.checkpoint.exists() {
            tracing::info!(
                "Discarding previous checkpoint {}",
                self.checkpoint.path().display()
            );
            self.checkpoint.discard()?;
        }

        let mut targets = self.resolve_targets(&request.source).await?;
        if let Some(limit) = request.limit {
            targets.truncate(limit);
        }

        let metadata = BTreeMap::from([
            ("config_hash".to_string(), self.config_hash.clone()),
            ("source".to_string(), request.source.label().to_string()),
        ]);
        let session = self.checkpoint.create_session(targets, metadata)?;
        Ok(session.pending().to_vec())
    }

    /// Pending targets of a saved, unfinished session
    fn load_resumable(&mut self) -> Result<Option<Vec<String>>, HarvestError> {
        let loaded = self.checkpoint.load().map(|session| {
            session.map(|s| {
                (
                    s.is_complete(),
                    s.pending().to_vec(),
                    s.metadata().get("config_hash").cloned(),
                )
            })
        });

        let loaded = match loaded {
            Ok(loaded) => loaded,
            Err(e @ (CheckpointError::Corrupt { .. } | CheckpointError::UnsupportedVersion(_)))
                if self.on_corrupt == CorruptCheckpointPolicy::Discard =>
            {
                tracing::warn!("Discarding unreadable checkpoint: {}", e);
                self.checkpoint.discard()?;
                None
            }
            Err(e) => return Err(e.into()),
        };

        let Some((complete, pending, hash)) = loaded else {
            return Ok(None);
        };

        if complete {
            tracing::info!("Saved checkpoint is already complete");
            self.checkpoint.discard()?;
            return Ok(None);
        }

        if hash.as_deref().is_some_and(|h| h != self.config_hash) {
            tracing::warn!("Configuration changed since the checkpoint was written");
        }

        tracing::info!("Resuming with {} pending targets", pending.len());
        Ok(Some(pending))
    }
}
