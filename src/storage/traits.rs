//! Storage traits and error types

use crate::extract::NormalizedRecord;
use crate::storage::{RunRecord, RunStatus};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Record has no slug: {0}")]
    MissingSlug(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// What an upsert did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// The record was new and has been written with all its parts
    Created,
    /// A record with the same slug already existed; nothing was written
    AlreadyExists,
}

/// Persistence capability the pipeline writes recipes through
///
/// Records are identified by their slug. Upserts are idempotent: storing the
/// same slug twice never creates a second record.
pub trait RecipeStore {
    // ===== Recipes =====

    /// Checks whether a recipe with this slug is stored
    fn exists(&self, slug: &str) -> StorageResult<bool>;

    /// Stores a recipe and all its parts in one transaction
    fn upsert_recipe(&mut self, record: &NormalizedRecord) -> StorageResult<UpsertOutcome>;

    /// Total number of stored recipes
    fn count_recipes(&self) -> StorageResult<u64>;

    // ===== Run Management =====

    /// Records the start of a harvest run
    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64>;

    /// Sets a run's final status and finish timestamp
    fn finish_run(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()>;

    /// Gets the most recent run
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;
}
