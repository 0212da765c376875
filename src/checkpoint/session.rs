use crate::CheckpointError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// Current on-disk schema version
pub const CHECKPOINT_VERSION: u32 = 1;

/// Progress of one resumable batch run
///
/// Every target is in exactly one of `pending`, `processed` or `failed`, and
/// the counts always equal the set sizes. The only mutations are
/// [`mark_success`](Self::mark_success) and [`mark_failure`](Self::mark_failure),
/// both of which preserve that partition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckpointSession {
    version: u32,
    session_id: String,
    started_at: DateTime<Utc>,
    last_updated: DateTime<Utc>,
    total_count: usize,
    #[serde(rename = "pendingIds")]
    pending: Vec<String>,
    #[serde(rename = "processedIds")]
    processed: BTreeSet<String>,
    #[serde(rename = "failedIds")]
    failed: BTreeSet<String>,
    success_count: usize,
    failure_count: usize,
    #[serde(default)]
    metadata: BTreeMap<String, String>,
}

impl CheckpointSession {
    /// Starts a session with every target pending
    ///
    /// Duplicate ids are dropped, keeping the first occurrence's position.
    pub fn new<I, S>(target_ids: I, metadata: BTreeMap<String, String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = HashSet::new();
        let pending: Vec<String> = target_ids
            .into_iter()
            .map(Into::into)
            .filter(|id| seen.insert(id.clone()))
            .collect();
        let now = Utc::now();

        Self {
            version: CHECKPOINT_VERSION,
            session_id: uuid::Uuid::new_v4().to_string(),
            started_at: now,
            last_updated: now,
            total_count: pending.len(),
            pending,
            processed: BTreeSet::new(),
            failed: BTreeSet::new(),
            success_count: 0,
            failure_count: 0,
            metadata,
        }
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn last_updated(&self) -> DateTime<Utc> {
        self.last_updated
    }

    pub fn total_count(&self) -> usize {
        self.total_count
    }

    /// Targets still to process, in their original order
    pub fn pending(&self) -> &[String] {
        &self.pending
    }

    pub fn processed(&self) -> &BTreeSet<String> {
        &self.processed
    }

    pub fn failed(&self) -> &BTreeSet<String> {
        &self.failed
    }

    pub fn success_count(&self) -> usize {
        self.success_count
    }

    pub fn failure_count(&self) -> usize {
        self.failure_count
    }

    pub fn metadata(&self) -> &BTreeMap<String, String> {
        &self.metadata
    }

    /// Moves a target into `processed`
    ///
    /// A previously failed target may later succeed. Marking an already
    /// processed target again is a no-op.
    pub fn mark_success(&mut self, id: &str) -> Result<(), CheckpointError> {
        self.take(id)?;
        self.processed.insert(id.to_string());
        self.touch();
        Ok(())
    }

    /// Moves a target into `failed`
    pub fn mark_failure(&mut self, id: &str) -> Result<(), CheckpointError> {
        self.take(id)?;
        self.failed.insert(id.to_string());
        self.touch();
        Ok(())
    }

    /// True once nothing is pending
    pub fn is_complete(&self) -> bool {
        self.pending.is_empty()
    }

    /// Checks the partition and count invariants
    pub fn verify(&self) -> Result<(), String> {
        let pending: BTreeSet<&String> = self.pending.iter().collect();
        if pending.len() != self.pending.len() {
            return Err("pending list contains duplicates".to_string());
        }

        if let Some(id) = pending
            .iter()
            .find(|id| self.processed.contains(**id) || self.failed.contains(**id))
        {
            return Err(format!("{} is both pending and finished", id));
        }

        if let Some(id) = self.processed.intersection(&self.failed).next() {
            return Err(format!("{} is both processed and failed", id));
        }

        let sum = self.pending.len() + self.processed.len() + self.failed.len();
        if sum != self.total_count {
            return Err(format!(
                "set sizes sum to {} but totalCount is {}",
                sum, self.total_count
            ));
        }

        if self.success_count != self.processed.len() {
            return Err(format!(
                "successCount {} != processed size {}",
                self.success_count,
                self.processed.len()
            ));
        }

        if self.failure_count != self.failed.len() {
            return Err(format!(
                "failureCount {} != failed size {}",
                self.failure_count,
                self.failed.len()
            ));
        }

        Ok(())
    }

    /// Removes `id` from whichever set holds it
    fn take(&mut self, id: &str) -> Result<(), CheckpointError> {
        if let Some(pos) = self.pending.iter().position(|p| p == id) {
            self.pending.remove(pos);
        } else if !self.failed.remove(id) && !self.processed.remove(id) {
            return Err(CheckpointError::UnknownTarget(id.to_string()));
        }
        Ok(())
    }

    fn touch(&mut self) {
        self.success_count = self.processed.len();
        self.failure_count = self.failed.len();
        self.last_updated = Utc::now();
    }
}
