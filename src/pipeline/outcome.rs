//! Outcomes of processing a single target
//!
//! This module defines how a target can end up after one pass through the
//! fetch, extract, validate and persist stages.

use crate::storage::StorageError;
use crate::FetchError;
use std::fmt;

/// Final result for one target within a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetOutcome {
    // ===== Success States =====
    /// Record was valid and has been stored
    Stored,

    /// Record failed validation but was stored because the run continues on errors
    StoredInvalid,

    /// A record with the same slug was already stored
    Skipped,

    // ===== Error States =====
    /// The target could not be turned into a stored record
    Failed(TargetFailure),

    // ===== Special States =====
    /// The run was cancelled while this target was in flight
    Interrupted,
}

impl TargetOutcome {
    /// Returns true if the target counts as done in the checkpoint
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Stored | Self::StoredInvalid | Self::Skipped)
    }

    /// Returns true if the target should be recorded as failed
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// Why a target failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FailureKind {
    /// Blocked by robots.txt
    Disallowed,

    /// Request timed out on the last attempt
    Timeout,

    /// Connection or transport failure
    Network,

    /// Non-success HTTP status
    HttpStatus,

    /// Every attempt failed with a transient error
    RetriesExhausted,

    /// URL has no path segment to derive a slug from
    NoSlug,

    /// Page held no recognizable recipe
    Extraction,

    /// Record was rejected by the validator
    Validation,

    /// Database write or lookup failed
    Storage,
}

impl FailureKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Disallowed => "disallowed",
            Self::Timeout => "timeout",
            Self::Network => "network",
            Self::HttpStatus => "http_status",
            Self::RetriesExhausted => "retries_exhausted",
            Self::NoSlug => "no_slug",
            Self::Extraction => "extraction",
            Self::Validation => "validation",
            Self::Storage => "storage",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A failed target with a human-readable reason
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl TargetFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for TargetFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl From<FetchError> for TargetFailure {
    fn from(error: FetchError) -> Self {
        let kind = match &error {
            FetchError::Disallowed { .. } => FailureKind::Disallowed,
            FetchError::Timeout { .. } => FailureKind::Timeout,
            FetchError::HttpStatus { .. } => FailureKind::HttpStatus,
            FetchError::Network { .. } | FetchError::Cancelled { .. } => FailureKind::Network,
        };
        Self::new(kind, error.to_string())
    }
}

impl From<StorageError> for TargetFailure {
    fn from(error: StorageError) -> Self {
        Self::new(FailureKind::Storage, error.to_string())
    }
}
