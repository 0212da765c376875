//! Pipeline orchestration
//!
//! Drives one harvest run: resolve targets, then fetch, extract, validate and
//! persist each one while keeping the checkpoint and run statistics current.

mod orchestrator;
mod outcome;
mod stats;

pub use orchestrator::{Orchestrator, RunRequest, TargetSource};
pub use outcome::{FailureKind, TargetFailure, TargetOutcome};
pub use stats::{print_summary, RunStats};
