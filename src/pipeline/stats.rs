//! Run statistics
//!
//! Counts what happened to every target in a run and prints a summary at the
//! end, including a breakdown of failures by kind.

use crate::pipeline::outcome::{FailureKind, TargetOutcome};
use std::collections::BTreeMap;
use std::time::Duration;

/// Run statistics summary
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunStats {
    /// Targets resolved for this run
    pub total: usize,

    /// Records stored (including those stored despite validation errors)
    pub success: usize,

    /// Targets that ended in a failure
    pub failed: usize,

    /// Targets already present in storage
    pub skipped: usize,

    /// Records that failed validation, whether stored or not
    pub validation_errors: usize,

    /// Failure counts keyed by kind
    pub failures_by_kind: BTreeMap<FailureKind, usize>,

    /// True if the run was cancelled before every target was processed
    pub interrupted: bool,

    pub elapsed: Duration,
}

impl RunStats {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            ..Default::default()
        }
    }

    /// Targets that reached a terminal outcome
    pub fn processed(&self) -> usize {
        self.success + self.failed + self.skipped
    }

    /// Targets per second over the elapsed time
    pub fn rate(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.processed() as f64 / secs
        } else {
            0.0
        }
    }

    pub fn record(&mut self, outcome: &TargetOutcome) {
        match outcome {
            TargetOutcome::Stored => self.success += 1,
            TargetOutcome::StoredInvalid => {
                self.success += 1;
                self.validation_errors += 1;
            }
            TargetOutcome::Skipped => self.skipped += 1,
            TargetOutcome::Failed(failure) => {
                self.failed += 1;
                if failure.kind == FailureKind::Validation {
                    self.validation_errors += 1;
                }
                *self.failures_by_kind.entry(failure.kind).or_insert(0) += 1;
            }
            TargetOutcome::Interrupted => self.interrupted = true,
        }
    }
}

/// Prints run statistics to stdout in a formatted manner
pub fn print_summary(stats: &RunStats) {
    println!("=== Harvest Summary ===\n");

    if stats.interrupted {
        println!("Status: interrupted (resume with --resume)");
    } else {
        println!("Status: completed");
    }
    println!();

    println!("Overview:");
    println!("  Total targets: {}", stats.total);
    println!("  Stored: {}", stats.success);
    println!("  Skipped (already stored): {}", stats.skipped);
    println!("  Failed: {}", stats.failed);
    println!("  Validation errors: {}", stats.validation_errors);
    println!(
        "  Elapsed: {:.1}s ({:.2} targets/sec)",
        stats.elapsed.as_secs_f64(),
        stats.rate()
    );
    println!();

    if !stats.failures_by_kind.is_empty() {
        println!("Failures by Kind:");
        let mut counts: Vec<_> = stats.failures_by_kind.iter().collect();
        counts.sort_by(|a, b| b.1.cmp(a.1).then(a.0.cmp(b.0)));

        for (kind, count) in counts {
            println!("  {}: {}", kind, count);
        }
        println!();
    }

    let success_rate = if stats.processed() > 0 {
        ((stats.success + stats.skipped) as f64 / stats.processed() as f64) * 100.0
    } else {
        0.0
    };
    println!("Success Rate: {:.1}%", success_rate);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::outcome::TargetFailure;

    #[test]
    fn test_record_outcomes() {
        let mut stats = RunStats::new(6);
        stats.record(&TargetOutcome::Stored);
        stats.record(&TargetOutcome::StoredInvalid);
        stats.record(&TargetOutcome::Skipped);
        stats.record(&TargetOutcome::Failed(TargetFailure::new(
            FailureKind::Timeout,
            "slow",
        )));
        stats.record(&TargetOutcome::Failed(TargetFailure::new(
            FailureKind::Validation,
            "bad",
        )));
        stats.record(&TargetOutcome::Failed(TargetFailure::new(
            FailureKind::Timeout,
            "slow",
        )));

        assert_eq!(stats.success, 2);
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.failed, 3);
        assert_eq!(stats.validation_errors, 2);
        assert_eq!(stats.failures_by_kind.get(&FailureKind::Timeout), Some(&2));
        assert_eq!(stats.processed(), 6);
        assert!(!stats.interrupted);
    }

    #[test]
    fn test_interrupted_flag() {
        let mut stats = RunStats::new(1);
        stats.record(&TargetOutcome::Interrupted);
        assert!(stats.interrupted);
        assert_eq!(stats.processed(), 0);
    }
}
