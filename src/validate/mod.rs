//! Record validation
//!
//! Every problem found in a [`NormalizedRecord`] is classified as an error,
//! which blocks persistence, or a warning, which is informational. Strict mode
//! promotes every warning to an error.

mod rules;

use crate::config::ValidationConfig;
use crate::extract::NormalizedRecord;
use serde::Serialize;
use std::fmt;

/// A single problem found on a record field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    pub field: String,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Outcome of validating one record
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationResult {
    /// Errors joined into one line, for logs and failure messages
    pub fn error_summary(&self) -> String {
        self.errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Collects issues while the rules run
#[derive(Debug, Default)]
pub(crate) struct Report {
    errors: Vec<ValidationIssue>,
    warnings: Vec<ValidationIssue>,
}

impl Report {
    pub(crate) fn error(&mut self, field: &str, message: impl Into<String>) {
        self.errors.push(ValidationIssue::new(field, message));
    }

    pub(crate) fn warning(&mut self, field: &str, message: impl Into<String>) {
        self.warnings.push(ValidationIssue::new(field, message));
    }

    fn finish(mut self, strict: bool) -> ValidationResult {
        if strict {
            self.errors.extend(self.warnings.iter().cloned());
        }
        ValidationResult {
            valid: self.errors.is_empty(),
            errors: self.errors,
            warnings: self.warnings,
        }
    }
}

/// Checks normalized records against structural and range rules
#[derive(Debug, Clone)]
pub struct Validator {
    config: ValidationConfig,
    expected_domain: Option<String>,
}

impl Validator {
    pub fn new(config: ValidationConfig) -> Self {
        Self {
            config,
            expected_domain: None,
        }
    }

    /// Warn when a record's source host does not match this wildcard pattern
    pub fn with_expected_domain(mut self, pattern: impl Into<String>) -> Self {
        self.expected_domain = Some(pattern.into());
        self
    }

    /// Forces strict mode on or off, e.g. from a CLI flag
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.config.strict = strict;
        self
    }

    pub fn is_strict(&self) -> bool {
        self.config.strict
    }

    /// Whether invalid records are still persisted
    pub fn continue_on_error(&self) -> bool {
        self.config.continue_on_error
    }

    /// Runs every rule over the record
    pub fn validate(&self, record: &NormalizedRecord) -> ValidationResult {
        let mut report = Report::default();

        rules::check_name(&record.name, &mut report);
        rules::check_source_url(
            &record.source_url,
            self.expected_domain.as_deref(),
            &mut report,
        );
        rules::check_required_lists(record, &self.config, &mut report);
        rules::check_total_time(record.total_time_minutes, &mut report);
        rules::check_servings(record.servings, &mut report);
        rules::check_nutrition(record.nutrition.as_ref(), &self.config, &mut report);

        let result = report.finish(self.config.strict);
        if !result.valid {
            tracing::debug!(
                "Record {} failed validation: {}",
                record.source_url,
                result.error_summary()
            );
        }
        result
    }
}
