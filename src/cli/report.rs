//! Machine-readable run report.

use crate::checks::DisabledCheck;
use crate::core::check::RunResult;
use crate::core::error::{Error, Result};
use chrono::{DateTime, Local};
use serde::Serialize;
use std::time::Duration;

/// Outcome of a whole `run` invocation, serialized as JSON.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    /// When the run started (RFC 3339).
    pub started_at: String,
    /// True if no check failed and the run was not interrupted.
    pub success: bool,
    /// True if the run was cancelled before finishing.
    pub interrupted: bool,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: u64,
    /// Checks that passed, across categories.
    pub passed: usize,
    /// Checks that failed, across categories.
    pub failed: usize,
    /// Per-category results, in run order.
    pub categories: Vec<CategoryReport>,
}

/// Results for one category.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryReport {
    /// Category name.
    pub name: String,
    /// Checks that passed.
    pub passed: usize,
    /// Checks that failed.
    pub failed: usize,
    /// Checks selected to run.
    pub total: usize,
    /// Checks that never ran because of an early stop.
    pub not_run: usize,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: u64,
    /// Per-check results, in configuration order.
    pub checks: Vec<CheckReport>,
    /// Checks skipped by their enabling condition.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<SkippedReport>,
}

/// Result of one check.
#[derive(Debug, Clone, Serialize)]
pub struct CheckReport {
    /// Check name.
    pub name: String,
    /// `success` or `failure`.
    pub status: &'static str,
    /// Failure message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Duration in milliseconds.
    pub duration_ms: u64,
}

/// A check skipped by its enabling condition.
#[derive(Debug, Clone, Serialize)]
pub struct SkippedReport {
    /// Check name.
    pub name: String,
    /// Why it was skipped.
    pub reason: String,
}

impl Report {
    /// Starts an empty report.
    #[must_use]
    pub fn new(started_at: DateTime<Local>) -> Self {
        Self {
            started_at: started_at.to_rfc3339(),
            success: true,
            interrupted: false,
            duration_ms: 0,
            passed: 0,
            failed: 0,
            categories: Vec::new(),
        }
    }

    /// Adds the results of one category.
    pub fn add_category(&mut self, name: &str, result: &RunResult, disabled: &[DisabledCheck]) {
        self.passed += result.passed;
        self.failed += result.failed;
        if !result.success() {
            self.success = false;
        }

        self.categories.push(CategoryReport {
            name: name.to_string(),
            passed: result.passed,
            failed: result.failed,
            total: result.total,
            not_run: result.not_run(),
            duration_ms: millis(result.duration),
            checks: result
                .checks
                .iter()
                .map(|c| CheckReport {
                    name: c.name.clone(),
                    status: c.status.as_str(),
                    error: c.error.as_ref().map(ToString::to_string),
                    duration_ms: millis(c.duration),
                })
                .collect(),
            skipped: disabled
                .iter()
                .map(|d| SkippedReport {
                    name: d.name.clone(),
                    reason: d.reason.clone(),
                })
                .collect(),
        });
    }

    /// Records the end of the run.
    pub fn finish(&mut self, duration: Duration, interrupted: bool) {
        self.duration_ms = millis(duration);
        self.interrupted = interrupted;
        if interrupted {
            self.success = false;
        }
    }

    /// Renders the report as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::Internal {
            message: format!("Failed to serialize report: {e}"),
        })
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
