//! Output contract consumed by the runner.
//!
//! The runner never writes to the terminal itself; every user-visible line
//! goes through a [`Printer`]. Calls are made synchronously from the task
//! that drives [`Runner::run`](crate::core::runner::Runner::run), never from
//! worker tasks.

use crate::core::check::CheckStatus;

/// Receives everything the runner wants to show to a user.
pub trait Printer: Send + Sync {
    /// Announces a group of checks.
    fn category_header(&self, name: &str);

    /// Announces a single check before (sequential) or ahead of (parallel)
    /// its execution.
    fn check_header(&self, name: &str);

    /// Reports a passing check.
    fn check_success(&self, message: &str);

    /// Reports a failing check with the text to show and an optional fix.
    fn check_failure(&self, message: &str, details: &str, remediation: &str);

    /// Reports the outcome of the whole run; `names` lists failing checks.
    fn check_summary(&self, status: CheckStatus, message: &str, names: &[String]);
}

/// A printer that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullPrinter;

impl Printer for NullPrinter {
    fn category_header(&self, _name: &str) {}

    fn check_header(&self, _name: &str) {}

    fn check_success(&self, _message: &str) {}

    fn check_failure(&self, _message: &str, _details: &str, _remediation: &str) {}

    fn check_summary(&self, _status: CheckStatus, _message: &str, _names: &[String]) {}
}
