//! Terminal output for runs.

use crate::core::check::CheckStatus;
use crate::core::printer::Printer;
use console::style;
use std::fmt;
use std::io::Write;
use std::sync::{Mutex, PoisonError};

/// Lines of failure details shown per check.
const MAX_DETAIL_LINES: usize = 20;

/// Prints run progress as styled lines, to stderr by default.
pub struct ConsolePrinter {
    out: Mutex<Box<dyn Write + Send>>,
}

impl ConsolePrinter {
    /// Creates a printer writing to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self::new(Box::new(std::io::stderr()))
    }

    /// Creates a printer writing to `out`.
    #[must_use]
    pub fn new(out: Box<dyn Write + Send>) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    /// Reports a configured check that was skipped.
    pub fn check_skipped(&self, name: &str, reason: &str) {
        self.line(format_args!(
            "  {} {} {}",
            style("○").for_stderr().dim(),
            name,
            style(format!("(skipped: {reason})")).for_stderr().dim()
        ));
    }

    fn line(&self, args: fmt::Arguments<'_>) {
        let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = writeln!(out, "{args}") {
            tracing::debug!(error = %e, "failed to write output");
        }
    }
}

impl fmt::Debug for ConsolePrinter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsolePrinter").finish_non_exhaustive()
    }
}

impl Printer for ConsolePrinter {
    fn category_header(&self, name: &str) {
        self.line(format_args!(""));
        self.line(format_args!("{}", style(name).for_stderr().bold()));
    }

    fn check_header(&self, name: &str) {
        self.line(format_args!("  {} {}", style("•").for_stderr().cyan(), name));
    }

    fn check_success(&self, message: &str) {
        self.line(format_args!("  {} {}", style("✓").for_stderr().green(), message));
    }

    fn check_failure(&self, message: &str, details: &str, remediation: &str) {
        self.line(format_args!("  {} {}", style("✗").for_stderr().red(), message));

        let lines: Vec<&str> = details.lines().collect();
        for line in lines.iter().take(MAX_DETAIL_LINES) {
            self.line(format_args!("      {line}"));
        }
        if lines.len() > MAX_DETAIL_LINES {
            self.line(format_args!(
                "      {}",
                style(format!("... {} more lines", lines.len() - MAX_DETAIL_LINES))
                    .for_stderr()
                    .dim()
            ));
        }

        if !remediation.is_empty() {
            self.line(format_args!(
                "      {} {}",
                style("Fix:").for_stderr().yellow(),
                remediation
            ));
        }
    }

    fn check_summary(&self, status: CheckStatus, message: &str, names: &[String]) {
        match status {
            CheckStatus::Success => {
                self.line(format_args!("{} {}", style("✓").for_stderr().green().bold(), message));
            },
            CheckStatus::Failure => {
                self.line(format_args!("{} {}", style("✗").for_stderr().red().bold(), message));
                if !names.is_empty() {
                    self.line(format_args!(
                        "  {} {}",
                        style("Failed:").for_stderr().red(),
                        names.join(", ")
                    ));
                }
            },
        }
    }
}
