//! Check runner.
//!
//! A [`Runner`] owns an ordered list of [`Check`]s and runs them either one
//! after another on the calling task or on a bounded worker pool. Either way
//! results are reported in the order the checks were added, and a check that
//! errors or panics only ever fails itself.

use crate::core::check::{self, Check, CheckResult, CheckStatus, RunResult};
use crate::core::context::Context;
use crate::core::error::BoxError;
use crate::core::pool;
use crate::core::printer::Printer;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Execution settings for a [`Runner`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunnerOptions {
    /// Stop after the first failure.
    pub fail_fast: bool,
    /// Label printed before the checks (skipped when empty).
    pub category: String,
    /// Run checks on a worker pool.
    pub parallel: bool,
    /// Worker limit for parallel runs; zero means one worker per check.
    pub workers: usize,
}

impl RunnerOptions {
    /// Stops the run after the first failing check.
    #[must_use]
    pub const fn fail_fast(mut self) -> Self {
        self.fail_fast = true;
        self
    }

    /// Sets the category label.
    #[must_use]
    pub fn category(mut self, name: impl Into<String>) -> Self {
        self.category = name.into();
        self
    }

    /// Runs checks concurrently.
    #[must_use]
    pub const fn parallel(mut self) -> Self {
        self.parallel = true;
        self
    }

    /// Runs checks concurrently on at most `workers` workers (zero = unlimited).
    #[must_use]
    pub const fn workers(mut self, workers: usize) -> Self {
        self.parallel = true;
        self.workers = workers;
        self
    }
}

struct RunnerState {
    checks: Vec<Check>,
    options: RunnerOptions,
}

/// Runner for executing checks.
///
/// Builder methods take `&self` and may be called from several threads; the
/// check list is snapshotted when [`run`](Self::run) starts.
///
/// ```rust,no_run
/// use checkrun::{BoxError, Check, Context, NullPrinter, Runner, RunnerOptions};
/// use std::sync::Arc;
///
/// # async fn demo() {
/// let runner = Runner::new(Arc::new(NullPrinter), RunnerOptions::default().workers(4));
/// runner
///     .add(Check::new("fmt", |_ctx| async { Ok::<(), BoxError>(()) }).with_remediation("cargo fmt"))
///     .add_func("test", |_ctx| async { Ok::<(), BoxError>(()) });
///
/// let result = runner.run(&Context::new()).await;
/// assert!(result.success());
/// # }
/// ```
pub struct Runner {
    printer: Arc<dyn Printer>,
    state: Mutex<RunnerState>,
}

impl Runner {
    /// Creates a runner that reports through `printer`.
    #[must_use]
    pub fn new(printer: Arc<dyn Printer>, options: RunnerOptions) -> Self {
        Self {
            printer,
            state: Mutex::new(RunnerState {
                checks: Vec::new(),
                options,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, RunnerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends a check.
    pub fn add(&self, check: Check) -> &Self {
        self.lock().checks.push(check);
        self
    }

    /// Appends a check built from a name and an async function.
    pub fn add_func<F, Fut, E>(&self, name: impl Into<String>, f: F) -> &Self
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: Into<BoxError>,
    {
        self.add(Check::new(name, f))
    }

    /// Sets the remediation of the most recently added check.
    ///
    /// Does nothing if no check has been added. Prefer
    /// [`Check::with_remediation`] when the check is built separately.
    pub fn with_remediation(&self, remediation: impl Into<String>) -> &Self {
        if let Some(check) = self.lock().checks.last_mut() {
            check.set_remediation(remediation.into());
        }
        self
    }

    /// Sets the failure details of the most recently added check.
    ///
    /// Does nothing if no check has been added. Prefer [`Check::with_details`]
    /// when the check is built separately.
    pub fn with_details(&self, details: impl Into<String>) -> &Self {
        if let Some(check) = self.lock().checks.last_mut() {
            check.set_details(details.into());
        }
        self
    }

    /// Returns the number of registered checks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().checks.len()
    }

    /// Returns true if no checks are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().checks.is_empty()
    }

    /// Returns a copy of the execution settings.
    #[must_use]
    pub fn options(&self) -> RunnerOptions {
        self.lock().options.clone()
    }

    /// Returns the registered checks, in order.
    #[must_use]
    pub fn checks(&self) -> Vec<Check> {
        self.lock().checks.clone()
    }

    /// Runs every registered check and reports through the printer.
    ///
    /// Never fails: errors, panics and cancellation all end up as failed
    /// [`CheckResult`]s. Inspect [`RunResult::success`] for the outcome.
    pub async fn run(&self, ctx: &Context) -> RunResult {
        let start = Instant::now();
        let (checks, options) = {
            let state = self.lock();
            (state.checks.clone(), state.options.clone())
        };
        let printer = self.printer.as_ref();

        tracing::debug!(
            category = %options.category,
            checks = checks.len(),
            parallel = options.parallel,
            workers = options.workers,
            fail_fast = options.fail_fast,
            "starting run"
        );

        if !options.category.is_empty() {
            printer.category_header(&options.category);
        }

        let mut result = if options.parallel {
            pool::run_parallel(printer, ctx, &checks, options.workers, options.fail_fast).await
        } else {
            run_sequential(printer, ctx, &checks, options.fail_fast).await
        };
        result.duration = start.elapsed();

        print_summary(printer, &result);

        tracing::debug!(
            category = %options.category,
            passed = result.passed,
            failed = result.failed,
            total = result.total,
            elapsed = ?result.duration,
            "run finished"
        );

        result
    }
}

impl fmt::Debug for Runner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("Runner")
            .field("checks", &state.checks)
            .field("options", &state.options)
            .finish_non_exhaustive()
    }
}

/// Runs checks one at a time in insertion order.
async fn run_sequential(
    printer: &dyn Printer,
    ctx: &Context,
    checks: &[Check],
    fail_fast: bool,
) -> RunResult {
    let mut result = RunResult {
        total: checks.len(),
        ..RunResult::default()
    };

    for check in checks {
        if let Some(reason) = ctx.err() {
            tracing::debug!(%reason, remaining = checks.len() - result.checks.len(), "run stopped");
            break;
        }

        printer.check_header(check.name());
        let check_result = check::execute(check, ctx.clone()).await;
        report(printer, check, &check_result);

        let failed = !check_result.passed();
        result.record(check_result);

        if failed && fail_fast {
            tracing::debug!(check = %check.name(), "fail-fast: skipping remaining checks");
            break;
        }
    }

    result
}

/// Prints the success or failure line for one result.
pub(crate) fn report(printer: &dyn Printer, check: &Check, result: &CheckResult) {
    if result.passed() {
        printer.check_success(check.name());
    } else {
        printer.check_failure(
            check.name(),
            &check.failure_details(result.error.as_ref()),
            check.remediation(),
        );
    }
}

fn print_summary(printer: &dyn Printer, result: &RunResult) {
    let elapsed = format_elapsed(result.duration);

    if result.success() {
        printer.check_summary(
            CheckStatus::Success,
            &format!("{} of {} checks passed in {elapsed}", result.passed, result.total),
            &[],
        );
    } else {
        let names: Vec<String> = result.failed_checks().map(|c| c.name.clone()).collect();
        printer.check_summary(
            CheckStatus::Failure,
            &format!("{} of {} checks failed in {elapsed}", result.failed, result.total),
            &names,
        );
    }
}

/// Formats a duration at millisecond precision, e.g. `1s 250ms`.
fn format_elapsed(duration: Duration) -> String {
    let millis = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
    humantime::format_duration(Duration::from_millis(millis)).to_string()
}
