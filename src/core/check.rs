//! Check definitions and their results.

use crate::core::context::Context;
use crate::core::error::{BoxError, CheckError};
use futures::future::{BoxFuture, FutureExt};
use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

type CheckFn = Arc<dyn Fn(Context) -> BoxFuture<'static, Result<(), BoxError>> + Send + Sync>;

/// A named unit of validation work.
///
/// The function receives a [`Context`] and should return promptly once the
/// context is cancelled. Cloning a check is cheap; the function is shared.
///
/// A panic inside the function is recovered and reported as a failure, but
/// it still passes through the process panic hook first. Callers that don't
/// want the default hook's trace on stderr should install their own hook
/// around [`Runner::run`](crate::Runner::run).
#[derive(Clone)]
pub struct Check {
    name: String,
    run: CheckFn,
    remediation: String,
    details: String,
}

impl Check {
    /// Creates a check from an async function.
    ///
    /// ```rust
    /// use checkrun::{BoxError, Check};
    ///
    /// let check = Check::new("lint", |_ctx| async { Ok::<(), BoxError>(()) })
    ///     .with_remediation("Run the linter locally");
    /// assert_eq!(check.name(), "lint");
    /// ```
    pub fn new<F, Fut, E>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: Into<BoxError>,
    {
        let run: CheckFn = Arc::new(move |ctx| {
            let fut = f(ctx);
            async move { fut.await.map_err(Into::into) }.boxed()
        });

        Self {
            name: name.into(),
            run,
            remediation: String::new(),
            details: String::new(),
        }
    }

    /// Creates a check from a synchronous function.
    ///
    /// The function runs on tokio's blocking pool so it can't stall the
    /// workers that drive async checks.
    pub fn blocking<F, E>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Context) -> Result<(), E> + Send + Sync + 'static,
        E: Into<BoxError>,
    {
        let f = Arc::new(f);
        Self::new(name, move |ctx: Context| {
            let f = Arc::clone(&f);
            async move {
                let task = tokio::task::spawn_blocking(move || -> Result<(), BoxError> {
                    (*f)(ctx).map_err(Into::into)
                });
                match task.await {
                    Ok(result) => result,
                    // Re-raise so the runner's panic guard sees the original payload.
                    Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
                    Err(err) => Err(BoxError::from(err)),
                }
            }
        })
    }

    /// Sets the hint shown when this check fails.
    #[must_use]
    pub fn with_remediation(mut self, remediation: impl Into<String>) -> Self {
        self.remediation = remediation.into();
        self
    }

    /// Sets fixed failure text shown instead of the error message.
    #[must_use]
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = details.into();
        self
    }

    /// Returns the check name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the remediation hint (empty if unset).
    #[must_use]
    pub fn remediation(&self) -> &str {
        &self.remediation
    }

    /// Returns the fixed failure details (empty if unset).
    #[must_use]
    pub fn details(&self) -> &str {
        &self.details
    }

    pub(crate) fn set_remediation(&mut self, remediation: String) {
        self.remediation = remediation;
    }

    pub(crate) fn set_details(&mut self, details: String) {
        self.details = details;
    }

    /// Text reported for a failure: fixed details win over the error message.
    pub(crate) fn failure_details(&self, error: Option<&CheckError>) -> String {
        if !self.details.is_empty() {
            return self.details.clone();
        }
        error.map(ToString::to_string).unwrap_or_default()
    }
}

impl fmt::Debug for Check {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Check")
            .field("name", &self.name)
            .field("remediation", &self.remediation)
            .field("details", &self.details)
            .finish_non_exhaustive()
    }
}

/// Outcome of a single check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CheckStatus {
    /// The check returned `Ok`.
    Success,
    /// The check returned an error, panicked, or was cancelled.
    Failure,
}

impl CheckStatus {
    /// Returns a lowercase label for the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
        }
    }
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of running a single check.
#[derive(Debug, Clone)]
pub struct CheckResult {
    /// Name of the check.
    pub name: String,
    /// Whether the check passed.
    pub status: CheckStatus,
    /// Why the check failed (`None` on success).
    pub error: Option<CheckError>,
    /// How long the check ran.
    pub duration: Duration,
}

impl CheckResult {
    /// Creates a passing result.
    #[must_use]
    pub fn success(name: impl Into<String>, duration: Duration) -> Self {
        Self {
            name: name.into(),
            status: CheckStatus::Success,
            error: None,
            duration,
        }
    }

    /// Creates a failing result.
    #[must_use]
    pub fn failure(name: impl Into<String>, error: CheckError, duration: Duration) -> Self {
        Self {
            name: name.into(),
            status: CheckStatus::Failure,
            error: Some(error),
            duration,
        }
    }

    /// Returns true if the check passed.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.status == CheckStatus::Success
    }
}

/// Result of running all checks.
#[derive(Debug, Clone, Default)]
pub struct RunResult {
    /// Number of checks that passed.
    pub passed: usize,
    /// Number of checks that failed.
    pub failed: usize,
    /// Number of checks registered when the run started.
    pub total: usize,
    /// Individual results, in insertion order.
    pub checks: Vec<CheckResult>,
    /// Wall-clock duration of the whole run.
    pub duration: Duration,
}

impl RunResult {
    /// Returns true if no check failed.
    #[must_use]
    pub fn success(&self) -> bool {
        self.failed == 0
    }

    /// Returns failed check results.
    pub fn failed_checks(&self) -> impl Iterator<Item = &CheckResult> {
        self.checks.iter().filter(|c| !c.passed())
    }

    /// Returns the number of checks that never ran because of an early stop.
    #[must_use]
    pub fn not_run(&self) -> usize {
        self.total.saturating_sub(self.checks.len())
    }

    pub(crate) fn record(&mut self, result: CheckResult) {
        if result.passed() {
            self.passed += 1;
        } else {
            self.failed += 1;
        }
        self.checks.push(result);
    }
}

/// Runs a check, converting a panic anywhere inside it into a failure.
pub(crate) async fn execute(check: &Check, ctx: Context) -> CheckResult {
    let run = Arc::clone(&check.run);
    let start = Instant::now();

    tracing::debug!(check = %check.name, "running check");

    // The call itself happens inside the future so a panic before the first
    // await is caught too.
    let outcome = AssertUnwindSafe(async move { (*run)(ctx).await })
        .catch_unwind()
        .await;
    let duration = start.elapsed();

    let result = match outcome {
        Ok(Ok(())) => CheckResult::success(check.name.clone(), duration),
        Ok(Err(err)) => CheckResult::failure(check.name.clone(), into_check_error(err), duration),
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            tracing::warn!(check = %check.name, panic = %message, "check panicked");
            CheckResult::failure(check.name.clone(), CheckError::Panicked(message), duration)
        },
    };

    tracing::debug!(
        check = %result.name,
        status = %result.status,
        elapsed = ?result.duration,
        "check finished"
    );

    result
}

/// Keeps a [`CheckError`] returned by the check as-is instead of wrapping it.
fn into_check_error(err: BoxError) -> CheckError {
    match err.downcast::<CheckError>() {
        Ok(err) => *err,
        Err(err) => CheckError::failed(err),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&'static str>() {
        (*text).to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::context::CancelReason;

    fn ok_check(name: &str) -> Check {
        Check::new(name, |_ctx| async { Ok::<(), BoxError>(()) })
    }

    #[test]
    fn test_check_builder() {
        let check = ok_check("lint")
            .with_remediation("run the linter")
            .with_details("lint failed");
        assert_eq!(check.name(), "lint");
        assert_eq!(check.remediation(), "run the linter");
        assert_eq!(check.details(), "lint failed");
    }

    #[test]
    fn test_check_debug_hides_function() {
        let debug_str = format!("{:?}", ok_check("fmt"));
        assert!(debug_str.contains("fmt"));
        assert!(debug_str.contains("Check"));
    }

    #[tokio::test]
    async fn test_returned_cancellation_stays_cancellation() {
        let check = Check::new("stopped", |_ctx| async {
            Err::<(), CheckError>(CheckError::Cancelled(CancelReason::Cancelled))
        });

        let result = execute(&check, Context::new()).await;

        assert!(result.error.as_ref().is_some_and(CheckError::is_cancelled));
    }

    #[test]
    fn test_failure_details_prefers_fixed_text() {
        let err = CheckError::failed("boom");
        assert_eq!(ok_check("a").failure_details(Some(&err)), "boom");
        assert_eq!(
            ok_check("a").with_details("fixed").failure_details(Some(&err)),
            "fixed"
        );
        assert_eq!(ok_check("a").failure_details(None), "");
    }

    #[tokio::test]
    async fn test_execute_success() {
        let result = execute(&ok_check("a"), Context::new()).await;
        assert!(result.passed());
        assert!(result.error.is_none());
    }

    #[tokio::test]
    async fn test_execute_error() {
        let check = Check::new("b", |_ctx| async { Err::<(), _>("boom") });
        let result = execute(&check, Context::new()).await;
        assert_eq!(result.status, CheckStatus::Failure);
        assert_eq!(result.error.expect("error").to_string(), "boom");
    }

    #[tokio::test]
    #[allow(clippy::panic)]
    async fn test_execute_panic_in_future() {
        let check = Check::new("p", |_ctx| async {
            if true {
                panic!("boom");
            }
            Ok::<(), BoxError>(())
        });
        let result = execute(&check, Context::new()).await;
        let err = result.error.expect("error");
        assert!(err.is_panic());
        assert_eq!(err.to_string(), "panic: boom");
    }

    #[tokio::test]
    #[allow(clippy::panic)]
    async fn test_execute_panic_before_future() {
        let check = Check::new("p", |_ctx| -> std::future::Ready<Result<(), BoxError>> {
            panic!("sync {}", 42)
        });
        let result = execute(&check, Context::new()).await;
        assert_eq!(
            result.error.expect("error").to_string(),
            "panic: sync 42"
        );
    }

    #[tokio::test]
    async fn test_blocking_check_sees_context() {
        let check = Check::blocking("cancel-aware", |ctx: Context| match ctx.err() {
            Some(reason) => Err(CheckError::from(reason)),
            None => Ok(()),
        });

        let live = execute(&check, Context::new()).await;
        assert!(live.passed());

        let ctx = Context::new();
        ctx.cancel();
        let cancelled = execute(&check, ctx).await;
        assert_eq!(
            cancelled.error.expect("error").to_string(),
            CancelReason::Cancelled.to_string()
        );
    }

    #[tokio::test]
    #[allow(clippy::panic)]
    async fn test_blocking_check_panic_is_caught() {
        let check = Check::blocking("p", |_ctx| -> Result<(), BoxError> { panic!("boom") });
        let result = execute(&check, Context::new()).await;
        assert_eq!(result.error.expect("error").to_string(), "panic: boom");
    }

    #[test]
    fn test_panic_message_payloads() {
        assert_eq!(panic_message(&"static"), "static");
        assert_eq!(panic_message(&"owned".to_string()), "owned");
        assert_eq!(panic_message(&42_u32), "non-string panic payload");
    }

    #[test]
    fn test_run_result_record_counts() {
        let mut result = RunResult {
            total: 3,
            ..RunResult::default()
        };
        result.record(CheckResult::success("a", Duration::ZERO));
        result.record(CheckResult::failure(
            "b",
            CheckError::failed("x"),
            Duration::ZERO,
        ));

        assert_eq!(result.passed, 1);
        assert_eq!(result.failed, 1);
        assert_eq!(result.not_run(), 1);
        assert!(!result.success());
        let failed: Vec<_> = result.failed_checks().map(|c| c.name.as_str()).collect();
        assert_eq!(failed, vec!["b"]);
    }

    #[test]
    fn test_empty_run_result_is_success() {
        assert!(RunResult::default().success());
    }

    #[test]
    fn test_check_status_display() {
        assert_eq!(CheckStatus::Success.to_string(), "success");
        assert_eq!(CheckStatus::Failure.to_string(), "failure");
    }
}
