//! Behavioural tests for the check runner's public API.

use checkrun::{
    BoxError, CancelReason, Check, CheckError, CheckStatus, Context, NullPrinter, Printer,
    RunResult, Runner, RunnerOptions,
};
use pretty_assertions::assert_eq;
use rstest::rstest;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

// =============================================================================
// Helpers
// =============================================================================

/// Records printer calls as plain strings.
#[derive(Debug, Default)]
struct Transcript(Mutex<Vec<String>>);

impl Transcript {
    fn lines(&self) -> Vec<String> {
        self.0.lock().expect("lock").clone()
    }

    fn push(&self, line: String) {
        self.0.lock().expect("lock").push(line);
    }
}

impl Printer for Transcript {
    fn category_header(&self, name: &str) {
        self.push(format!("category {name}"));
    }

    fn check_header(&self, name: &str) {
        self.push(format!("header {name}"));
    }

    fn check_success(&self, message: &str) {
        self.push(format!("ok {message}"));
    }

    fn check_failure(&self, message: &str, details: &str, remediation: &str) {
        self.push(format!("fail {message}: {details} [{remediation}]"));
    }

    fn check_summary(&self, status: CheckStatus, _message: &str, names: &[String]) {
        self.push(format!("summary {status} {}", names.join(",")));
    }
}

fn ok(name: &str) -> Check {
    Check::new(name, |_ctx| async { Ok::<(), BoxError>(()) })
}

fn err(name: &str, message: &'static str) -> Check {
    Check::new(name, move |_ctx| async move { Err::<(), BoxError>(message.into()) })
}

fn sleepy(name: &str, delay: Duration) -> Check {
    Check::new(name, move |_ctx| async move {
        tokio::time::sleep(delay).await;
        Ok::<(), BoxError>(())
    })
}

fn counted(name: &str, counter: &Arc<AtomicUsize>) -> Check {
    let counter = Arc::clone(counter);
    Check::new(name, move |_ctx| {
        let counter = Arc::clone(&counter);
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok::<(), BoxError>(())
        }
    })
}

fn names(result: &RunResult) -> Vec<&str> {
    result.checks.iter().map(|c| c.name.as_str()).collect()
}

fn statuses(result: &RunResult) -> Vec<CheckStatus> {
    result.checks.iter().map(|c| c.status).collect()
}

fn runner(options: RunnerOptions) -> Runner {
    Runner::new(Arc::new(NullPrinter), options)
}

// =============================================================================
// Counting and ordering
// =============================================================================

#[rstest]
#[case::sequential(RunnerOptions::default())]
#[case::parallel(RunnerOptions::default().parallel())]
#[case::two_workers(RunnerOptions::default().workers(2))]
#[tokio::test]
async fn counts_add_up(#[case] options: RunnerOptions) {
    let runner = runner(options);
    runner
        .add(ok("a"))
        .add(err("b", "nope"))
        .add(ok("c"))
        .add(err("d", "also nope"));

    let result = runner.run(&Context::new()).await;

    assert_eq!(result.total, 4);
    assert_eq!(result.passed, 2);
    assert_eq!(result.failed, 2);
    assert_eq!(result.passed + result.failed, result.checks.len());
    assert!(!result.success());
}

#[rstest]
#[case::sequential(RunnerOptions::default())]
#[case::parallel(RunnerOptions::default().parallel())]
#[case::one_worker(RunnerOptions::default().workers(1))]
#[tokio::test]
async fn results_follow_insertion_order(#[case] options: RunnerOptions) {
    let runner = runner(options);
    runner
        .add(sleepy("slow", Duration::from_millis(60)))
        .add(sleepy("medium", Duration::from_millis(30)))
        .add(sleepy("fast", Duration::from_millis(1)));

    let result = runner.run(&Context::new()).await;

    assert_eq!(names(&result), vec!["slow", "medium", "fast"]);
    assert!(result.success());
}

#[tokio::test]
async fn parallel_reports_in_insertion_order() {
    let transcript = Arc::new(Transcript::default());
    let runner = Runner::new(transcript.clone(), RunnerOptions::default().category("lint").parallel());
    runner
        .add(sleepy("slow", Duration::from_millis(40)))
        .add(err("broken", "bad").with_remediation("fix it"))
        .add(ok("quick"));

    runner.run(&Context::new()).await;

    assert_eq!(
        transcript.lines(),
        vec![
            "category lint",
            "header slow",
            "header broken",
            "header quick",
            "ok slow",
            "fail broken: bad [fix it]",
            "ok quick",
            "summary failure broken",
        ]
    );
}

#[tokio::test]
async fn empty_runner_succeeds() {
    let transcript = Arc::new(Transcript::default());
    let runner = Runner::new(transcript.clone(), RunnerOptions::default());

    let result = runner.run(&Context::new()).await;

    assert_eq!(result.total, 0);
    assert!(result.success());
    assert_eq!(transcript.lines(), vec!["summary success "]);
}

// =============================================================================
// Fail-fast
// =============================================================================

#[tokio::test]
async fn sequential_fail_fast_skips_the_rest() {
    let counter = Arc::new(AtomicUsize::new(0));
    let runner = runner(RunnerOptions::default().fail_fast());
    runner
        .add(ok("a"))
        .add(err("b", "boom"))
        .add(counted("c", &counter));

    let result = runner.run(&Context::new()).await;

    assert_eq!(names(&result), vec!["a", "b"]);
    assert_eq!(result.total, 3);
    assert_eq!(result.not_run(), 1);
    assert_eq!(counter.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn parallel_without_fail_fast_runs_everything() {
    let runner = runner(RunnerOptions::default().parallel());
    runner
        .add(ok("a"))
        .add(err("b", "boom"))
        .add(ok("c"))
        .add(ok("d"));

    let result = runner.run(&Context::new()).await;

    assert_eq!(
        statuses(&result),
        vec![
            CheckStatus::Success,
            CheckStatus::Failure,
            CheckStatus::Success,
            CheckStatus::Success
        ]
    );
    assert_eq!(result.failed_checks().map(|c| c.name.as_str()).collect::<Vec<_>>(), vec!["b"]);
}

#[tokio::test]
async fn parallel_fail_fast_cancels_queued_checks() {
    let counter = Arc::new(AtomicUsize::new(0));
    let runner = runner(RunnerOptions::default().fail_fast().workers(1));
    runner
        .add(err("first", "boom"))
        .add(counted("second", &counter))
        .add(counted("third", &counter));

    let result = runner.run(&Context::new()).await;

    assert_eq!(result.total, 3);
    assert_eq!(result.checks.len(), 3);
    assert_eq!(result.failed, 3);
    assert_eq!(counter.load(Ordering::SeqCst), 0);
    assert!(result.checks[1..]
        .iter()
        .all(|c| c.error.as_ref().is_some_and(CheckError::is_cancelled)));
}

// =============================================================================
// Panics
// =============================================================================

#[allow(clippy::panic, unreachable_code)]
fn panicking(name: &str) -> Check {
    Check::new(name, |_ctx| async {
        panic!("boom");
        Ok::<(), BoxError>(())
    })
}

#[rstest]
#[case::sequential(RunnerOptions::default())]
#[case::parallel(RunnerOptions::default().parallel())]
#[tokio::test]
async fn panics_become_failures(#[case] options: RunnerOptions) {
    let runner = runner(options);
    runner.add(ok("before")).add(panicking("explodes")).add(ok("after"));

    let result = runner.run(&Context::new()).await;

    assert_eq!(
        statuses(&result),
        vec![CheckStatus::Success, CheckStatus::Failure, CheckStatus::Success]
    );
    let error = result.checks[1].error.as_ref().expect("error");
    assert!(error.is_panic());
    assert_eq!(error.to_string(), "panic: boom");
}

#[allow(clippy::panic)]
#[tokio::test]
async fn blocking_panics_become_failures() {
    let runner = runner(RunnerOptions::default());
    runner.add(Check::blocking("sync", |_ctx| -> Result<(), BoxError> {
        panic!("sync boom");
    }));

    let result = runner.run(&Context::new()).await;

    assert_eq!(result.checks[0].error.as_ref().expect("error").to_string(), "panic: sync boom");
}

// =============================================================================
// Concurrency bound
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn worker_limit_bounds_concurrency() {
    let runner = runner(RunnerOptions::default().workers(2));
    for i in 0..5 {
        runner.add(sleepy(&format!("check-{i}"), Duration::from_millis(50)));
    }

    let started = Instant::now();
    let result = runner.run(&Context::new()).await;
    let elapsed = started.elapsed();

    assert!(result.success());
    // Five 50ms checks on two workers need three rounds.
    assert!(elapsed >= Duration::from_millis(150), "took {elapsed:?}");
    assert!(elapsed < Duration::from_millis(250), "took {elapsed:?}");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn peak_concurrency_never_exceeds_workers() {
    let active = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let runner = runner(RunnerOptions::default().workers(3));

    for i in 0..8 {
        let active = Arc::clone(&active);
        let peak = Arc::clone(&peak);
        runner.add(Check::new(format!("check-{i}"), move |_ctx| {
            let active = Arc::clone(&active);
            let peak = Arc::clone(&peak);
            async move {
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                active.fetch_sub(1, Ordering::SeqCst);
                Ok::<(), BoxError>(())
            }
        }));
    }

    let result = runner.run(&Context::new()).await;

    assert!(result.success());
    assert!(peak.load(Ordering::SeqCst) <= 3);
}

// =============================================================================
// Cancellation and reuse
// =============================================================================

#[rstest]
#[case::sequential(RunnerOptions::default())]
#[case::parallel(RunnerOptions::default().parallel())]
#[tokio::test]
async fn cancelled_context_starts_nothing(#[case] options: RunnerOptions) {
    let counter = Arc::new(AtomicUsize::new(0));
    let runner = runner(options);
    runner.add(counted("a", &counter)).add(counted("b", &counter));

    let ctx = Context::new();
    ctx.cancel();
    let result = runner.run(&ctx).await;

    assert_eq!(counter.load(Ordering::SeqCst), 0);
    assert_eq!(result.total, 2);
    assert_eq!(result.passed, 0);
}

#[tokio::test]
async fn checks_observe_deadline() {
    let runner = runner(RunnerOptions::default());
    runner.add_func("waits", |ctx: Context| async move {
        ctx.cancelled().await;
        Err::<(), CheckError>(ctx.err().unwrap_or(CancelReason::Cancelled).into())
    });

    let ctx = Context::new().with_timeout(Duration::from_millis(50));
    let result = runner.run(&ctx).await;

    let error = result.checks[0].error.as_ref().expect("error");
    assert!(error.is_cancelled());
    assert_eq!(error.to_string(), "deadline exceeded");
}

#[tokio::test]
async fn runs_are_repeatable() {
    let counter = Arc::new(AtomicUsize::new(0));
    let runner = runner(RunnerOptions::default().workers(2));
    runner
        .add(counted("a", &counter))
        .add(err("b", "bad"))
        .add(counted("c", &counter));

    let first = runner.run(&Context::new()).await;
    let second = runner.run(&Context::new()).await;

    assert_eq!(names(&first), names(&second));
    assert_eq!(statuses(&first), statuses(&second));
    assert_eq!(counter.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn builder_attaches_to_last_check() {
    let transcript = Arc::new(Transcript::default());
    let runner = Runner::new(transcript.clone(), RunnerOptions::default());
    runner
        .add(err("first", "first failed"))
        .add(err("second", "second failed"))
        .with_remediation("rerun")
        .with_details("fixed text");

    runner.run(&Context::new()).await;

    let lines = transcript.lines();
    assert!(lines.contains(&"fail first: first failed []".to_string()));
    assert!(lines.contains(&"fail second: fixed text [rerun]".to_string()));
}
