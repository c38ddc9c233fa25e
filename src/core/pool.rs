//! Bounded worker pool for parallel runs.
//!
//! Workers pull index-tagged jobs from a shared queue and push index-tagged
//! results back. Results land in a slot vector by index, so reporting follows
//! insertion order no matter which check finishes first.

use crate::core::check::{self, Check, CheckResult, RunResult};
use crate::core::context::{CancelReason, Context};
use crate::core::error::CheckError;
use crate::core::printer::Printer;
use crate::core::runner::report;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};

struct Job {
    index: usize,
    check: Check,
}

type JobQueue = Arc<Mutex<mpsc::Receiver<Job>>>;

/// Number of workers to spawn: `workers` capped at the check count, or one
/// per check when `workers` is zero.
pub(crate) fn worker_count(workers: usize, checks: usize) -> usize {
    if workers > 0 {
        workers.min(checks)
    } else {
        checks
    }
}

/// Runs `checks` on a pool of workers and reports the results in order.
pub(crate) async fn run_parallel(
    printer: &dyn Printer,
    ctx: &Context,
    checks: &[Check],
    workers: usize,
    fail_fast: bool,
) -> RunResult {
    let mut result = RunResult {
        total: checks.len(),
        ..RunResult::default()
    };

    if checks.is_empty() {
        return result;
    }

    // Completion order is arbitrary, so headers go out before anything runs.
    for check in checks {
        printer.check_header(check.name());
    }

    let run_ctx = ctx.child();
    let count = worker_count(workers, checks.len());

    tracing::debug!(workers = count, checks = checks.len(), fail_fast, "starting worker pool");

    let (job_tx, job_rx) = mpsc::channel::<Job>(checks.len());
    let (result_tx, mut result_rx) = mpsc::channel::<(usize, CheckResult)>(checks.len());
    let job_rx: JobQueue = Arc::new(Mutex::new(job_rx));

    for id in 0..count {
        tokio::spawn(worker(
            id,
            Arc::clone(&job_rx),
            result_tx.clone(),
            run_ctx.clone(),
            fail_fast,
        ));
    }
    // Workers now own every sender; the channel closes when the last one exits.
    drop(result_tx);

    for (index, check) in checks.iter().enumerate() {
        let job = Job {
            index,
            check: check.clone(),
        };
        if job_tx.send(job).await.is_err() {
            break;
        }
    }
    drop(job_tx);

    let mut slots: Vec<Option<CheckResult>> = vec![None; checks.len()];
    while let Some((index, check_result)) = result_rx.recv().await {
        if let Some(slot) = slots.get_mut(index) {
            *slot = Some(check_result);
        }
    }
    run_ctx.cancel();

    for (check, slot) in checks.iter().zip(slots) {
        let check_result = slot.unwrap_or_else(|| {
            CheckResult::failure(
                check.name(),
                CheckError::Cancelled(CancelReason::Cancelled),
                Duration::ZERO,
            )
        });
        report(printer, check, &check_result);
        result.record(check_result);
    }

    result
}

async fn worker(
    id: usize,
    jobs: JobQueue,
    results: mpsc::Sender<(usize, CheckResult)>,
    ctx: Context,
    fail_fast: bool,
) {
    loop {
        let next = jobs.lock().await.recv().await;
        let Some(Job { index, check }) = next else {
            break;
        };

        let check_result = match ctx.err() {
            Some(reason) => {
                tracing::debug!(worker = id, check = %check.name(), %reason, "check not started");
                CheckResult::failure(check.name(), CheckError::Cancelled(reason), Duration::ZERO)
            },
            None => check::execute(&check, ctx.clone()).await,
        };

        if fail_fast && !check_result.passed() {
            // Stops queued checks only; checks already running finish normally.
            ctx.cancel();
        }

        if results.send((index, check_result)).await.is_err() {
            break;
        }
    }
}
