//! # checkrun
//!
//! Run named checks, sequentially or on a bounded worker pool, and report
//! their results in a stable order.
//!
//! A check is an async function that receives a [`Context`] and returns
//! `Ok(())` or an error. The [`Runner`] executes checks, isolates panics,
//! honours cancellation and fail-fast, and reports progress through a
//! [`Printer`].
//!
//! ## Features
//!
//! - **Stable reporting**: results are reported in insertion order even when
//!   checks finish out of order on the worker pool
//! - **Panic isolation**: a panicking check fails itself, not the run
//! - **Cancellation**: a cancelled [`Context`] stops new checks from starting
//! - **Configurable checks**: define shell-command checks by category in
//!   `checkrun.toml`
//!
//! ## Example
//!
//! ```rust,no_run
//! use checkrun::{BoxError, Check, Context, NullPrinter, Runner, RunnerOptions};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let runner = Runner::new(
//!         Arc::new(NullPrinter),
//!         RunnerOptions::default().category("lint").workers(2),
//!     );
//!
//!     runner
//!         .add(Check::new("fmt", |_ctx| async { Ok::<(), BoxError>(()) }))
//!         .add_func("typos", |_ctx| async { Err::<(), BoxError>("found 'teh'".into()) })
//!         .with_remediation("Fix the spelling");
//!
//!     let result = runner.run(&Context::new()).await;
//!     if !result.success() {
//!         std::process::exit(1);
//!     }
//! }
//! ```

#![doc(html_root_url = "https://docs.rs/checkrun/0.1.0")]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod checks;
pub mod cli;
pub mod config;
pub mod core;
pub mod presets;

// Re-export main types for convenience
pub use config::Config;
pub use core::check::{Check, CheckResult, CheckStatus, RunResult};
pub use core::context::{CancelReason, Context};
pub use core::error::{BoxError, CheckError, Error, Result};
pub use core::printer::{NullPrinter, Printer};
pub use core::runner::{Runner, RunnerOptions};
