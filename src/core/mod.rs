//! Core functionality for checkrun.
//!
//! This module contains the main components:
//! - [`check`]: Checks and their results
//! - [`context`]: Cancellation and deadlines
//! - [`runner`]: Check execution engine
//! - [`printer`]: Output contract used by the runner
//! - [`executor`]: Shell command execution
//! - [`error`]: Error types and result handling

pub mod check;
pub mod context;
pub mod error;
pub mod executor;
mod pool;
pub mod printer;
pub mod runner;
