//! Cooperative cancellation for check runs.
//!
//! A [`Context`] is a cheap, cloneable handle that tells checks when they
//! should stop. Contexts form a tree: cancelling a parent cancels every child
//! derived from it, while cancelling a child leaves the parent untouched. A
//! context may also carry a deadline; once it passes the context reports
//! [`CancelReason::DeadlineExceeded`].
//!
//! Cancellation is advisory. Nothing is interrupted; a check observes the
//! context through [`Context::err`] or by awaiting [`Context::cancelled`].

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::{Duration, Instant};
use tokio::sync::Notify;

/// Why a context stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
pub enum CancelReason {
    /// The context (or one of its ancestors) was cancelled explicitly.
    #[error("operation cancelled")]
    Cancelled,
    /// The context's deadline passed.
    #[error("deadline exceeded")]
    DeadlineExceeded,
}

/// Cancellation handle passed to every check.
#[derive(Clone)]
pub struct Context {
    inner: Arc<Inner>,
}

struct Inner {
    state: Mutex<State>,
    notify: Notify,
    deadline: Option<Instant>,
}

#[derive(Default)]
struct State {
    reason: Option<CancelReason>,
    children: Vec<Weak<Inner>>,
}

impl Inner {
    fn new(deadline: Option<Instant>) -> Self {
        Self {
            state: Mutex::new(State::default()),
            notify: Notify::new(),
            deadline,
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn cancel(&self, reason: CancelReason) {
        let children = {
            let mut state = self.lock();
            if state.reason.is_some() {
                return;
            }
            state.reason = Some(reason);
            std::mem::take(&mut state.children)
        };

        self.notify.notify_waiters();

        for child in children.iter().filter_map(Weak::upgrade) {
            child.cancel(reason);
        }
    }
}

impl Context {
    /// Creates a root context that is never cancelled unless [`cancel`](Self::cancel)
    /// is called on it.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner::new(None)),
        }
    }

    /// Derives a child context that can be cancelled independently.
    #[must_use]
    pub fn child(&self) -> Self {
        self.derive(None)
    }

    /// Derives a child context that expires after `timeout`.
    #[must_use]
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.derive(Instant::now().checked_add(timeout))
    }

    /// Derives a child context that expires at `deadline`.
    #[must_use]
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        self.derive(Some(deadline))
    }

    fn derive(&self, deadline: Option<Instant>) -> Self {
        // A child never outlives its parent's deadline.
        let deadline = match (self.inner.deadline, deadline) {
            (Some(parent), Some(own)) => Some(parent.min(own)),
            (parent, own) => parent.or(own),
        };

        let child = Arc::new(Inner::new(deadline));

        let mut state = self.inner.lock();
        if let Some(reason) = state.reason {
            child.lock().reason = Some(reason);
        } else {
            state.children.retain(|c| c.strong_count() > 0);
            state.children.push(Arc::downgrade(&child));
        }

        Self { inner: child }
    }

    /// Cancels this context and every context derived from it.
    ///
    /// Cancelling an already cancelled context is a no-op.
    pub fn cancel(&self) {
        self.inner.cancel(CancelReason::Cancelled);
    }

    /// Returns why the context stopped, or `None` while it is still live.
    #[must_use]
    pub fn err(&self) -> Option<CancelReason> {
        if let Some(reason) = self.inner.lock().reason {
            return Some(reason);
        }
        match self.inner.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(CancelReason::DeadlineExceeded),
            _ => None,
        }
    }

    /// Returns true once the context is cancelled or past its deadline.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.err().is_some()
    }

    /// Returns the deadline, if any.
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.inner.deadline
    }

    /// Completes when the context is cancelled or its deadline passes.
    pub async fn cancelled(&self) {
        loop {
            let notified = self.inner.notify.notified();
            tokio::pin!(notified);
            // Register before checking so a concurrent cancel isn't missed.
            notified.as_mut().enable();

            if self.err().is_some() {
                return;
            }

            match self.inner.deadline {
                Some(deadline) => {
                    let deadline = tokio::time::Instant::from_std(deadline);
                    tokio::select! {
                        () = &mut notified => {},
                        () = tokio::time::sleep_until(deadline) => {},
                    }
                },
                None => notified.await,
            }
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("err", &self.err())
            .field("deadline", &self.inner.deadline)
            .finish()
    }
}
