//! Cancellation and deadlines for connection handling.
//!
//! A [`Context`] couples a [`CancellationToken`] with an optional deadline.
//! Derived contexts inherit both: cancelling a parent cancels its children, and
//! a child deadline never outlives the parent's.

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::{CancellationToken, DropGuard};

#[derive(Debug, Clone)]
pub struct Context {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl Default for Context {
    fn default() -> Self {
        Self::background()
    }
}

impl Context {
    /// A root context: never cancelled unless [`Context::cancel`] is called, no deadline.
    pub fn background() -> Self {
        Self { token: CancellationToken::new(), deadline: None }
    }

    /// A child cancelled together with `self`, with the same deadline.
    pub fn child(&self) -> Self {
        Self { token: self.token.child_token(), deadline: self.deadline }
    }

    /// A child that also expires `timeout` from now, or at the parent's deadline if
    /// that comes first. A `timeout` too large to represent adds no deadline.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        let Some(deadline) = Instant::now().checked_add(timeout) else {
            return self.child();
        };
        let deadline = match self.deadline {
            Some(parent) if parent < deadline => parent,
            _ => deadline,
        };
        Self { token: self.token.child_token(), deadline: Some(deadline) }
    }

    /// [`Context::with_timeout`] for a positive `timeout`, [`Context::child`] for zero.
    pub fn derive(&self, timeout: Duration) -> Self {
        if timeout.is_zero() { self.child() } else { self.with_timeout(timeout) }
    }

    #[inline]
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Cancels this context and every context derived from it.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Returns a guard that cancels this context when dropped.
    #[must_use]
    pub fn release_on_drop(&self) -> DropGuard {
        self.token.clone().drop_guard()
    }

    /// Returns true once the context was cancelled or its deadline passed.
    pub fn is_done(&self) -> bool {
        self.token.is_cancelled() || self.deadline.is_some_and(|deadline| deadline <= Instant::now())
    }

    /// Completes when the context is cancelled or its deadline passes.
    pub async fn done(&self) {
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    () = self.token.cancelled() => {}
                    () = tokio::time::sleep_until(deadline) => {}
                }
            }
            None => self.token.cancelled().await,
        }
    }
}
