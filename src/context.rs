use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::{Duration, Instant},
};

use crate::{CqrsError, Result};

/// The `Context` travels alongside every message through a middleware pipeline.
///
/// It carries a cancellation signal and an optional deadline. The buses and the aggregate root
/// never look at it themselves: enforcing cancellation or timeouts is the job of middlewares
/// such as [`CancellationGuard`](crate::CancellationGuard) and [`Timeout`](crate::Timeout).
///
/// Contexts are cheap to clone. A context derived with [`with_cancel`](Context::with_cancel)
/// is cancelled whenever its parent is.
#[derive(Clone, Debug, Default)]
pub struct Context {
    signals: Vec<Arc<AtomicBool>>,
    deadline: Option<Instant>,
}

/// Cancels the context it was created with, and every context derived from it.
#[derive(Clone, Debug)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }
}

impl Context {
    /// An empty context: never cancelled, no deadline.
    pub fn background() -> Self {
        Self::default()
    }

    pub fn with_cancel(&self) -> (Self, CancelHandle) {
        let signal = Arc::new(AtomicBool::new(false));
        let mut child = self.clone();
        child.signals.push(Arc::clone(&signal));

        (child, CancelHandle(signal))
    }

    /// Derives a context that expires at `deadline`, or at the parent's deadline if earlier.
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let mut child = self.clone();
        child.deadline = Some(match self.deadline {
            Some(current) => current.min(deadline),
            None => deadline,
        });
        child
    }

    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_cancelled(&self) -> bool {
        self.signals
            .iter()
            .any(|signal| signal.load(Ordering::Acquire))
    }

    pub fn is_expired(&self) -> bool {
        self.deadline
            .is_some_and(|deadline| Instant::now() >= deadline)
    }

    /// Returns an error if the context has been cancelled or its deadline has passed.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            return Err(CqrsError::Cancelled);
        }
        if self.is_expired() {
            return Err(CqrsError::DeadlineExceeded);
        }
        Ok(())
    }
}
