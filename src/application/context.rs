//! # Request Context
//!
//! Cancellation and deadline propagation for store and service calls.
//!
//! Every [`StatisticsStore`](crate::infrastructure::persistence::StatisticsStore)
//! operation receives a [`RequestContext`]. Adapters wrap their I/O in
//! [`RequestContext::run`], which races the operation against the
//! context's deadline and cancellation signal. When either fires, the
//! in-flight future is dropped, which aborts the query and rolls back any
//! open transaction.
//!
//! # Examples
//!
//! ```
//! use statistics_service::application::context::{Interrupted, RequestContext};
//! use std::time::Duration;
//!
//! # let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
//! # rt.block_on(async {
//! let (ctx, handle) = RequestContext::cancellable();
//! handle.cancel();
//!
//! let result = ctx.run(async { 42 }).await;
//! assert_eq!(result, Err(Interrupted::Cancelled));
//!
//! let ctx = RequestContext::with_timeout(Duration::from_secs(5));
//! assert_eq!(ctx.run(async { 42 }).await, Ok(42));
//! # });
//! ```

use std::fmt;
use std::future::{Future, pending};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{Instant, sleep_until};

/// Reason an operation was interrupted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Interrupted {
    /// The caller cancelled the context.
    Cancelled,
    /// The context deadline passed.
    DeadlineExceeded,
}

impl fmt::Display for Interrupted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cancelled => write!(f, "context cancelled"),
            Self::DeadlineExceeded => write!(f, "context deadline exceeded"),
        }
    }
}

impl std::error::Error for Interrupted {}

/// Execution context carried by every store and service call.
///
/// Cheap to clone; clones share the cancellation signal.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    deadline: Option<Instant>,
    cancel: Option<watch::Receiver<bool>>,
}

impl RequestContext {
    /// Returns a context that never expires and cannot be cancelled.
    #[must_use]
    pub fn background() -> Self {
        Self::default()
    }

    /// Returns a context that expires `timeout` from now.
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::background().timeout(timeout)
    }

    /// Returns a context that expires at `deadline`.
    #[must_use]
    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            deadline: Some(deadline),
            cancel: None,
        }
    }

    /// Returns a cancellable context and the handle that cancels it.
    #[must_use]
    pub fn cancellable() -> (Self, CancelHandle) {
        let (tx, rx) = watch::channel(false);
        let ctx = Self {
            deadline: None,
            cancel: Some(rx),
        };
        (ctx, CancelHandle { tx })
    }

    /// Tightens the deadline to at most `timeout` from now.
    ///
    /// An earlier existing deadline is kept.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        let candidate = Instant::now() + timeout;
        self.deadline = Some(match self.deadline {
            Some(existing) if existing < candidate => existing,
            _ => candidate,
        });
        self
    }

    /// Returns the deadline, if any.
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Returns the time left before the deadline.
    ///
    /// `None` means no deadline; an expired context returns `Some(ZERO)`.
    #[must_use]
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// Returns true if the context has been cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|rx| *rx.borrow())
    }

    /// Returns the interruption that already applies, if any.
    #[must_use]
    pub fn interruption(&self) -> Option<Interrupted> {
        if self.is_cancelled() {
            Some(Interrupted::Cancelled)
        } else if self.deadline.is_some_and(|d| d <= Instant::now()) {
            Some(Interrupted::DeadlineExceeded)
        } else {
            None
        }
    }

    /// Runs `fut` bounded by this context.
    ///
    /// The future is not polled at all if the context is already
    /// interrupted, and is dropped as soon as the context is cancelled or
    /// its deadline passes.
    ///
    /// # Errors
    ///
    /// Returns [`Interrupted`] if the context fires before `fut` completes.
    pub async fn run<F>(&self, fut: F) -> Result<F::Output, Interrupted>
    where
        F: Future,
    {
        if let Some(cause) = self.interruption() {
            return Err(cause);
        }

        tokio::select! {
            biased;
            () = self.cancelled() => Err(Interrupted::Cancelled),
            () = self.expired() => Err(Interrupted::DeadlineExceeded),
            output = fut => Ok(output),
        }
    }

    async fn cancelled(&self) {
        let Some(rx) = &self.cancel else {
            return pending().await;
        };
        let mut rx = rx.clone();
        // A dropped handle can never cancel.
        let closed = rx.wait_for(|cancelled| *cancelled).await.is_err();
        if closed {
            pending::<()>().await;
        }
    }

    async fn expired(&self) {
        match self.deadline {
            Some(deadline) => sleep_until(deadline).await,
            None => pending().await,
        }
    }
}

/// Cancels the [`RequestContext`] it was created with, and all its clones.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    /// Cancels the context. Idempotent.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    /// Returns true if [`cancel`](Self::cancel) has been called.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }
}
