//! Cancellation and deadline handling for extraction runs.
//!
//! An [`ExtractionContext`] is handed to every adapter call. Adapters wrap
//! each catalog query in [`ExtractionContext::run`], which races the query
//! against the cancellation token and the deadline. When either fires first
//! the query future is dropped, which aborts the in-flight request on the
//! driver side, and the call returns a cancellation error naming what was
//! being fetched.

use crate::{Result, error::PocketDocError};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Cancellation token plus optional deadline for one extraction run.
///
/// Cloning is cheap; clones share the same token and deadline.
///
/// # Example
/// ```rust
/// use pocketdoc_core::ExtractionContext;
/// use std::time::Duration;
///
/// let ctx = ExtractionContext::new().with_timeout(Duration::from_secs(60));
/// assert!(!ctx.is_cancelled());
/// assert!(ctx.remaining().is_some());
/// ```
#[derive(Debug, Clone, Default)]
pub struct ExtractionContext {
    token: CancellationToken,
    deadline: Option<(Instant, Duration)>,
}

impl ExtractionContext {
    /// Creates a context with a fresh token and no deadline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a deadline relative to now.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Some((Instant::now() + timeout, timeout));
        self
    }

    /// Sets an absolute deadline.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        let budget = deadline.saturating_duration_since(Instant::now());
        self.deadline = Some((deadline, budget));
        self
    }

    /// Uses an externally owned cancellation token (e.g. a signal handler's).
    pub fn with_token(mut self, token: CancellationToken) -> Self {
        self.token = token;
        self
    }

    /// The token observed by this context.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Cancels this context and every clone of it.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// True once the token has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Time left before the deadline, if one is set.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|(at, _)| at.saturating_duration_since(Instant::now()))
    }

    /// Fails immediately if the context is already cancelled or expired.
    ///
    /// # Errors
    /// Returns `Cancelled` or `DeadlineExceeded`.
    pub fn check(&self, purpose: &str) -> Result<()> {
        if self.token.is_cancelled() {
            return Err(PocketDocError::cancelled(purpose));
        }
        if let Some((at, budget)) = self.deadline
            && Instant::now() >= at
        {
            return Err(PocketDocError::deadline_exceeded(purpose, budget));
        }
        Ok(())
    }

    /// Runs `future` unless the context is cancelled or expires first.
    ///
    /// # Arguments
    /// * `purpose` - What the future is fetching; used in error context
    /// * `future` - The catalog operation
    ///
    /// # Errors
    /// Returns the future's own error, or `Cancelled`/`DeadlineExceeded`
    /// when the context wins the race.
    pub async fn run<T, F>(&self, purpose: &str, future: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        self.check(purpose)?;

        let expiry = async {
            match self.deadline {
                Some((at, _)) => tokio::time::sleep_until(at).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            () = self.token.cancelled() => Err(PocketDocError::cancelled(purpose)),
            () = expiry => Err(PocketDocError::deadline_exceeded(
                purpose,
                self.deadline.map_or(Duration::ZERO, |(_, budget)| budget),
            )),
            result = future => result,
        }
    }
}
