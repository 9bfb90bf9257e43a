//! Bounded-duration context attached to every update

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::core::error::{AppError, AppResult};

/// Deadline plus cancellation signal for one unit of work.
///
/// Cloning is cheap; clones share the same deadline and token.
#[derive(Debug, Clone)]
pub struct UpdateContext {
    deadline: Instant,
    timeout: Duration,
    cancel: CancellationToken,
}

impl UpdateContext {
    /// Context that expires `timeout` from now or when `cancel` fires.
    pub fn new(timeout: Duration, cancel: CancellationToken) -> Self {
        Self {
            deadline: Instant::now() + timeout,
            timeout,
            cancel,
        }
    }

    /// Context with its own token, for tests and one-off work.
    pub fn detached(timeout: Duration) -> Self {
        Self::new(timeout, CancellationToken::new())
    }

    /// Runs `fut` within this context.
    ///
    /// Fails with `Timeout` when the deadline passes first and with
    /// `Cancelled` when shutdown is requested first.
    pub async fn bounded<T, F>(&self, fut: F) -> AppResult<T>
    where
        F: Future<Output = AppResult<T>>,
    {
        tokio::select! {
            _ = self.cancel.cancelled() => Err(AppError::Cancelled),
            res = tokio::time::timeout_at(self.deadline, fut) => match res {
                Ok(inner) => inner,
                Err(_) => Err(AppError::Timeout(self.timeout)),
            },
        }
    }
}
