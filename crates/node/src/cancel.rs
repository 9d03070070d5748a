//! Cooperative cancellation (spec §4.2, §5): a single per-execution token
//! wired through parameter resolution, node execution, and the I/O
//! primitives built-in nodes use.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// Handed to every [`crate::NodeExecutor::execute`] call. Cloning is cheap
/// (shares the underlying token); executors check it at I/O boundaries and
/// inside long loops.
#[derive(Debug, Clone)]
pub struct CancellationHandle {
    token: CancellationToken,
}

impl CancellationHandle {
    #[must_use]
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
        }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub async fn cancelled(&self) {
        self.token.cancelled().await;
    }

    /// A cancellation scoped to this handle, independent of the parent's
    /// lifetime — used when a node needs its own nested deadline.
    #[must_use]
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
        }
    }
}

impl Default for CancellationHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs `fut` to completion, racing it against cancellation and an
/// optional deadline. Mirrors spec §5's "deadline propagation, not thread
/// termination."
pub async fn with_cancellation<T>(
    handle: &CancellationHandle,
    deadline: Option<Duration>,
    fut: impl std::future::Future<Output = T>,
) -> Result<T, CancelOutcome> {
    tokio::pin!(fut);
    let cancel = handle.cancelled();
    tokio::pin!(cancel);

    match deadline {
        Some(d) => {
            let sleep = tokio::time::sleep(d);
            tokio::pin!(sleep);
            tokio::select! {
                result = &mut fut => Ok(result),
                _ = &mut cancel => Err(CancelOutcome::Cancelled),
                _ = &mut sleep => Err(CancelOutcome::TimedOut),
            }
        }
        None => {
            tokio::select! {
                result = &mut fut => Ok(result),
                _ = &mut cancel => Err(CancelOutcome::Cancelled),
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    Cancelled,
    TimedOut,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn completes_when_not_cancelled() {
        let handle = CancellationHandle::new();
        let result = with_cancellation(&handle, None, async { 42 }).await;
        assert_eq!(result, Ok(42));
    }

    #[tokio::test]
    async fn reports_cancellation() {
        let handle = CancellationHandle::new();
        handle.cancel();
        let result = with_cancellation(&handle, None, std::future::pending::<()>()).await;
        assert_eq!(result, Err(CancelOutcome::Cancelled));
    }

    #[tokio::test]
    async fn reports_timeout() {
        let handle = CancellationHandle::new();
        let result = with_cancellation(
            &handle,
            Some(Duration::from_millis(10)),
            std::future::pending::<()>(),
        )
        .await;
        assert_eq!(result, Err(CancelOutcome::TimedOut));
    }
}
