//! Per-call execution options for destination runs.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::{DestinationError, Result};

/// Runtime options for one `execute` or `test` call.
///
/// Every long-running stage (image pull, stdin write, container wait, log
/// fetch, HTTP request) runs under the same deadline and cancellation
/// token. Cleanup does not: it has its own bounded timeout.
#[derive(Debug, Clone, Default)]
pub struct ExecutionOptions {
    /// Caller-supplied idempotency token. When absent the run key is
    /// derived from the run inputs.
    pub idempotency_key: Option<String>,
    /// Absolute deadline for the whole call.
    pub deadline: Option<Instant>,
    /// Cooperative cancellation.
    pub cancel: CancellationToken,
}

impl ExecutionOptions {
    /// Options with a deadline `timeout` from now.
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            deadline: Some(Instant::now() + timeout),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }

    #[must_use]
    pub fn cancel_token(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Drive `fut` to completion unless the deadline passes or the token
    /// is cancelled first.
    ///
    /// # Errors
    ///
    /// Returns [`DestinationError::DeadlineExceeded`] or
    /// [`DestinationError::Cancelled`] tagged with `stage`, or the future's
    /// own error.
    pub async fn run_stage<T, F>(&self, stage: &'static str, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        if self.cancel.is_cancelled() {
            return Err(DestinationError::Cancelled { stage });
        }
        let deadline = async {
            match self.deadline {
                Some(at) => tokio::time::sleep_until(at).await,
                None => std::future::pending::<()>().await,
            }
        };
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => {
                tracing::warn!(stage, "Run cancelled");
                Err(DestinationError::Cancelled { stage })
            }
            () = deadline => {
                tracing::warn!(stage, "Run deadline exceeded");
                Err(DestinationError::DeadlineExceeded { stage })
            }
            out = fut => out,
        }
    }
}
