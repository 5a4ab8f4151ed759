//! Retry decorator for the worker boundary.
//!
//! The executor itself performs exactly one attempt per stage; a retry
//! policy wraps the capability, not the executor.

use crate::payload::Payload;
use crate::worker::{Worker, WorkerError};
use async_trait::async_trait;

/// Decorator retrying a worker a fixed number of attempts
///
/// Retries immediately on `Timeout`, `Provider`, and `MalformedOutput`;
/// `Cancelled` is never retried. The last error is returned when the
/// attempt budget is exhausted.
#[derive(Debug, Clone)]
pub struct RetryWorker<W> {
    inner: W,
    attempts: u32,
}

impl<W: Worker> RetryWorker<W> {
    /// Wrap `inner` with an attempt budget (minimum 1)
    #[must_use]
    pub fn new(inner: W, attempts: u32) -> Self {
        Self {
            inner,
            attempts: attempts.max(1),
        }
    }

    /// The configured attempt budget
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        self.attempts
    }
}

#[async_trait]
impl<W: Worker> Worker for RetryWorker<W> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn invoke(&self, payload: &Payload) -> Result<String, WorkerError> {
        let mut last_err = WorkerError::Cancelled;
        for attempt in 1..=self.attempts {
            match self.inner.invoke(payload).await {
                Ok(content) => return Ok(content),
                Err(WorkerError::Cancelled) => return Err(WorkerError::Cancelled),
                Err(err) => {
                    if attempt < self.attempts {
                        tracing::warn!(
                            worker = self.inner.name(),
                            attempt,
                            error = %err,
                            "worker attempt failed, retrying"
                        );
                    }
                    last_err = err;
                }
            }
        }
        Err(last_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scriptorium_core::Context;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Fails `failures` times, then succeeds
    struct Flaky {
        failures: u32,
        calls: AtomicU32,
        terminal: Option<WorkerError>,
    }

    impl Flaky {
        fn new(failures: u32) -> Self {
            Self {
                failures,
                calls: AtomicU32::new(0),
                terminal: None,
            }
        }

        fn cancelled() -> Self {
            Self {
                failures: u32::MAX,
                calls: AtomicU32::new(0),
                terminal: Some(WorkerError::Cancelled),
            }
        }
    }

    #[async_trait]
    impl Worker for Flaky {
        fn name(&self) -> &str {
            "flaky"
        }

        async fn invoke(&self, _payload: &Payload) -> Result<String, WorkerError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                Err(self.terminal.clone().unwrap_or(WorkerError::Provider {
                    message: "transient".to_string(),
                }))
            } else {
                Ok("content".to_string())
            }
        }
    }

    fn payload() -> Payload {
        Payload::new(Context::new(), Vec::new())
    }

    #[tokio::test]
    async fn test_retry_succeeds_after_transient_failures() {
        let worker = RetryWorker::new(Flaky::new(2), 3);
        assert_eq!(worker.invoke(&payload()).await.unwrap(), "content");
        assert_eq!(worker.inner.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_exhausts_budget() {
        let worker = RetryWorker::new(Flaky::new(5), 3);
        let err = worker.invoke(&payload()).await.unwrap_err();
        assert_eq!(
            err,
            WorkerError::Provider {
                message: "transient".to_string()
            }
        );
        assert_eq!(worker.inner.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_never_retries_cancelled() {
        let worker = RetryWorker::new(Flaky::cancelled(), 3);
        let err = worker.invoke(&payload()).await.unwrap_err();
        assert_eq!(err, WorkerError::Cancelled);
        assert_eq!(worker.inner.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_zero_attempts_clamps_to_one() {
        let worker = RetryWorker::new(Flaky::new(0), 0);
        assert_eq!(worker.attempts(), 1);
        assert_eq!(worker.invoke(&payload()).await.unwrap(), "content");
    }
}
