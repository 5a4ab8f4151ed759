//! The Worker trait and its error taxonomy.

use crate::payload::Payload;
use async_trait::async_trait;

/// Worker (capability) error
///
/// Fatal for a required stage; recorded as `Skipped` for an optional one.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorkerError {
    /// The collaborator did not answer in time
    #[error("Worker timed out after {seconds}s")]
    Timeout {
        /// Seconds waited before giving up
        seconds: u64,
    },

    /// The collaborator answered with an error
    #[error("Provider error: {message}")]
    Provider {
        /// Provider-reported message
        message: String,
    },

    /// The collaborator answered, but the content is unusable
    #[error("Malformed output: {reason}")]
    MalformedOutput {
        /// Why the output was rejected
        reason: String,
    },

    /// The invocation was cancelled mid-flight
    #[error("Worker invocation cancelled")]
    Cancelled,
}

/// External collaborator a stage delegates to
///
/// Implementations may call a language model, a search/scrape service, or
/// any deterministic transform. One invocation takes the assembled
/// payload and yields the text content for the stage's output artifact.
#[async_trait]
pub trait Worker: Send + Sync {
    /// Human-readable worker name for logs and reports
    fn name(&self) -> &str;

    /// Perform the stage's work
    ///
    /// # Errors
    ///
    /// Returns a [`WorkerError`] when the collaborator fails; the
    /// executor decides fatality from the stage's `required` flag.
    async fn invoke(&self, payload: &Payload) -> Result<String, WorkerError>;
}
