//! Canned-content worker.

use crate::payload::Payload;
use crate::worker::{Worker, WorkerError};
use async_trait::async_trait;

/// Worker that returns fixed content regardless of payload
///
/// Useful for dry runs and tests, and as the degenerate deterministic
/// transform.
#[derive(Debug, Clone)]
pub struct FixedWorker {
    name: String,
    content: String,
}

impl FixedWorker {
    /// Create a fixed worker
    #[must_use]
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }
}

#[async_trait]
impl Worker for FixedWorker {
    fn name(&self) -> &str {
        &self.name
    }

    async fn invoke(&self, _payload: &Payload) -> Result<String, WorkerError> {
        Ok(self.content.clone())
    }
}
