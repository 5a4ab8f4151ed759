//! Unique identifiers for SCRIPTORIUM entities.
//!
//! Runs get random UUIDs; stages carry human-chosen names that double as
//! identifiers in logs and reports.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    /// Stage id was empty
    #[error("Stage id must not be empty")]
    Empty,

    /// Stage id contained whitespace or path separators
    #[error("Stage id {id:?} contains forbidden characters")]
    ForbiddenCharacters {
        /// The rejected id
        id: String,
    },
}

/// Run identifier - identifies a single pipeline execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RunId(Uuid);

impl RunId {
    /// Create a new random RunId
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create from UUID bytes
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }

    /// Get as UUID
    #[must_use]
    pub const fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "run_{}", self.0)
    }
}

/// Stage identifier - a stable human-chosen name for one unit of work
///
/// Stage ids appear in execution-log records and abort reports, so they
/// are plain strings rather than UUIDs. Ids must be non-empty and free of
/// whitespace and path separators (they may be used as file-name stems).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StageId(String);

impl StageId {
    /// Create a validated stage id
    ///
    /// # Errors
    ///
    /// Returns an error if the id is empty or contains whitespace or
    /// path separators.
    pub fn new(id: impl Into<String>) -> Result<Self, IdError> {
        let id = id.into();
        if id.is_empty() {
            return Err(IdError::Empty);
        }
        if id.chars().any(|c| c.is_whitespace() || c == '/' || c == '\\') {
            return Err(IdError::ForbiddenCharacters { id });
        }
        Ok(Self(id))
    }

    /// Get as string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for StageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for StageId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
