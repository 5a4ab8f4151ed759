//! Artifact types.

use scriptorium_core::{StageId, Timestamp};
use serde::{Deserialize, Serialize};

/// Metadata recorded alongside an artifact's content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactMeta {
    /// Stage that produced the artifact; `None` for artifacts recovered
    /// from a mirror directory, where the producer is no longer known
    pub produced_by: Option<StageId>,
    /// When the artifact was stored
    pub created_at: Timestamp,
    /// Content size in bytes
    pub size_bytes: u64,
}

/// A named, immutable-once-written text artifact exchanged between stages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    /// Unique name within the run
    pub name: String,
    /// Artifact content (arbitrary text, typically markdown)
    pub content: String,
    /// Metadata
    pub meta: ArtifactMeta,
}

impl Artifact {
    /// Create a new artifact produced by a stage
    #[must_use]
    pub fn new(name: impl Into<String>, content: impl Into<String>, produced_by: StageId) -> Self {
        let content = content.into();
        Self {
            name: name.into(),
            meta: ArtifactMeta {
                produced_by: Some(produced_by),
                created_at: Timestamp::now(),
                size_bytes: content.len() as u64,
            },
            content,
        }
    }

    /// Create an artifact recovered from a mirror file
    #[must_use]
    pub fn recovered(name: impl Into<String>, content: impl Into<String>) -> Self {
        let content = content.into();
        Self {
            name: name.into(),
            meta: ArtifactMeta {
                produced_by: None,
                created_at: Timestamp::now(),
                size_bytes: content.len() as u64,
            },
            content,
        }
    }

    /// Check whether the given stage is the declared producer
    #[must_use]
    pub fn is_produced_by(&self, stage_id: &StageId) -> bool {
        self.meta.produced_by.as_ref() == Some(stage_id)
    }
}
