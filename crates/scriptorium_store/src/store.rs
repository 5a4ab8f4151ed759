//! In-memory artifact store with optional file mirroring.

use crate::artifact::Artifact;
use indexmap::IndexMap;
use scriptorium_core::StageId;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Store error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// An unrelated stage attempted to overwrite an existing artifact
    #[error("Artifact {name:?} is already owned by stage {owner}; stage {attempted} may not overwrite it")]
    Duplicate {
        /// Artifact name
        name: String,
        /// Declared producer
        owner: StageId,
        /// Stage that attempted the write
        attempted: StageId,
    },

    /// Artifact not found
    #[error("Artifact not found: {name:?}")]
    NotFound {
        /// Requested name
        name: String,
    },

    /// Artifact name unusable as a store key or mirror file name
    #[error("Invalid artifact name {name:?}: {reason}")]
    InvalidName {
        /// Rejected name
        name: String,
        /// Why it was rejected
        reason: String,
    },

    /// IO error while mirroring
    #[error("IO error: {reason}")]
    Io {
        /// Underlying error rendered as text
        reason: String,
    },
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            reason: err.to_string(),
        }
    }
}

/// Store statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    /// Number of stored artifacts
    pub artifact_count: usize,
    /// Total content bytes stored
    pub total_bytes: u64,
}

/// Durable mapping from artifact name to content for one run
///
/// The store is owned and exclusively mutated by the pipeline executor on
/// a single control thread, so it needs no internal locking. Writes are
/// ordered by stage order; a name is written once by its declared
/// producer and immutable to every other stage.
#[derive(Debug, Default)]
pub struct ArtifactStore {
    artifacts: IndexMap<String, Artifact>,
    mirror_dir: Option<PathBuf>,
}

impl ArtifactStore {
    /// Create an in-memory store with no mirroring
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store mirroring every artifact to `<dir>/<name>`
    ///
    /// The directory is created if absent. Mirror files are overwritten
    /// on each run.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn with_mirror(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            artifacts: IndexMap::new(),
            mirror_dir: Some(dir),
        })
    }

    /// The mirror directory, if mirroring is enabled
    #[must_use]
    pub fn mirror_dir(&self) -> Option<&Path> {
        self.mirror_dir.as_deref()
    }

    /// Store an artifact under `name` on behalf of `producer`
    ///
    /// The declared producer may overwrite its own earlier write
    /// (idempotent re-put); any other stage gets
    /// [`StoreError::Duplicate`]. Artifacts recovered from a mirror have
    /// no owner and may be replaced by any producer.
    ///
    /// # Errors
    ///
    /// Returns an error on ownership violation, invalid name, or a
    /// mirror write failure.
    pub fn put(
        &mut self,
        name: &str,
        content: impl Into<String>,
        producer: &StageId,
    ) -> Result<&Artifact, StoreError> {
        validate_name(name)?;

        if let Some(existing) = self.artifacts.get(name) {
            if let Some(owner) = &existing.meta.produced_by {
                if owner != producer {
                    return Err(StoreError::Duplicate {
                        name: name.to_string(),
                        owner: owner.clone(),
                        attempted: producer.clone(),
                    });
                }
            }
        }

        let artifact = Artifact::new(name, content, producer.clone());
        if let Some(dir) = &self.mirror_dir {
            std::fs::write(dir.join(name), &artifact.content)?;
        }

        self.artifacts.insert(name.to_string(), artifact);
        Ok(&self.artifacts[name])
    }

    /// Fetch an artifact by name
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if absent.
    pub fn get(&self, name: &str) -> Result<&Artifact, StoreError> {
        self.artifacts.get(name).ok_or_else(|| StoreError::NotFound {
            name: name.to_string(),
        })
    }

    /// Non-failing existence check
    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        self.artifacts.contains_key(name)
    }

    /// Recover mirrored artifacts from the mirror directory
    ///
    /// Reads every regular UTF-8 file in the mirror directory into the
    /// store under its file name, skipping names already present in
    /// memory. Recovered artifacts carry no producer. Returns the number
    /// of artifacts recovered.
    ///
    /// # Errors
    ///
    /// Returns an error if no mirror is configured or the directory
    /// cannot be read.
    pub fn hydrate(&mut self) -> Result<usize, StoreError> {
        let dir = self.mirror_dir.clone().ok_or_else(|| StoreError::Io {
            reason: "no mirror directory configured".to_string(),
        })?;

        let mut recovered = 0;
        let mut entries: Vec<PathBuf> = std::fs::read_dir(&dir)?
            .filter_map(Result::ok)
            .map(|e| e.path())
            .filter(|p| p.is_file())
            .collect();
        entries.sort();

        for path in entries {
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if self.artifacts.contains_key(name) {
                continue;
            }
            let Ok(content) = std::fs::read_to_string(&path) else {
                // Non-UTF-8 files are not artifacts
                continue;
            };
            self.artifacts
                .insert(name.to_string(), Artifact::recovered(name, content));
            recovered += 1;
        }

        Ok(recovered)
    }

    /// Artifact names in insertion (production) order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.artifacts.keys().map(String::as_str)
    }

    /// Artifacts in insertion (production) order
    pub fn artifacts(&self) -> impl Iterator<Item = &Artifact> {
        self.artifacts.values()
    }

    /// Number of stored artifacts
    #[must_use]
    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    /// Check whether the store is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }

    /// Current store statistics
    #[must_use]
    pub fn stats(&self) -> StoreStats {
        StoreStats {
            artifact_count: self.artifacts.len(),
            total_bytes: self.artifacts.values().map(|a| a.meta.size_bytes).sum(),
        }
    }
}

fn validate_name(name: &str) -> Result<(), StoreError> {
    if name.is_empty() {
        return Err(StoreError::InvalidName {
            name: name.to_string(),
            reason: "empty name".to_string(),
        });
    }
    if name.contains('/') || name.contains('\\') || name == "." || name == ".." {
        return Err(StoreError::InvalidName {
            name: name.to_string(),
            reason: "path separators are not allowed".to_string(),
        });
    }
    Ok(())
}
