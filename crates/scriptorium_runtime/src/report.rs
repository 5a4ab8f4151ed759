//! Run results and the fatal-error taxonomy.

use crate::pacer::PacerError;
use scriptorium_core::{RunId, StageId};
use scriptorium_log::{LogEntry, LogError};
use scriptorium_plan::PlanError;
use scriptorium_store::{Artifact, ArtifactStore, StoreError};
use scriptorium_worker::WorkerError;

/// Fatal run error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RunError {
    /// Structural pipeline problem detected before any stage ran
    #[error(transparent)]
    Plan(#[from] PlanError),

    /// A declared dependency was absent at run time
    ///
    /// Validation resolves every input up front, so this indicates
    /// either a skipped optional producer or a logic bug; both abort.
    #[error("Stage {stage} is missing dependency {name:?}")]
    MissingDependency {
        /// Stage whose input could not be resolved
        stage: StageId,
        /// The missing name
        name: String,
    },

    /// A required stage's worker failed
    #[error("Stage {stage} failed: {source}")]
    StageFailed {
        /// The failing stage
        stage: StageId,
        /// The worker error
        source: WorkerError,
    },

    /// Artifact store rejected a write
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Execution log could not be appended
    #[error(transparent)]
    Log(#[from] LogError),

    /// Rate-limit wait exceeded its configured bound
    #[error(transparent)]
    Pacer(#[from] PacerError),

    /// Cooperative cancellation was observed at a stage boundary
    #[error("Run cancelled before stage {stage} completed")]
    Cancelled {
        /// First stage not run (or not completed) due to cancellation
        stage: StageId,
    },

    /// The designated final artifact was never produced
    #[error("Final artifact {name:?} was not produced")]
    FinalArtifactMissing {
        /// The designated name
        name: String,
    },
}

/// An aborted run: the terminating error plus everything logged so far
///
/// A failed run never loses its log; the entries accumulated up to the
/// abort always accompany the error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{error}")]
pub struct RunFailure {
    /// Stage that caused the abort; `None` for pre-run validation
    /// failures and a missing final artifact
    pub stage_id: Option<StageId>,
    /// The terminating error
    pub error: RunError,
    /// Log entries accumulated before the abort
    pub entries: Vec<LogEntry>,
}

/// A completed run
#[derive(Debug)]
pub struct RunReport {
    /// The run's identity
    pub run_id: RunId,
    /// The designated final artifact
    pub final_artifact: Artifact,
    /// Full execution log, in stage order
    pub entries: Vec<LogEntry>,
    /// The artifact store, for inspection of intermediate artifacts
    pub store: ArtifactStore,
}

impl RunReport {
    /// Content of the final artifact
    #[must_use]
    pub fn final_content(&self) -> &str {
        &self.final_artifact.content
    }

    /// Number of stages that succeeded
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.entries.iter().filter(|e| e.outcome.is_success()).count()
    }

    /// Number of stages that were skipped
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.entries.iter().filter(|e| e.outcome.is_skipped()).count()
    }
}
