//! Log entry and record types.

use scriptorium_core::{RunId, StageId, Timestamp};
use serde::{Deserialize, Serialize};

/// Terminal outcome of one stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    /// Stage completed and wrote its output artifact
    Succeeded {
        /// Name of the output artifact
        output: String,
    },
    /// Stage failed fatally
    Failed {
        /// Failure reason rendered as text
        reason: String,
    },
    /// Optional stage failed and was bypassed
    Skipped {
        /// Skip reason rendered as text
        reason: String,
    },
}

impl Outcome {
    /// Check whether the stage succeeded
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }

    /// Check whether the stage failed fatally
    #[must_use]
    pub const fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    /// Check whether the stage was skipped
    #[must_use]
    pub const fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped { .. })
    }

    /// Output artifact name, if the stage succeeded
    #[must_use]
    pub fn output(&self) -> Option<&str> {
        match self {
            Self::Succeeded { output } => Some(output),
            _ => None,
        }
    }
}

/// One stage's completed lifecycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Run this entry belongs to
    pub run_id: RunId,
    /// Stage the entry describes
    pub stage_id: StageId,
    /// When the stage entered `Running`
    pub started_at: Timestamp,
    /// When the stage reached a terminal state
    pub finished_at: Timestamp,
    /// Terminal outcome
    pub outcome: Outcome,
}

/// Wire record appended to the durable sink
///
/// A `StageStarted` record is appended when a stage enters `Running` and
/// a `StageFinished` record when it reaches a terminal state, so a crash
/// mid-invocation still leaves the started marker on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogRecord {
    /// Stage entered `Running`
    StageStarted {
        /// Run this record belongs to
        run_id: RunId,
        /// Stage that started
        stage_id: StageId,
        /// Start time
        at: Timestamp,
    },
    /// Stage reached a terminal state
    StageFinished(LogEntry),
}

impl LogRecord {
    /// Stage the record refers to
    #[must_use]
    pub fn stage_id(&self) -> &StageId {
        match self {
            Self::StageStarted { stage_id, .. } => stage_id,
            Self::StageFinished(entry) => &entry.stage_id,
        }
    }

    /// Check whether this is a terminal record
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::StageFinished(_))
    }
}
