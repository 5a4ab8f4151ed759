//! Playbook files.
//!
//! A playbook is the JSON form of a plan: an ordered stage list whose
//! workers are deterministic document templates. Worker implementations
//! beyond templates (model-backed, tool-backed) are wired
//! programmatically against the runtime, not through playbooks.

use scriptorium_core::{IdError, StageId};
use scriptorium_plan::{Plan, PlanError, Stage};
use scriptorium_worker::TemplateWorker;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// Playbook error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlaybookError {
    /// The playbook file could not be read
    #[error("Cannot read playbook: {reason}")]
    Io {
        /// Underlying error rendered as text
        reason: String,
    },

    /// The playbook is not valid JSON of the expected shape
    #[error("Cannot parse playbook: {reason}")]
    Parse {
        /// Decode failure rendered as text
        reason: String,
    },

    /// A stage id was rejected
    #[error(transparent)]
    Id(#[from] IdError),

    /// The stage list failed structural validation
    #[error(transparent)]
    Plan(#[from] PlanError),
}

/// One stage as declared in a playbook
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybookStage {
    /// Stage id
    pub id: String,
    /// Optional human-facing name
    #[serde(default)]
    pub display_name: Option<String>,
    /// Declared inputs (context keys or earlier outputs)
    #[serde(default)]
    pub inputs: Vec<String>,
    /// Output artifact name
    pub output: String,
    /// Whether failure aborts the run (default true)
    #[serde(default = "default_required")]
    pub required: bool,
    /// Document template rendered against the payload
    pub template: String,
}

const fn default_required() -> bool {
    true
}

/// An ordered stage list in JSON form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Playbook {
    /// Optional playbook name, for reports only
    #[serde(default)]
    pub name: Option<String>,
    /// Designated final artifact; defaults to the last stage's output
    #[serde(default)]
    pub final_artifact: Option<String>,
    /// Stages in execution order
    pub stages: Vec<PlaybookStage>,
}

impl Playbook {
    /// Load a playbook from a JSON file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or decoded.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PlaybookError> {
        let text = std::fs::read_to_string(path.as_ref()).map_err(|e| PlaybookError::Io {
            reason: e.to_string(),
        })?;
        serde_json::from_str(&text).map_err(|e| PlaybookError::Parse {
            reason: e.to_string(),
        })
    }

    /// Build the validated plan, backing every stage with a template worker
    ///
    /// # Errors
    ///
    /// Returns an error on invalid stage ids or structural plan problems.
    pub fn into_plan(self) -> Result<Plan, PlaybookError> {
        let mut stages = Vec::with_capacity(self.stages.len());
        for declared in self.stages {
            let id = StageId::new(declared.id)?;
            let worker = TemplateWorker::new(id.as_str().to_string(), declared.template);
            let mut stage =
                Stage::new(id, Arc::new(worker), declared.output).with_inputs(declared.inputs);
            if let Some(name) = declared.display_name {
                stage = stage.with_display_name(name);
            }
            if !declared.required {
                stage = stage.optional();
            }
            stages.push(stage);
        }
        Ok(Plan::new(stages)?)
    }

    /// Input names that must come from the run context
    ///
    /// Everything a stage declares that no earlier stage produces.
    #[must_use]
    pub fn context_inputs(&self) -> Vec<&str> {
        let mut needed: Vec<&str> = Vec::new();
        for (idx, stage) in self.stages.iter().enumerate() {
            for input in &stage.inputs {
                let produced_earlier = self.stages[..idx].iter().any(|s| s.output == *input);
                if !produced_earlier && !needed.contains(&input.as_str()) {
                    needed.push(input);
                }
            }
        }
        needed
    }
}
