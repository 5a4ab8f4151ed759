//! Validated pipeline plans.

use crate::stage::Stage;
use indexmap::IndexMap;
use scriptorium_core::{Context, StageId};

/// Structural pipeline error, detected before any stage runs
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlanError {
    /// The stage list was empty
    #[error("Pipeline has no stages")]
    EmptyPlan,

    /// Two stages share an id
    #[error("Duplicate stage id {id}")]
    DuplicateStageId {
        /// The repeated id
        id: StageId,
    },

    /// Two stages declare the same output artifact
    #[error("Stages {first} and {second} both declare output artifact {name:?}")]
    DuplicateOutput {
        /// The contested artifact name
        name: String,
        /// Earlier declaring stage
        first: StageId,
        /// Later declaring stage
        second: StageId,
    },

    /// An output name is unusable as an artifact name
    #[error("Stage {stage} output {name:?} is not a valid artifact name")]
    InvalidOutputName {
        /// Declaring stage
        stage: StageId,
        /// Rejected name
        name: String,
    },

    /// An input names the output of this or a later stage
    #[error("Stage {stage} input {name:?} refers to a later stage's output")]
    ForwardReference {
        /// Referring stage
        stage: StageId,
        /// Offending input name
        name: String,
    },

    /// An input matches neither a context key nor an earlier output
    #[error("Stage {stage} input {name:?} matches no context key and no earlier stage's output")]
    UnknownInput {
        /// Referring stage
        stage: StageId,
        /// Unresolvable input name
        name: String,
    },
}

/// Ordered sequence of stages; insertion order is execution order
///
/// Construction performs the context-independent structural checks
/// (emptiness, duplicate ids, duplicate outputs, forward references).
/// [`Plan::validate_against`] completes validation once the run context
/// is known, before the first invocation.
#[derive(Debug, Clone)]
pub struct Plan {
    stages: Vec<Stage>,
}

impl Plan {
    /// Build a plan from an ordered stage list
    ///
    /// # Errors
    ///
    /// Returns the first structural [`PlanError`] found.
    pub fn new(stages: Vec<Stage>) -> Result<Self, PlanError> {
        if stages.is_empty() {
            return Err(PlanError::EmptyPlan);
        }

        // Duplicate ids and outputs, and output-name hygiene
        let mut outputs: IndexMap<&str, &StageId> = IndexMap::new();
        let mut ids: IndexMap<&StageId, ()> = IndexMap::new();
        for stage in &stages {
            if ids.insert(stage.id(), ()).is_some() {
                return Err(PlanError::DuplicateStageId {
                    id: stage.id().clone(),
                });
            }
            let output = stage.output();
            if output.is_empty()
                || output.contains('/')
                || output.contains('\\')
                || output == "."
                || output == ".."
            {
                return Err(PlanError::InvalidOutputName {
                    stage: stage.id().clone(),
                    name: output.to_string(),
                });
            }
            if let Some(first) = outputs.insert(output, stage.id()) {
                return Err(PlanError::DuplicateOutput {
                    name: output.to_string(),
                    first: first.clone(),
                    second: stage.id().clone(),
                });
            }
        }

        // Forward (and degenerate cyclic) references: an input naming the
        // output of this stage or any later one
        for (idx, stage) in stages.iter().enumerate() {
            let earlier: Vec<&str> = stages[..idx].iter().map(Stage::output).collect();
            for input in stage.inputs() {
                let is_earlier = earlier.contains(&input.as_str());
                let is_declared_output = outputs.contains_key(input.as_str());
                if is_declared_output && !is_earlier {
                    return Err(PlanError::ForwardReference {
                        stage: stage.id().clone(),
                        name: input.clone(),
                    });
                }
            }
        }

        Ok(Self { stages })
    }

    /// Complete validation against the run context
    ///
    /// Every declared input must name a context key or an earlier
    /// stage's output.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::UnknownInput`] for the first unresolvable
    /// input.
    pub fn validate_against(&self, context: &Context) -> Result<(), PlanError> {
        for (idx, stage) in self.stages.iter().enumerate() {
            for input in stage.inputs() {
                if context.contains_key(input) {
                    continue;
                }
                let produced_earlier = self.stages[..idx]
                    .iter()
                    .any(|s| s.output() == input.as_str());
                if !produced_earlier {
                    return Err(PlanError::UnknownInput {
                        stage: stage.id().clone(),
                        name: input.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Stages in execution order
    #[must_use]
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Number of stages
    #[must_use]
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// A plan is never empty; kept for API symmetry
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Output artifact name of the last stage
    #[allow(clippy::missing_panics_doc)]
    #[must_use]
    pub fn final_output(&self) -> &str {
        self.stages.last().expect("plan is never empty").output()
    }

    /// Look up a stage by id
    #[must_use]
    pub fn stage(&self, id: &StageId) -> Option<&Stage> {
        self.stages.iter().find(|s| s.id() == id)
    }
}
