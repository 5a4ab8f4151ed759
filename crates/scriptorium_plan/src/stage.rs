//! Stage records.

use scriptorium_core::StageId;
use scriptorium_worker::Worker;
use std::sync::Arc;

/// One declarative unit of pipeline work
///
/// A stage names the worker it delegates to, the artifacts (or context
/// keys) it consumes, and the single artifact it must produce. Stages
/// default to `required`: their failure aborts the whole run.
#[derive(Clone)]
pub struct Stage {
    id: StageId,
    display_name: String,
    worker: Arc<dyn Worker>,
    inputs: Vec<String>,
    output: String,
    required: bool,
}

impl Stage {
    /// Create a required stage with no inputs
    #[must_use]
    pub fn new(id: StageId, worker: Arc<dyn Worker>, output: impl Into<String>) -> Self {
        let display_name = id.as_str().to_string();
        Self {
            id,
            display_name,
            worker,
            inputs: Vec::new(),
            output: output.into(),
            required: true,
        }
    }

    /// Set a human-facing display name (defaults to the stage id)
    #[must_use]
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = name.into();
        self
    }

    /// Append a declared input (context key or earlier stage's output)
    #[must_use]
    pub fn with_input(mut self, name: impl Into<String>) -> Self {
        self.inputs.push(name.into());
        self
    }

    /// Append several declared inputs, in order
    #[must_use]
    pub fn with_inputs<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inputs.extend(names.into_iter().map(Into::into));
        self
    }

    /// Mark the stage optional: its failure is recorded and bypassed
    #[must_use]
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Stage identity
    #[must_use]
    pub fn id(&self) -> &StageId {
        &self.id
    }

    /// Human-facing name
    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// The worker this stage delegates to
    #[must_use]
    pub fn worker(&self) -> &Arc<dyn Worker> {
        &self.worker
    }

    /// Declared inputs in order
    #[must_use]
    pub fn inputs(&self) -> &[String] {
        &self.inputs
    }

    /// Name of the output artifact this stage must produce
    #[must_use]
    pub fn output(&self) -> &str {
        &self.output
    }

    /// Whether failure aborts the whole run
    #[must_use]
    pub const fn required(&self) -> bool {
        self.required
    }
}

impl std::fmt::Debug for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stage")
            .field("id", &self.id)
            .field("display_name", &self.display_name)
            .field("worker", &self.worker.name())
            .field("inputs", &self.inputs)
            .field("output", &self.output)
            .field("required", &self.required)
            .finish()
    }
}
