//! Invocation payloads.

use scriptorium_core::Context;
use serde::{Deserialize, Serialize};

/// One resolved input artifact, by declaration order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedInput {
    /// Name the stage declared (context key or artifact name)
    pub name: String,
    /// Resolved content
    pub content: String,
}

/// Everything a worker sees for one invocation
///
/// The run context plus the stage's declared inputs, resolved by the
/// executor in declaration order before the call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payload {
    context: Context,
    inputs: Vec<ResolvedInput>,
}

impl Payload {
    /// Assemble a payload from the run context and resolved inputs
    #[must_use]
    pub fn new(context: Context, inputs: Vec<ResolvedInput>) -> Self {
        Self { context, inputs }
    }

    /// The run context
    #[must_use]
    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Resolved inputs in declaration order
    #[must_use]
    pub fn inputs(&self) -> &[ResolvedInput] {
        &self.inputs
    }

    /// Look up a context value
    #[must_use]
    pub fn value(&self, key: &str) -> Option<&str> {
        self.context.get(key)
    }

    /// Look up a resolved input by declared name
    #[must_use]
    pub fn input(&self, name: &str) -> Option<&str> {
        self.inputs
            .iter()
            .find(|i| i.name == name)
            .map(|i| i.content.as_str())
    }

    /// Look up a name against the context first, then the inputs
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<&str> {
        self.value(name).or_else(|| self.input(name))
    }
}
