//! The shared run context.
//!
//! A context is an immutable-at-creation mapping from string key to string
//! value (e.g. the subject being authored), supplied once at pipeline
//! start and visible to every stage without mutation. Keys keep insertion
//! order so payloads and reports render deterministically.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Immutable key/value input available to every stage of a run
///
/// There is deliberately no mutating access: once built, a context is
/// shared by reference across all stage invocations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Context {
    values: IndexMap<String, String>,
}

impl Context {
    /// Create an empty context
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start building a context
    #[must_use]
    pub fn builder() -> ContextBuilder {
        ContextBuilder::default()
    }

    /// Look up a value by key
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Check whether a key is present
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Iterate keys in insertion order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Iterate key/value pairs in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check whether the context is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl FromIterator<(String, String)> for Context {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

/// Builder for [`Context`]
#[derive(Debug, Clone, Default)]
pub struct ContextBuilder {
    values: IndexMap<String, String>,
}

impl ContextBuilder {
    /// Add a key/value pair; a repeated key replaces the earlier value
    #[must_use]
    pub fn value(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Finish building
    #[must_use]
    pub fn build(self) -> Context {
        Context {
            values: self.values,
        }
    }
}
