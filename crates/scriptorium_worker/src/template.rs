//! Deterministic template worker.

use crate::payload::Payload;
use crate::worker::{Worker, WorkerError};
use async_trait::async_trait;

/// Worker that renders a text template against the payload
///
/// Placeholders of the form `{name}` resolve against the context first,
/// then the resolved inputs, so a template can splice both the subject
/// and earlier artifacts into its output. An unresolvable placeholder is
/// a [`WorkerError::MalformedOutput`]; there is no escape syntax.
#[derive(Debug, Clone)]
pub struct TemplateWorker {
    name: String,
    template: String,
}

impl TemplateWorker {
    /// Create a template worker
    #[must_use]
    pub fn new(name: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            template: template.into(),
        }
    }

    /// The raw template text
    #[must_use]
    pub fn template(&self) -> &str {
        &self.template
    }

    fn render(&self, payload: &Payload) -> Result<String, WorkerError> {
        let mut out = String::with_capacity(self.template.len());
        let mut rest = self.template.as_str();

        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            rest = &rest[open + 1..];
            let Some(close) = rest.find('}') else {
                return Err(WorkerError::MalformedOutput {
                    reason: "unterminated placeholder".to_string(),
                });
            };
            let key = &rest[..close];
            let Some(value) = payload.lookup(key) else {
                return Err(WorkerError::MalformedOutput {
                    reason: format!("unresolved placeholder {{{key}}}"),
                });
            };
            out.push_str(value);
            rest = &rest[close + 1..];
        }
        out.push_str(rest);
        Ok(out)
    }
}

#[async_trait]
impl Worker for TemplateWorker {
    fn name(&self) -> &str {
        &self.name
    }

    async fn invoke(&self, payload: &Payload) -> Result<String, WorkerError> {
        self.render(payload)
    }
}
