//! SCRIPTORIUM Worker Boundary
//!
//! The capability interface stages delegate to. A worker is an opaque,
//! potentially slow, potentially failing external collaborator: an LLM
//! call, a search service, or a deterministic transform. The executor is
//! agnostic to what happens inside.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod fixed;
pub mod payload;
pub mod retry;
pub mod template;
pub mod worker;

// Re-exports
pub use fixed::FixedWorker;
pub use payload::{Payload, ResolvedInput};
pub use retry::RetryWorker;
pub use template::TemplateWorker;
pub use worker::{Worker, WorkerError};
