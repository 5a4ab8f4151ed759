//! SCRIPTORIUM Runtime
//!
//! The pipeline executor: drives an ordered stage list on a single
//! logical thread of control, resolves each stage's inputs, paces all
//! worker invocations through one global fixed-window rate limiter, and
//! appends every lifecycle event to the execution log. The only
//! suspension points are the pacer wait and the worker invocation.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod engine;
pub mod pacer;
pub mod report;

// Re-exports
pub use engine::{EngineConfig, PipelineEngine};
pub use pacer::{PacerConfig, PacerError, Permit, RatePacer};
pub use report::{RunError, RunFailure, RunReport};
