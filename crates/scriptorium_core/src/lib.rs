//! SCRIPTORIUM Core Types
//!
//! This crate contains pure types with no I/O: run and stage identifiers,
//! wall-clock timestamps for record metadata, and the immutable context
//! map shared by every stage of a run.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod context;
pub mod id;
pub mod time;

// Re-exports
pub use context::{Context, ContextBuilder};
pub use id::{IdError, RunId, StageId};
pub use time::Timestamp;
