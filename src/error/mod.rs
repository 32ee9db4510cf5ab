//! Failure classification module
//!
//! Backends fail with tagged [`BackendFailure`]s; the [`ErrorClassifier`] maps
//! those onto the closed [`ErrorKind`] set that the orchestrator and callers
//! act on.

pub mod classification;
pub mod classifier;

// Re-export main types for convenient access
pub use classification::{BackendFailure, ErrorKind, GenerationFailure};
pub use classifier::ErrorClassifier;
