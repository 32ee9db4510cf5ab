//! November - tiered text generation for chat bots
//!
//! A request runs through an ordered plan of model tiers under one deadline.
//! Failures are classified into a closed set of kinds, and only an
//! overloaded backend moves the plan to the next tier. Successful text is
//! bounded, defanged and split into chunks that fit a chat message, with code
//! fences repaired across chunk boundaries.

pub mod backend;
pub mod chunker;
pub mod config;
pub mod delivery;
pub mod error;
pub mod logging;
pub mod orchestrator;
pub mod progress;
pub mod prompt;
pub mod reply;
pub mod responder;

pub use backend::GenerationBackend;
pub use chunker::{chunk, Chunker, ChunkerConfig, OutputChunk};
pub use config::{ConfigError, PipelineConfig};
pub use delivery::{deliver, ChunkSink, DeliveryError};
pub use error::{BackendFailure, ErrorClassifier, ErrorKind, GenerationFailure};
pub use orchestrator::{
    GenerationOutcome, GenerationReport, Orchestrator, OrchestratorError, TierPlan, TierRank,
};
pub use prompt::{PromptError, PromptMode, PromptRequest, PromptTemplate};
pub use reply::ReplyBook;
pub use responder::{RespondError, Responder, ResponseSummary};
