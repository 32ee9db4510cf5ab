//! Generation backend trait.
//!
//! A backend wraps one model of one provider. Concrete vendor clients live
//! outside this crate; they translate their SDK errors into
//! [`BackendFailure`] at this boundary so nothing downstream has to inspect
//! vendor exception types.

use async_trait::async_trait;
use tokio::time::Instant;

use crate::error::BackendFailure;

/// A text-generation backend bound to one model.
///
/// Implementations are shared between concurrent requests, so they must not
/// keep mutable per-call state.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Human-readable name used in logs (e.g. the model id).
    fn name(&self) -> &str;

    /// Generates text for `prompt`.
    ///
    /// `deadline` is the point by which the whole request must finish.
    /// Implementations may use it for their own HTTP timeouts; the
    /// orchestrator also drops the returned future once the deadline
    /// passes, which cancels any in-flight work.
    async fn invoke(&self, prompt: &str, deadline: Instant) -> Result<String, BackendFailure>;
}
