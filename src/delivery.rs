//! Chunk delivery.
//!
//! A chat transport shows a placeholder while a request is in flight. The
//! first chunk replaces that placeholder and every further chunk is posted
//! as a follow-up, strictly in order.

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, warn};

use crate::chunker::OutputChunk;

/// Errors reported by a [`ChunkSink`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    /// The placeholder message no longer exists or cannot be edited.
    #[error("placeholder unavailable: {0}")]
    PlaceholderGone(String),

    /// The transport rejected the message.
    #[error("transport rejected message: {0}")]
    Rejected(String),

    /// Network or API error.
    #[error("transport error: {0}")]
    Transport(String),
}

/// Where chunks are sent.
#[async_trait]
pub trait ChunkSink: Send + Sync {
    /// Replaces the in-flight placeholder with `text`.
    async fn replace_placeholder(&self, text: &str) -> Result<(), DeliveryError>;

    /// Posts `text` as a new message after the placeholder.
    async fn follow_up(&self, text: &str) -> Result<(), DeliveryError>;
}

/// Sends `chunks` in order, stopping at the first error.
///
/// Returns the number of chunks delivered.
pub async fn deliver<S>(sink: &S, chunks: &[OutputChunk]) -> Result<usize, DeliveryError>
where
    S: ChunkSink + ?Sized,
{
    for chunk in chunks {
        let sent = if chunk.is_first() {
            sink.replace_placeholder(chunk.as_str()).await
        } else {
            sink.follow_up(chunk.as_str()).await
        };

        if let Err(e) = sent {
            warn!(
                chunk = chunk.index,
                total = chunks.len(),
                error = %e,
                "chunk delivery failed"
            );
            return Err(e);
        }
        debug!(chunk = chunk.index, chars = chunk.char_len(), "chunk delivered");
    }
    Ok(chunks.len())
}
