//! Output chunker for length-limited message transports.
//!
//! Generated text goes through four steps: bound the total length,
//! normalize, defang mentions, then split into chunks no longer than the
//! transport limit with code fences repaired across boundaries.

pub mod sanitize;
pub mod split;

pub use sanitize::{bound_length, normalize, Defanger, ZERO_WIDTH_SPACE};
pub use split::{fence_count, find_split, has_unclosed_fence, split_into_chunks};

use serde::Deserialize;
use tracing::warn;

/// Smallest chunk limit that still leaves room for fence repair.
pub const MIN_CHUNK_LIMIT: usize = 16;

/// Default per-message limit, leaving headroom under Discord's 2000.
pub const DEFAULT_CHUNK_LIMIT: usize = 1900;

/// Default cap on total response length.
pub const DEFAULT_MAX_CHARS: usize = 6000;

/// Default marker appended to truncated text.
pub const DEFAULT_TRUNCATION_MARKER: &str = "\n\n(…cut off)";

/// Default chunk emitted for empty text.
pub const DEFAULT_EMPTY_PLACEHOLDER: &str = "(empty response)";

/// Chunker settings. All lengths are in characters.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ChunkerConfig {
    /// Maximum characters per chunk.
    pub chunk_limit: usize,
    /// Maximum characters kept from the raw text.
    pub max_chars: usize,
    /// Appended after truncation.
    pub truncation_marker: String,
    /// The single chunk produced for empty text.
    pub empty_placeholder: String,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            chunk_limit: DEFAULT_CHUNK_LIMIT,
            max_chars: DEFAULT_MAX_CHARS,
            truncation_marker: DEFAULT_TRUNCATION_MARKER.to_string(),
            empty_placeholder: DEFAULT_EMPTY_PLACEHOLDER.to_string(),
        }
    }
}

/// One transport-safe piece of a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputChunk {
    /// Position in the sequence, starting at 0.
    pub index: usize,
    /// The chunk text.
    pub text: String,
}

impl OutputChunk {
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Length in characters.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn is_first(&self) -> bool {
        self.index == 0
    }
}

/// Splits generated text into transport-safe chunks.
#[derive(Debug)]
pub struct Chunker {
    config: ChunkerConfig,
    defanger: Defanger,
}

impl Default for Chunker {
    fn default() -> Self {
        Self::new(ChunkerConfig::default())
    }
}

impl Chunker {
    /// Creates a chunker, raising out-of-range settings to usable values.
    ///
    /// `chunk_limit` is raised to [`MIN_CHUNK_LIMIT`], `max_chars` to 1, and
    /// a blank placeholder falls back to [`DEFAULT_EMPTY_PLACEHOLDER`].
    pub fn new(mut config: ChunkerConfig) -> Self {
        if config.chunk_limit < MIN_CHUNK_LIMIT {
            warn!(
                chunk_limit = config.chunk_limit,
                min = MIN_CHUNK_LIMIT,
                "chunk limit too small, raising to minimum"
            );
            config.chunk_limit = MIN_CHUNK_LIMIT;
        }
        if config.max_chars == 0 {
            warn!("max_chars is 0, raising to 1");
            config.max_chars = 1;
        }
        if config.empty_placeholder.trim().is_empty() {
            warn!("blank empty placeholder, using the default");
            config.empty_placeholder = DEFAULT_EMPTY_PLACEHOLDER.to_string();
        }

        Self {
            config,
            defanger: Defanger::new(),
        }
    }

    pub fn config(&self) -> &ChunkerConfig {
        &self.config
    }

    /// Bounds, normalizes and defangs `raw`. Returns an empty string when
    /// nothing is left after trimming.
    pub fn sanitize(&self, raw: &str) -> String {
        let bounded = bound_length(raw, self.config.max_chars, &self.config.truncation_marker);
        let normalized = normalize(&bounded);
        if normalized.is_empty() {
            return normalized;
        }
        self.defanger.defang(&normalized)
    }

    /// Runs the full pipeline. Always returns at least one non-empty chunk.
    pub fn chunk(&self, raw: &str) -> Vec<OutputChunk> {
        let text = self.sanitize(raw);
        let pieces = if text.is_empty() {
            vec![self.config.empty_placeholder.clone()]
        } else {
            split_into_chunks(&text, self.config.chunk_limit)
        };

        pieces
            .into_iter()
            .enumerate()
            .map(|(index, text)| OutputChunk { index, text })
            .collect()
    }
}

/// Chunks `raw` with the default settings.
pub fn chunk(raw: &str) -> Vec<OutputChunk> {
    Chunker::default().chunk(raw)
}
