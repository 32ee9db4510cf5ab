//! Prompt requests and rendering.

use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Style selector for a generation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptMode {
    /// Short conversational reply.
    #[default]
    General,
    /// A reaction that also explains its subject.
    InformativeReaction,
    /// A plain technical answer.
    Technical,
    /// A longer, detailed answer.
    Detailed,
}

impl fmt::Display for PromptMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PromptMode::General => write!(f, "general"),
            PromptMode::InformativeReaction => write!(f, "informative_reaction"),
            PromptMode::Technical => write!(f, "technical"),
            PromptMode::Detailed => write!(f, "detailed"),
        }
    }
}

/// Errors from building a prompt request.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PromptError {
    /// The prompt was empty or only whitespace.
    #[error("prompt is empty")]
    Empty,
}

/// An immutable generation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptRequest {
    prompt: String,
    mode: PromptMode,
}

impl PromptRequest {
    /// Builds a request, rejecting blank prompts.
    pub fn new(prompt: impl Into<String>, mode: PromptMode) -> Result<Self, PromptError> {
        let prompt = prompt.into();
        if prompt.trim().is_empty() {
            return Err(PromptError::Empty);
        }
        Ok(Self { prompt, mode })
    }

    /// Builds a request in [`PromptMode::General`].
    pub fn general(prompt: impl Into<String>) -> Result<Self, PromptError> {
        Self::new(prompt, PromptMode::General)
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn mode(&self) -> PromptMode {
        self.mode
    }
}

/// Base instructions plus per-mode style instructions.
///
/// Both default to empty, in which case the rendered prompt is the user's
/// text unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PromptTemplate {
    /// Instructions prepended to every prompt.
    #[serde(default)]
    pub base: String,
    /// Extra instructions keyed by mode.
    #[serde(default)]
    pub modes: HashMap<PromptMode, String>,
}

impl PromptTemplate {
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            modes: HashMap::new(),
        }
    }

    /// Sets the instructions for one mode.
    pub fn with_mode(mut self, mode: PromptMode, instructions: impl Into<String>) -> Self {
        self.modes.insert(mode, instructions.into());
        self
    }

    /// Instructions for `mode`, or an empty string.
    pub fn mode_instructions(&self, mode: PromptMode) -> &str {
        self.modes.get(&mode).map(String::as_str).unwrap_or("")
    }

    /// Renders the prompt string sent to the backends.
    pub fn render(&self, request: &PromptRequest) -> String {
        let base = self.base.trim();
        let extra = self.mode_instructions(request.mode()).trim();

        if base.is_empty() && extra.is_empty() {
            return request.prompt().to_string();
        }

        let mut sections = Vec::with_capacity(3);
        if !base.is_empty() {
            sections.push(base.to_string());
        }
        if !extra.is_empty() {
            sections.push(format!("Additional instructions:\n{}", extra));
        }
        sections.push(format!("User message:\n{}", request.prompt()));
        sections.join("\n\n")
    }
}
