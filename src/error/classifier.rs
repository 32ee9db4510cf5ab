//! Classifier for backend failures
//!
//! This is the only place in the crate that looks inside backend error
//! messages. Everything downstream works with [`ErrorKind`].

use regex::Regex;
use std::time::Duration;

use super::{BackendFailure, ErrorKind, GenerationFailure};

/// Maps raw backend failures onto the closed [`ErrorKind`] set.
///
/// Rules are applied in a fixed precedence order:
///
/// 1. cancellation → `Timeout`
/// 2. 429 with a quota message → `QuotaExceeded`
/// 3. 429 → `RateLimited` (with a "retry in Ns" hint if present)
/// 4. 503 → `Overloaded`
/// 5. safety/blocked marker in the message → `Blocked`
/// 6. 401/403 → `PermissionDenied`
/// 7. anything else → `Generic`
#[derive(Debug)]
pub struct ErrorClassifier {
    /// Matches a `(Code: NNN)` marker when the client did not surface a status.
    code: Regex,
    /// Matches a "retry in 12.5s" hint.
    retry_in: Regex,
    /// Matches quota exhaustion wording.
    quota: Regex,
    /// Matches safety filter wording.
    blocked: Regex,
}

impl Default for ErrorClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl ErrorClassifier {
    /// Creates a classifier with the built-in patterns.
    ///
    /// # Panics
    /// Panics only if one of the built-in pattern literals is invalid.
    pub fn new() -> Self {
        Self {
            code: compile(r"\(Code:\s*(\d{3})\)"),
            retry_in: compile(r"(?i)retry in\s+([0-9]+(?:\.[0-9]+)?)\s*s"),
            quota: compile(r"(?i)quota\s+exceeded|current\s+quota"),
            blocked: compile(r"(?i)safety|blocked"),
        }
    }

    /// Classifies a backend failure.
    pub fn classify(&self, failure: &BackendFailure) -> GenerationFailure {
        let (status, message) = match failure {
            BackendFailure::Cancelled => return GenerationFailure::timeout(),
            BackendFailure::Api { status, message } => {
                (status.or_else(|| self.extract_status(message)), message.as_str())
            }
            BackendFailure::Transport(message) => (None, message.as_str()),
        };

        match status {
            Some(429) if self.quota.is_match(message) => {
                GenerationFailure::new(ErrorKind::QuotaExceeded)
            }
            Some(429) => match self.extract_retry_after(message) {
                Some(after) => GenerationFailure::with_retry_after(ErrorKind::RateLimited, after),
                None => GenerationFailure::new(ErrorKind::RateLimited),
            },
            Some(503) => GenerationFailure::new(ErrorKind::Overloaded),
            _ if self.blocked.is_match(message) => GenerationFailure::new(ErrorKind::Blocked),
            Some(401) | Some(403) => GenerationFailure::new(ErrorKind::PermissionDenied),
            _ => GenerationFailure::new(ErrorKind::Generic),
        }
    }

    /// Reads a status code from a `(Code: NNN)` marker in the message.
    pub fn extract_status(&self, message: &str) -> Option<u16> {
        self.code
            .captures(message)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse().ok())
    }

    /// Reads a "retry in Ns" hint from the message.
    pub fn extract_retry_after(&self, message: &str) -> Option<Duration> {
        let secs: f64 = self
            .retry_in
            .captures(message)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse().ok())?;

        // Hints too large for a Duration are dropped.
        Duration::try_from_secs_f64(secs).ok()
    }
}

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("built-in classifier pattern must compile")
}
