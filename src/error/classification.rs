//! Failure types for the generation pipeline
//!
//! Backends report failures as tagged [`BackendFailure`] values. The classifier
//! turns each of those into a [`GenerationFailure`]: one of a closed set of
//! [`ErrorKind`]s plus an optional retry hint.

use std::fmt;
use std::time::Duration;

/// The semantic kind of a generation failure.
///
/// The set is closed; callers map every kind to a user-facing message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The deadline elapsed or the caller cancelled the request.
    Timeout,
    /// The backend throttled the request (HTTP 429).
    RateLimited,
    /// The API quota for the billing period is exhausted.
    QuotaExceeded,
    /// The model is overloaded or unavailable (HTTP 503).
    Overloaded,
    /// The prompt or response was blocked by a safety filter.
    Blocked,
    /// Missing key, revoked key, or a forbidden model (HTTP 401/403).
    PermissionDenied,
    /// Anything that fits none of the other kinds.
    Generic,
}

impl ErrorKind {
    /// All kinds, in declaration order.
    pub const ALL: [ErrorKind; 7] = [
        ErrorKind::Timeout,
        ErrorKind::RateLimited,
        ErrorKind::QuotaExceeded,
        ErrorKind::Overloaded,
        ErrorKind::Blocked,
        ErrorKind::PermissionDenied,
        ErrorKind::Generic,
    ];

    /// Returns true if the orchestrator may recover from this kind by
    /// advancing to the next tier.
    pub fn permits_fallback(&self) -> bool {
        matches!(self, ErrorKind::Overloaded)
    }

    /// The HTTP status code conventionally associated with this kind, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ErrorKind::RateLimited | ErrorKind::QuotaExceeded => Some(429),
            ErrorKind::Overloaded => Some(503),
            ErrorKind::PermissionDenied => Some(403),
            ErrorKind::Timeout | ErrorKind::Blocked | ErrorKind::Generic => None,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Timeout => write!(f, "timeout"),
            ErrorKind::RateLimited => write!(f, "rate_limited"),
            ErrorKind::QuotaExceeded => write!(f, "quota_exceeded"),
            ErrorKind::Overloaded => write!(f, "overloaded"),
            ErrorKind::Blocked => write!(f, "blocked"),
            ErrorKind::PermissionDenied => write!(f, "permission_denied"),
            ErrorKind::Generic => write!(f, "generic"),
        }
    }
}

/// A failure reported by a [`GenerationBackend`](crate::backend::GenerationBackend)
/// at its boundary.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BackendFailure {
    /// The call was cancelled before it produced a result.
    Cancelled,
    /// The remote API answered with an error.
    Api {
        /// HTTP status, when the client surfaced one.
        status: Option<u16>,
        /// The raw error message from the API.
        message: String,
    },
    /// The request never got a structured answer (connection, decode, ...).
    Transport(String),
}

impl BackendFailure {
    /// Shorthand for an API failure with a known status code.
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        BackendFailure::Api {
            status: Some(status),
            message: message.into(),
        }
    }

    /// Shorthand for an API failure where only the message is known.
    pub fn api_message(message: impl Into<String>) -> Self {
        BackendFailure::Api {
            status: None,
            message: message.into(),
        }
    }

    /// The raw message carried by this failure, if any.
    pub fn message(&self) -> Option<&str> {
        match self {
            BackendFailure::Cancelled => None,
            BackendFailure::Api { message, .. } => Some(message),
            BackendFailure::Transport(message) => Some(message),
        }
    }
}

impl fmt::Display for BackendFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendFailure::Cancelled => write!(f, "backend call cancelled"),
            BackendFailure::Api {
                status: Some(status),
                message,
            } => write!(f, "API error {}: {}", status, message),
            BackendFailure::Api {
                status: None,
                message,
            } => write!(f, "API error: {}", message),
            BackendFailure::Transport(message) => write!(f, "transport error: {}", message),
        }
    }
}

impl std::error::Error for BackendFailure {}

/// A classified failure: the kind plus an optional retry hint.
#[derive(Clone, Debug, PartialEq)]
pub struct GenerationFailure {
    /// The semantic kind of the failure.
    pub kind: ErrorKind,
    /// How long the backend asked us to wait before retrying.
    pub retry_after: Option<Duration>,
}

impl GenerationFailure {
    /// Creates a failure without a retry hint.
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            retry_after: None,
        }
    }

    /// Creates a failure with a retry hint.
    pub fn with_retry_after(kind: ErrorKind, retry_after: Duration) -> Self {
        Self {
            kind,
            retry_after: Some(retry_after),
        }
    }

    /// The timeout failure produced on deadline expiry or cancellation.
    pub fn timeout() -> Self {
        Self::new(ErrorKind::Timeout)
    }

    /// The retry hint in seconds, rounded up.
    pub fn retry_after_secs_ceil(&self) -> Option<u64> {
        self.retry_after.map(|d| d.as_secs_f64().ceil() as u64)
    }
}

impl fmt::Display for GenerationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.retry_after {
            Some(after) => write!(f, "{} (retry after {:.1}s)", self.kind, after.as_secs_f64()),
            None => write!(f, "{}", self.kind),
        }
    }
}

impl std::error::Error for GenerationFailure {}
