//! User-facing reply lines.
//!
//! Every [`ErrorKind`] maps to a small pool of lines, and one is picked at
//! random so repeated failures don't read like a stack trace. The mapping is
//! an exhaustive match: adding a kind without lines fails to compile.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::error::{ErrorKind, GenerationFailure};

const TIMEOUT: &[&str] = &[
    "That took way too long, so I gave up. Try again?",
    "My brain timed out on that one. Mind asking again?",
    "I ran out of time before I could finish. Give it another go.",
];

const RATE_LIMITED: &[&str] = &[
    "Too many requests at once. Give me a moment and try again.",
    "I'm being throttled right now. Try again shortly.",
];

/// `{}` is replaced with whole seconds.
const RATE_LIMITED_WITH_WAIT: &[&str] = &[
    "Too many requests at once. Try again in {}s.",
    "I'm being throttled. Give me {}s and ask again.",
];

const QUOTA_EXCEEDED: &[&str] = &[
    "I've used up my quota for now. Try again later.",
    "Out of quota for the moment. Check back in a while.",
];

const OVERLOADED: &[&str] = &[
    "Every model I can reach is swamped right now. Try again in a bit.",
    "The servers are overloaded at the moment. Please try again soon.",
];

const BLOCKED: &[&str] = &[
    "I can't answer that one.",
    "That got caught by a content filter, sorry.",
];

const PERMISSION_DENIED: &[&str] = &[
    "I don't have access to the model right now. Someone should check my keys.",
    "Access was denied on my end. An admin may need to look at this.",
];

const GENERIC: &[&str] = &[
    "Something went wrong on my end. Try again?",
    "Oops, that didn't work. Please try again.",
    "I hit an unexpected error. Give it another shot.",
];

const THINKING: &[&str] = &[
    "Still thinking…",
    "Hang on, this one is taking a while…",
    "Working on it…",
];

const EMPTY_RESPONSE: &[&str] = &[
    "I came up empty on that one. Try rephrasing?",
    "I don't have anything to say to that.",
];

/// Picks user-facing lines for failures and progress notices.
#[derive(Debug, Clone, Default)]
pub struct ReplyBook {
    include_code: bool,
}

impl ReplyBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `(err: <code>)` to failure lines for kinds that have a code.
    pub fn with_error_codes(mut self, include_code: bool) -> Self {
        self.include_code = include_code;
        self
    }

    /// A line describing `failure`.
    pub fn message_for(&self, failure: &GenerationFailure) -> String {
        self.message_with_rng(failure, &mut rand::thread_rng())
    }

    /// Like [`message_for`](Self::message_for) with a caller-supplied RNG.
    pub fn message_with_rng<R: Rng + ?Sized>(
        &self,
        failure: &GenerationFailure,
        rng: &mut R,
    ) -> String {
        let mut line = match (failure.kind, failure.retry_after_secs_ceil()) {
            (ErrorKind::RateLimited, Some(secs)) => {
                pick(RATE_LIMITED_WITH_WAIT, rng).replace("{}", &secs.to_string())
            }
            (kind, _) => pick(pool(kind), rng).to_string(),
        };

        if self.include_code {
            if let Some(code) = failure.kind.status_code() {
                line.push_str(&format!(" (err: {})", code));
            }
        }
        line
    }

    /// The "still working" progress line.
    pub fn thinking(&self) -> String {
        pick(THINKING, &mut rand::thread_rng()).to_string()
    }

    /// Sent instead of blank generated text.
    pub fn empty_response(&self) -> String {
        pick(EMPTY_RESPONSE, &mut rand::thread_rng()).to_string()
    }
}

fn pool(kind: ErrorKind) -> &'static [&'static str] {
    match kind {
        ErrorKind::Timeout => TIMEOUT,
        ErrorKind::RateLimited => RATE_LIMITED,
        ErrorKind::QuotaExceeded => QUOTA_EXCEEDED,
        ErrorKind::Overloaded => OVERLOADED,
        ErrorKind::Blocked => BLOCKED,
        ErrorKind::PermissionDenied => PERMISSION_DENIED,
        ErrorKind::Generic => GENERIC,
    }
}

fn pick<R: Rng + ?Sized>(lines: &'static [&'static str], rng: &mut R) -> &'static str {
    // Pools are non-empty constants.
    lines.choose(rng).copied().unwrap_or("")
}
