//! Tier plan: the data table that drives fallback.
//!
//! Each step names a rank, the backend to call, how long to wait before the
//! attempt, and what to do when the attempt reports `Overloaded`.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::backend::GenerationBackend;
use crate::error::ErrorKind;

/// Default pause before retrying the primary tier.
pub const DEFAULT_BACKOFF: Duration = Duration::from_millis(500);

/// Rank of a step within the plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TierRank {
    /// First attempt against the primary model.
    Primary,
    /// Second attempt against the primary model after a backoff.
    RetryOfPrimary,
    /// The smaller fallback model.
    Fallback,
    /// The last model tried; its result is returned as-is.
    LastResort,
}

impl fmt::Display for TierRank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TierRank::Primary => write!(f, "primary"),
            TierRank::RetryOfPrimary => write!(f, "primary_retry"),
            TierRank::Fallback => write!(f, "fallback"),
            TierRank::LastResort => write!(f, "last_resort"),
        }
    }
}

/// What to do after a step fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// Move on to the next step if the failure was `Overloaded`.
    OnOverloaded,
    /// Return whatever this step produced.
    Final,
}

impl Advance {
    /// Whether a failure of `kind` moves the plan to the next step.
    pub fn advances_on(&self, kind: ErrorKind) -> bool {
        match self {
            Advance::OnOverloaded => kind.permits_fallback(),
            Advance::Final => false,
        }
    }
}

/// One row of the plan.
#[derive(Clone)]
pub struct TierStep {
    /// Rank reported when this step produces the outcome.
    pub rank: TierRank,
    /// Backend invoked by this step.
    pub backend: Arc<dyn GenerationBackend>,
    /// Pause before the attempt.
    pub delay: Duration,
    /// Rule applied when the attempt fails.
    pub advance: Advance,
}

impl fmt::Debug for TierStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TierStep")
            .field("rank", &self.rank)
            .field("backend", &self.backend.name())
            .field("delay", &self.delay)
            .field("advance", &self.advance)
            .finish()
    }
}

/// Ordered list of tier steps, fixed at construction.
#[derive(Debug, Clone)]
pub struct TierPlan {
    steps: Vec<TierStep>,
}

impl TierPlan {
    /// The canonical plan: primary, primary again after `backoff`, fallback,
    /// then last resort.
    pub fn canonical(
        primary: Arc<dyn GenerationBackend>,
        fallback: Arc<dyn GenerationBackend>,
        last_resort: Arc<dyn GenerationBackend>,
        backoff: Duration,
    ) -> Self {
        Self::from_steps(vec![
            TierStep {
                rank: TierRank::Primary,
                backend: Arc::clone(&primary),
                delay: Duration::ZERO,
                advance: Advance::OnOverloaded,
            },
            TierStep {
                rank: TierRank::RetryOfPrimary,
                backend: primary,
                delay: backoff,
                advance: Advance::OnOverloaded,
            },
            TierStep {
                rank: TierRank::Fallback,
                backend: fallback,
                delay: Duration::ZERO,
                advance: Advance::OnOverloaded,
            },
            TierStep {
                rank: TierRank::LastResort,
                backend: last_resort,
                delay: Duration::ZERO,
                advance: Advance::Final,
            },
        ])
    }

    /// Builds a plan from explicit steps.
    ///
    /// The last step is always treated as final, whatever rule it carries.
    pub fn from_steps(mut steps: Vec<TierStep>) -> Self {
        if let Some(last) = steps.last_mut() {
            last.advance = Advance::Final;
        }
        Self { steps }
    }

    pub fn steps(&self) -> &[TierStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}
