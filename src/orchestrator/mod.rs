//! Generation orchestrator.
//!
//! Walks a [`TierPlan`] in order, classifying every failure. Only
//! `Overloaded` moves the plan forward; any other failure, and any success,
//! ends the request. The whole walk is bounded by one deadline.

pub mod plan;

pub use plan::{Advance, TierPlan, TierRank, TierStep, DEFAULT_BACKOFF};

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::backend::GenerationBackend;
use crate::error::{BackendFailure, ErrorClassifier, ErrorKind, GenerationFailure};
use crate::prompt::{PromptRequest, PromptTemplate};

/// Final result of a generation request.
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationOutcome {
    /// Text from some tier. May be empty or whitespace.
    Success(String),
    /// A classified terminal failure.
    Failure(GenerationFailure),
}

impl GenerationOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, GenerationOutcome::Success(_))
    }

    /// The generated text, if the request succeeded.
    pub fn text(&self) -> Option<&str> {
        match self {
            GenerationOutcome::Success(text) => Some(text),
            GenerationOutcome::Failure(_) => None,
        }
    }

    /// The failure, if the request failed.
    pub fn failure(&self) -> Option<&GenerationFailure> {
        match self {
            GenerationOutcome::Success(_) => None,
            GenerationOutcome::Failure(failure) => Some(failure),
        }
    }

    /// The failure kind, if the request failed.
    pub fn kind(&self) -> Option<ErrorKind> {
        self.failure().map(|f| f.kind)
    }
}

/// Outcome plus the metadata callers log.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationReport {
    /// What the request produced.
    pub outcome: GenerationOutcome,
    /// Rank of the last step invoked, or of the first step when the
    /// deadline passed before any attempt.
    pub rank: TierRank,
    /// Name of the backend behind that step.
    pub backend: String,
    /// Number of backend invocations made.
    pub attempts: u32,
    /// Wall-clock time spent in the orchestrator.
    pub elapsed: Duration,
}

/// Errors from building an orchestrator.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OrchestratorError {
    #[error("tier plan has no steps")]
    EmptyPlan,
}

/// Why an attempt stopped before the backend answered.
enum Interrupt {
    Deadline,
    Cancelled,
}

/// Drives a request through the tier plan.
///
/// Holds only read-only state, so one instance can serve any number of
/// concurrent requests.
#[derive(Debug)]
pub struct Orchestrator {
    plan: TierPlan,
    classifier: ErrorClassifier,
    template: PromptTemplate,
}

impl Orchestrator {
    /// Creates an orchestrator over `plan`.
    pub fn new(plan: TierPlan) -> Result<Self, OrchestratorError> {
        if plan.is_empty() {
            return Err(OrchestratorError::EmptyPlan);
        }
        Ok(Self {
            plan,
            classifier: ErrorClassifier::new(),
            template: PromptTemplate::default(),
        })
    }

    /// Creates an orchestrator over the canonical four-step plan.
    pub fn canonical(
        primary: Arc<dyn GenerationBackend>,
        fallback: Arc<dyn GenerationBackend>,
        last_resort: Arc<dyn GenerationBackend>,
        backoff: Duration,
    ) -> Self {
        Self {
            plan: TierPlan::canonical(primary, fallback, last_resort, backoff),
            classifier: ErrorClassifier::new(),
            template: PromptTemplate::default(),
        }
    }

    /// Sets the template used to render prompts.
    pub fn with_template(mut self, template: PromptTemplate) -> Self {
        self.template = template;
        self
    }

    pub fn plan(&self) -> &TierPlan {
        &self.plan
    }

    /// Generates a response, giving up at `deadline`.
    pub async fn generate(&self, request: &PromptRequest, deadline: Instant) -> GenerationReport {
        self.run(request, deadline, None).await
    }

    /// Like [`generate`](Self::generate), but also stops as soon as `cancel`
    /// turns `true`. Cancellation is reported as `Timeout`.
    pub async fn generate_with_cancel(
        &self,
        request: &PromptRequest,
        deadline: Instant,
        mut cancel: watch::Receiver<bool>,
    ) -> GenerationReport {
        self.run(request, deadline, Some(&mut cancel)).await
    }

    async fn run(
        &self,
        request: &PromptRequest,
        deadline: Instant,
        mut cancel: Option<&mut watch::Receiver<bool>>,
    ) -> GenerationReport {
        let started = Instant::now();
        let prompt = self.template.render(request);
        let steps = self.plan.steps();
        let mut attempts: u32 = 0;

        for (index, step) in steps.iter().enumerate() {
            let is_last = index + 1 == steps.len();

            if let Err(interrupt) = self.pause(step.delay, deadline, cancel.as_deref_mut()).await {
                // Report the step that was last invoked, not the one never reached.
                let reported = if index > 0 { &steps[index - 1] } else { step };
                log_interrupt(&interrupt, reported, attempts);
                return self.finish(self.timeout_outcome(), reported, attempts, started);
            }

            attempts += 1;
            debug!(
                tier = %step.rank,
                backend = step.backend.name(),
                attempt = attempts,
                mode = %request.mode(),
                "invoking generation backend"
            );

            let result = tokio::select! {
                biased;
                _ = cancelled(cancel.as_deref_mut()) => Err(Interrupt::Cancelled),
                res = tokio::time::timeout_at(deadline, step.backend.invoke(&prompt, deadline)) => {
                    res.map_err(|_| Interrupt::Deadline)
                }
            };

            let failure = match result {
                Ok(Ok(text)) => {
                    return self.finish(GenerationOutcome::Success(text), step, attempts, started);
                }
                Ok(Err(failure)) => failure,
                Err(interrupt) => {
                    log_interrupt(&interrupt, step, attempts);
                    BackendFailure::Cancelled
                }
            };

            let classified = self.classifier.classify(&failure);
            if !is_last && step.advance.advances_on(classified.kind) {
                warn!(
                    tier = %step.rank,
                    backend = step.backend.name(),
                    attempt = attempts,
                    "backend overloaded, moving to next tier"
                );
                continue;
            }

            debug!(
                tier = %step.rank,
                error = %failure,
                kind = %classified.kind,
                "generation failed"
            );
            return self.finish(
                GenerationOutcome::Failure(classified),
                step,
                attempts,
                started,
            );
        }

        // The last step is always final, so the loop returns before this.
        unreachable!("tier plan ended without a final step")
    }

    /// Waits `delay` unless the deadline or a cancellation comes first.
    async fn pause(
        &self,
        delay: Duration,
        deadline: Instant,
        cancel: Option<&mut watch::Receiver<bool>>,
    ) -> Result<(), Interrupt> {
        let now = Instant::now();
        if now >= deadline {
            return Err(Interrupt::Deadline);
        }
        if delay.is_zero() {
            return Ok(());
        }
        // A backoff that cannot finish before the deadline leaves no budget
        // for the attempt behind it.
        if now + delay >= deadline {
            return Err(Interrupt::Deadline);
        }

        tokio::select! {
            biased;
            _ = cancelled(cancel) => Err(Interrupt::Cancelled),
            _ = tokio::time::sleep(delay) => Ok(()),
        }
    }

    fn timeout_outcome(&self) -> GenerationOutcome {
        GenerationOutcome::Failure(self.classifier.classify(&BackendFailure::Cancelled))
    }

    fn finish(
        &self,
        outcome: GenerationOutcome,
        step: &TierStep,
        attempts: u32,
        started: Instant,
    ) -> GenerationReport {
        let elapsed = started.elapsed();
        let result = match &outcome {
            GenerationOutcome::Success(_) => "success".to_string(),
            GenerationOutcome::Failure(failure) => failure.kind.to_string(),
        };
        info!(
            elapsed_ms = elapsed.as_millis() as u64,
            tier = %step.rank,
            backend = step.backend.name(),
            attempts,
            outcome = %result,
            "generation finished"
        );

        GenerationReport {
            outcome,
            rank: step.rank,
            backend: step.backend.name().to_string(),
            attempts,
            elapsed,
        }
    }
}

fn log_interrupt(interrupt: &Interrupt, step: &TierStep, attempts: u32) {
    match interrupt {
        Interrupt::Deadline => {
            warn!(tier = %step.rank, attempts, "generation deadline reached")
        }
        Interrupt::Cancelled => {
            warn!(tier = %step.rank, attempts, "generation cancelled by caller")
        }
    }
}

/// Resolves once `cancel` reads `true`; never resolves without a receiver or
/// after the sender is dropped.
async fn cancelled(cancel: Option<&mut watch::Receiver<bool>>) {
    if let Some(rx) = cancel {
        if rx.wait_for(|flag| *flag).await.is_ok() {
            return;
        }
    }
    std::future::pending::<()>().await
}
