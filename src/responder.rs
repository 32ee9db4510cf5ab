//! End-to-end response flow for one chat request.
//!
//! The [`Responder`] runs the orchestrator under a deadline, posts a progress
//! notice if generation is slow, then either chunks and delivers the text or
//! sends a user-facing failure line.

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::backend::GenerationBackend;
use crate::chunker::Chunker;
use crate::config::PipelineConfig;
use crate::delivery::{deliver, ChunkSink, DeliveryError};
use crate::orchestrator::{GenerationOutcome, GenerationReport, Orchestrator};
use crate::progress::with_progress;
use crate::prompt::PromptRequest;
use crate::reply::ReplyBook;

/// Errors from [`Responder::respond`].
#[derive(Debug, Error)]
pub enum RespondError {
    /// The generated reply could not be delivered.
    #[error("delivery failed: {0}")]
    Delivery(#[from] DeliveryError),
}

/// What happened while answering one request.
#[derive(Debug, Clone)]
pub struct ResponseSummary {
    /// The orchestrator's report.
    pub report: GenerationReport,
    /// Messages sent after generation finished.
    pub messages_sent: usize,
    /// Whether the progress notice was started.
    pub notified: bool,
}

/// Ties generation, chunking and delivery together.
#[derive(Debug)]
pub struct Responder {
    orchestrator: Orchestrator,
    chunker: Chunker,
    replies: ReplyBook,
    deadline: Duration,
    progress_interval: Duration,
}

impl Responder {
    /// Creates a responder around an existing orchestrator.
    pub fn new(orchestrator: Orchestrator, config: &PipelineConfig) -> Self {
        Self {
            orchestrator,
            chunker: Chunker::new(config.chunker.clone()),
            replies: ReplyBook::new(),
            deadline: config.deadline(),
            progress_interval: config.progress_interval(),
        }
    }

    /// Creates a responder over the canonical three-model plan.
    pub fn from_config(
        primary: Arc<dyn GenerationBackend>,
        fallback: Arc<dyn GenerationBackend>,
        last_resort: Arc<dyn GenerationBackend>,
        config: &PipelineConfig,
    ) -> Self {
        let orchestrator = Orchestrator::canonical(primary, fallback, last_resort, config.backoff())
            .with_template(config.prompt.clone());
        Self::new(orchestrator, config)
    }

    /// Replaces the reply book.
    pub fn with_replies(mut self, replies: ReplyBook) -> Self {
        self.replies = replies;
        self
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    /// Answers `request` through `sink`.
    ///
    /// Generation failures are not errors here: they are reported to the
    /// user and show up in the summary. Only a failed send is an error.
    pub async fn respond<S>(
        &self,
        request: &PromptRequest,
        sink: &S,
    ) -> Result<ResponseSummary, RespondError>
    where
        S: ChunkSink + ?Sized,
    {
        self.run(request, sink, None).await
    }

    /// Like [`respond`](Self::respond), but stops generating once `cancel`
    /// turns `true`.
    pub async fn respond_with_cancel<S>(
        &self,
        request: &PromptRequest,
        sink: &S,
        cancel: watch::Receiver<bool>,
    ) -> Result<ResponseSummary, RespondError>
    where
        S: ChunkSink + ?Sized,
    {
        self.run(request, sink, Some(cancel)).await
    }

    async fn run<S>(
        &self,
        request: &PromptRequest,
        sink: &S,
        cancel: Option<watch::Receiver<bool>>,
    ) -> Result<ResponseSummary, RespondError>
    where
        S: ChunkSink + ?Sized,
    {
        let deadline = Instant::now() + self.deadline;
        let generation = async {
            match cancel {
                Some(cancel) => {
                    self.orchestrator
                        .generate_with_cancel(request, deadline, cancel)
                        .await
                }
                None => self.orchestrator.generate(request, deadline).await,
            }
        };

        let tracked = with_progress(generation, self.progress_interval, || async {
            if let Err(e) = sink.replace_placeholder(&self.replies.thinking()).await {
                warn!(error = %e, "failed to post progress notice");
            }
        })
        .await;
        let report = tracked.value;

        let messages_sent = match &report.outcome {
            GenerationOutcome::Success(text) => {
                let text = if text.trim().is_empty() {
                    self.replies.empty_response()
                } else {
                    text.clone()
                };
                let chunks = self.chunker.chunk(&text);
                deliver(sink, &chunks).await?
            }
            GenerationOutcome::Failure(failure) => {
                let line = self.replies.message_for(failure);
                sink.replace_placeholder(&line).await?;
                1
            }
        };

        info!(
            tier = %report.rank,
            attempts = report.attempts,
            messages = messages_sent,
            notified = tracked.notified,
            "response delivered"
        );

        Ok(ResponseSummary {
            report,
            messages_sent,
            notified: tracked.notified,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{BackendFailure, ErrorKind};
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct Fixed(Result<String, BackendFailure>);

    #[async_trait]
    impl GenerationBackend for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn invoke(&self, _prompt: &str, _deadline: Instant) -> Result<String, BackendFailure> {
            self.0.clone()
        }
    }

    struct Slow;

    #[async_trait]
    impl GenerationBackend for Slow {
        fn name(&self) -> &str {
            "slow"
        }

        async fn invoke(&self, _prompt: &str, _deadline: Instant) -> Result<String, BackendFailure> {
            tokio::time::sleep(Duration::from_secs(12)).await;
            Ok("finally".to_string())
        }
    }

    #[derive(Default)]
    struct Inbox {
        placeholder: Mutex<Vec<String>>,
        follow_ups: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ChunkSink for Inbox {
        async fn replace_placeholder(&self, text: &str) -> Result<(), DeliveryError> {
            self.placeholder.lock().unwrap().push(text.to_string());
            Ok(())
        }

        async fn follow_up(&self, text: &str) -> Result<(), DeliveryError> {
            self.follow_ups.lock().unwrap().push(text.to_string());
            Ok(())
        }
    }

    /// Records edits only after a delay, like a slow chat gateway.
    #[derive(Default)]
    struct Laggy {
        placeholder: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ChunkSink for Laggy {
        async fn replace_placeholder(&self, text: &str) -> Result<(), DeliveryError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            self.placeholder.lock().unwrap().push(text.to_string());
            Ok(())
        }

        async fn follow_up(&self, _text: &str) -> Result<(), DeliveryError> {
            Ok(())
        }
    }

    struct Closed;

    #[async_trait]
    impl ChunkSink for Closed {
        async fn replace_placeholder(&self, _text: &str) -> Result<(), DeliveryError> {
            Err(DeliveryError::PlaceholderGone("expired".to_string()))
        }

        async fn follow_up(&self, _text: &str) -> Result<(), DeliveryError> {
            Err(DeliveryError::PlaceholderGone("expired".to_string()))
        }
    }

    fn responder(backend: Arc<dyn GenerationBackend>) -> Responder {
        Responder::from_config(
            Arc::clone(&backend),
            Arc::clone(&backend),
            backend,
            &PipelineConfig::default(),
        )
    }

    fn request() -> PromptRequest {
        PromptRequest::general("hello").unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_is_delivered() {
        let responder = responder(Arc::new(Fixed(Ok("Hi @everyone!".to_string()))));
        let inbox = Inbox::default();

        let summary = responder.respond(&request(), &inbox).await.unwrap();

        assert!(summary.report.outcome.is_success());
        assert_eq!(summary.messages_sent, 1);
        assert!(!summary.notified);
        assert_eq!(
            *inbox.placeholder.lock().unwrap(),
            vec!["Hi @\u{200B}everyone!".to_string()]
        );
        assert!(inbox.follow_ups.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_long_success_uses_follow_ups() {
        let text = "A fairly ordinary sentence. ".repeat(150);
        let responder = responder(Arc::new(Fixed(Ok(text))));
        let inbox = Inbox::default();

        let summary = responder.respond(&request(), &inbox).await.unwrap();

        assert!(summary.messages_sent > 1);
        assert_eq!(inbox.placeholder.lock().unwrap().len(), 1);
        assert_eq!(
            inbox.follow_ups.lock().unwrap().len(),
            summary.messages_sent - 1
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_blank_success_gets_empty_line() {
        let responder = responder(Arc::new(Fixed(Ok("  \n ".to_string()))));
        let inbox = Inbox::default();

        responder.respond(&request(), &inbox).await.unwrap();

        let sent = inbox.placeholder.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert!(!sent[0].trim().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_sends_reply_line() {
        let responder = responder(Arc::new(Fixed(Err(BackendFailure::api(403, "denied")))))
            .with_replies(ReplyBook::new().with_error_codes(true));
        let inbox = Inbox::default();

        let summary = responder.respond(&request(), &inbox).await.unwrap();

        assert_eq!(summary.report.outcome.kind(), Some(ErrorKind::PermissionDenied));
        assert_eq!(summary.messages_sent, 1);
        let sent = inbox.placeholder.lock().unwrap();
        assert!(sent[0].ends_with("(err: 403)"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_generation_posts_notice_first() {
        let responder = responder(Arc::new(Slow));
        let inbox = Inbox::default();

        let summary = responder.respond(&request(), &inbox).await.unwrap();

        assert!(summary.notified);
        let sent = inbox.placeholder.lock().unwrap();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[1], "finally");
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_notice_never_overwrites_reply() {
        let responder = responder(Arc::new(Slow));
        let sink = Laggy::default();

        let summary = responder.respond(&request(), &sink).await.unwrap();

        assert!(summary.notified);
        let sent = sink.placeholder.lock().unwrap();
        assert_eq!(sent.len(), 2);
        assert_ne!(sent[0], "finally");
        assert_eq!(sent[1], "finally");
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_reports_timeout() {
        let responder = responder(Arc::new(Slow));
        let inbox = Inbox::default();
        let (tx, rx) = tokio::sync::watch::channel(false);

        let cancel = async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            tx.send(true).unwrap();
        };
        let req = request();
        let (summary, ()) = tokio::join!(responder.respond_with_cancel(&req, &inbox, rx), cancel);

        let summary = summary.unwrap();
        assert_eq!(summary.report.outcome.kind(), Some(ErrorKind::Timeout));
        assert!(!summary.notified);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delivery_error_is_returned() {
        let responder = responder(Arc::new(Fixed(Ok("hi".to_string()))));
        let err = responder.respond(&request(), &Closed).await.unwrap_err();
        assert!(matches!(err, RespondError::Delivery(DeliveryError::PlaceholderGone(_))));
    }
}
