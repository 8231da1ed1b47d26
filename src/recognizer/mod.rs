//! Single-backend recognizer
//!
//! Composes one backend adapter with the normalizer to produce a
//! [`RecognitionResult`], emitting a diagnostic trace event per request.
//!
//! The recognizer suspends only at the adapter call boundary. Trace
//! emission is best-effort: a failing sink is logged and swallowed,
//! never failing recognition. Adapter and normalizer errors propagate
//! unchanged.

use std::sync::Arc;

use serde_json::json;
use tokio_util::sync::CancellationToken;

use crate::adapter::{BackendAdapter, NoopTraceSink, ProjectConfig, TraceEvent, TraceSink};
use crate::error::RecognitionError;
use crate::normalizer::normalize;
use crate::types::{RawBackendPayload, RecognitionResult};

/// Event name used for per-request recognizer traces.
pub const RECOGNIZER_TRACE_EVENT: &str = "recognizer.trace";

/// Request-scoped context for one recognition call.
#[derive(Debug, Clone)]
pub struct RecognitionContext {
    /// Correlates trace events of one request.
    pub request_id: String,
    /// Conversation this utterance belongs to, when known.
    pub conversation_id: Option<String>,
    /// Caller-controlled cancellation/timeout signal.
    pub cancellation: CancellationToken,
}

impl RecognitionContext {
    /// Create a context with a fresh request id and no cancellation.
    pub fn new() -> Self {
        Self {
            request_id: uuid::Uuid::new_v4().to_string(),
            conversation_id: None,
            cancellation: CancellationToken::new(),
        }
    }

    /// Attach a conversation id.
    pub fn with_conversation_id(mut self, conversation_id: impl Into<String>) -> Self {
        self.conversation_id = Some(conversation_id.into());
        self
    }

    /// Attach a cancellation token.
    pub fn with_cancellation(mut self, cancellation: CancellationToken) -> Self {
        self.cancellation = cancellation;
        self
    }
}

impl Default for RecognitionContext {
    fn default() -> Self {
        Self::new()
    }
}

/// One NLU backend wired to the normalizer and a trace sink.
pub struct Recognizer {
    id: String,
    adapter: Arc<dyn BackendAdapter>,
    project: ProjectConfig,
    trace: Arc<dyn TraceSink>,
}

impl Recognizer {
    /// Create a recognizer over an adapter and project config. Traces go
    /// nowhere until a sink is attached.
    pub fn new(
        id: impl Into<String>,
        adapter: Arc<dyn BackendAdapter>,
        project: ProjectConfig,
    ) -> Self {
        Self {
            id: id.into(),
            adapter,
            project,
            trace: Arc::new(NoopTraceSink),
        }
    }

    /// Attach a trace sink.
    pub fn with_trace_sink(mut self, trace: Arc<dyn TraceSink>) -> Self {
        self.trace = trace;
        self
    }

    /// Identifier of this recognizer within a cross-trained set.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Recognize one utterance.
    ///
    /// Cancellation mid-call drops the adapter future and returns
    /// `Cancelled`.
    pub async fn recognize(
        &self,
        utterance: &str,
        ctx: &RecognitionContext,
    ) -> Result<RecognitionResult, RecognitionError> {
        tracing::debug!(
            recognizer_id = %self.id,
            request_id = %ctx.request_id,
            project = %self.project.project_name,
            "recognition started"
        );

        let raw = tokio::select! {
            _ = ctx.cancellation.cancelled() => return Err(RecognitionError::Cancelled),
            outcome = self.adapter.call(utterance, &self.project) => outcome?,
        };

        let result = normalize(&raw, utterance)?;

        tracing::info!(
            recognizer_id = %self.id,
            request_id = %ctx.request_id,
            top_intent = result.top_intent().map(|(name, _)| name).unwrap_or(""),
            top_score = result.top_score(),
            "recognition completed"
        );

        self.emit_trace(utterance, &raw, &result, ctx).await;
        Ok(result)
    }

    async fn emit_trace(
        &self,
        utterance: &str,
        raw: &RawBackendPayload,
        result: &RecognitionResult,
        ctx: &RecognitionContext,
    ) {
        let mut payload = json!({
            "recognizerId": self.id,
            "requestId": ctx.request_id,
            "conversationId": ctx.conversation_id,
            "utterance": utterance,
            "recognizerResult": serde_json::to_value(result).unwrap_or_default(),
        });
        if self.project.verbose {
            payload["response"] = serde_json::to_value(raw).unwrap_or_default();
        }

        let event = TraceEvent::new(RECOGNIZER_TRACE_EVENT, payload);
        if let Err(err) = self.trace.emit(event).await {
            tracing::warn!(
                recognizer_id = %self.id,
                request_id = %ctx.request_id,
                "failed to emit recognizer trace: {}",
                err
            );
        }
    }
}
