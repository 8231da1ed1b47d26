//! Recognition error taxonomy
//!
//! One variant per failure class so callers can tell transient backend
//! outages apart from contract breaks. The cross-trained set degrades on
//! `BackendUnavailable` but treats every other variant as fatal for the
//! whole request.

use thiserror::Error;

/// Errors produced by adapters, the normalizer and the recognizer layers.
#[derive(Debug, Error)]
pub enum RecognitionError {
    /// Network, auth or vendor-side failure. Retryable by the caller.
    #[error("backend unavailable: {message}")]
    BackendUnavailable {
        /// HTTP status code when the backend answered at all.
        status_code: Option<u16>,
        message: String,
    },

    /// Payload does not match the expected discriminated shape.
    #[error("malformed backend response: {0}")]
    MalformedResponse(String),

    /// Orchestration payload references a target intent absent from its
    /// target table.
    #[error("orchestration target '{0}' not found in target table")]
    UnresolvedTarget(String),

    /// Cyclic or too-deep orchestration project graph.
    #[error("orchestration resolution exceeded depth limit {0}")]
    OrchestrationDepthExceeded(usize),

    /// Caller-initiated timeout or cancellation.
    #[error("recognition cancelled")]
    Cancelled,
}

impl RecognitionError {
    /// Shorthand for a transport-level failure.
    pub fn backend_unavailable(status_code: Option<u16>, message: impl Into<String>) -> Self {
        Self::BackendUnavailable {
            status_code,
            message: message.into(),
        }
    }

    /// True for the one variant the cross-trained set may degrade on.
    pub fn is_backend_unavailable(&self) -> bool {
        matches!(self, Self::BackendUnavailable { .. })
    }
}
