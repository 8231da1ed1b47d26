//! Backend adapter boundary
//!
//! The adapter is the capability contract each NLU backend implements:
//! accept an utterance plus project configuration, produce a raw backend
//! payload. Everything vendor-specific (transport, auth, wire format)
//! lives behind this trait.
//!
//! This module also defines the trace sink: the fire-and-forget
//! diagnostic side-channel a recognizer emits to. Sink failures never
//! affect the primary result or error path.

mod http;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::sync::Arc;

use crate::error::RecognitionError;
use crate::types::RawBackendPayload;

pub use http::HttpBackendAdapter;

/// Default analyze API version sent by the HTTP adapter.
pub const DEFAULT_API_VERSION: &str = "2023-04-01";

/// Capability contract for one NLU backend.
#[async_trait]
pub trait BackendAdapter: Send + Sync {
    /// Analyze one utterance against the given project.
    async fn call(
        &self,
        utterance: &str,
        project: &ProjectConfig,
    ) -> Result<RawBackendPayload, RecognitionError>;
}

#[async_trait]
impl BackendAdapter for Arc<dyn BackendAdapter> {
    async fn call(
        &self,
        utterance: &str,
        project: &ProjectConfig,
    ) -> Result<RawBackendPayload, RecognitionError> {
        (**self).call(utterance, project).await
    }
}

/// Per-project request options consumed by adapters.
///
/// A config is immutable once built; every call constructs its request
/// (headers, parameters, body) fresh from it rather than mutating shared
/// client state.
#[derive(Debug, Clone)]
pub struct ProjectConfig {
    /// Project identifier on the backend.
    pub project_name: String,
    /// Deployment (model slot) to query.
    pub deployment_name: String,
    /// Base endpoint URL.
    pub endpoint: String,
    /// Credential sent with each request.
    pub credential: String,
    /// Analyze API version.
    pub api_version: String,
    /// Force an utterance language hint.
    pub language: Option<String>,
    /// Include raw diagnostics in the backend response and in traces.
    pub verbose: bool,
    /// Allow vendor-side logging of the utterance.
    pub is_logging_enabled: bool,
    /// Force an orchestration project to skip top-intent selection and
    /// route directly to this named sub-project.
    pub direct_target: Option<String>,
}

impl ProjectConfig {
    /// Create a config with the required connection fields; option flags
    /// start disabled.
    pub fn new(
        project_name: impl Into<String>,
        deployment_name: impl Into<String>,
        endpoint: impl Into<String>,
        credential: impl Into<String>,
    ) -> Self {
        Self {
            project_name: project_name.into(),
            deployment_name: deployment_name.into(),
            endpoint: endpoint.into(),
            credential: credential.into(),
            api_version: DEFAULT_API_VERSION.to_string(),
            language: None,
            verbose: false,
            is_logging_enabled: false,
            direct_target: None,
        }
    }

    /// Override the analyze API version.
    pub fn with_api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = api_version.into();
        self
    }

    /// Force an utterance language hint.
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Include raw diagnostics in responses and traces.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Allow vendor-side logging of the utterance.
    pub fn with_logging_enabled(mut self, enabled: bool) -> Self {
        self.is_logging_enabled = enabled;
        self
    }

    /// Route orchestration directly to a named sub-project.
    pub fn with_direct_target(mut self, target: impl Into<String>) -> Self {
        self.direct_target = Some(target.into());
        self
    }
}

/// One diagnostic event emitted on the trace side-channel.
#[derive(Debug, Clone)]
pub struct TraceEvent {
    /// Event name, e.g. "recognizer.trace".
    pub name: String,
    /// Structured event payload.
    pub payload: Value,
    /// Emission timestamp.
    pub timestamp: DateTime<Utc>,
}

impl TraceEvent {
    /// Create an event stamped with the current time.
    pub fn new(name: impl Into<String>, payload: Value) -> Self {
        Self {
            name: name.into(),
            payload,
            timestamp: Utc::now(),
        }
    }
}

/// Sink interface for diagnostic trace events. Best-effort: emitters log
/// and swallow errors.
#[async_trait]
pub trait TraceSink: Send + Sync {
    async fn emit(&self, event: TraceEvent) -> Result<(), String>;
}

/// Sink that drops every event.
pub struct NoopTraceSink;

#[async_trait]
impl TraceSink for NoopTraceSink {
    async fn emit(&self, _event: TraceEvent) -> Result<(), String> {
        Ok(())
    }
}
