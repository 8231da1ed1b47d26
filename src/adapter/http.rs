//! HTTP backend adapter
//!
//! Concrete [`BackendAdapter`] speaking the conversation-analysis REST
//! shape. The request body is assembled per call from the project config;
//! nothing is accumulated on the client between requests.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use super::{BackendAdapter, ProjectConfig};
use crate::error::RecognitionError;
use crate::types::RawBackendPayload;

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const CREDENTIAL_HEADER: &str = "Ocp-Apim-Subscription-Key";

/// Reqwest-based adapter for conversation-analysis style backends.
pub struct HttpBackendAdapter {
    client: reqwest::Client,
}

impl HttpBackendAdapter {
    /// Create an adapter with the default request timeout.
    pub fn new() -> Result<Self, RecognitionError> {
        Self::with_timeout(DEFAULT_TIMEOUT_SECS)
    }

    /// Create an adapter with an explicit request timeout in seconds.
    pub fn with_timeout(timeout_secs: u64) -> Result<Self, RecognitionError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| RecognitionError::backend_unavailable(None, e.to_string()))?;
        Ok(Self { client })
    }

    fn build_url(&self, project: &ProjectConfig) -> String {
        format!(
            "{}/language/:analyze-conversations?api-version={}",
            project.endpoint.trim_end_matches('/'),
            project.api_version
        )
    }
}

// Analyze request structures. Parameters mirror the options surface:
// verbose, language, isLoggingEnabled, directTarget.

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeRequest<'a> {
    kind: &'static str,
    analysis_input: AnalysisInput<'a>,
    parameters: AnalyzeParameters<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AnalysisInput<'a> {
    conversation_item: ConversationItem<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ConversationItem<'a> {
    id: &'static str,
    participant_id: &'static str,
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeParameters<'a> {
    project_name: &'a str,
    deployment_name: &'a str,
    verbose: bool,
    is_logging_enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    language: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    direct_target: Option<&'a str>,
}

fn build_request<'a>(utterance: &'a str, project: &'a ProjectConfig) -> AnalyzeRequest<'a> {
    AnalyzeRequest {
        kind: "Conversation",
        analysis_input: AnalysisInput {
            conversation_item: ConversationItem {
                id: "1",
                participant_id: "1",
                text: utterance,
            },
        },
        parameters: AnalyzeParameters {
            project_name: &project.project_name,
            deployment_name: &project.deployment_name,
            verbose: project.verbose,
            is_logging_enabled: project.is_logging_enabled,
            language: project.language.as_deref(),
            direct_target: project.direct_target.as_deref(),
        },
    }
}

#[async_trait]
impl BackendAdapter for HttpBackendAdapter {
    async fn call(
        &self,
        utterance: &str,
        project: &ProjectConfig,
    ) -> Result<RawBackendPayload, RecognitionError> {
        let url = self.build_url(project);
        let request = build_request(utterance, project);

        tracing::debug!(
            project = %project.project_name,
            deployment = %project.deployment_name,
            "sending analyze request"
        );

        let response = self
            .client
            .post(&url)
            .header(CREDENTIAL_HEADER, &project.credential)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                RecognitionError::backend_unavailable(
                    e.status().map(|s| s.as_u16()),
                    e.to_string(),
                )
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RecognitionError::backend_unavailable(
                Some(status.as_u16()),
                format!("analyze request failed: {}", body),
            ));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| RecognitionError::MalformedResponse(e.to_string()))?;

        let result = body
            .get("result")
            .cloned()
            .ok_or_else(|| {
                RecognitionError::MalformedResponse("response body missing 'result'".to_string())
            })?;

        RawBackendPayload::from_json(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_url_joins_endpoint_and_api_version() {
        let adapter = HttpBackendAdapter::new().expect("adapter");
        let project = ProjectConfig::new("travel", "production", "https://example.net/", "key");
        assert_eq!(
            adapter.build_url(&project),
            "https://example.net/language/:analyze-conversations?api-version=2023-04-01"
        );
    }

    #[test]
    fn test_request_body_forwards_option_flags() {
        let project = ProjectConfig::new("travel", "production", "https://example.net", "key")
            .with_verbose(true)
            .with_language("en")
            .with_direct_target("FlightBooking");

        let body =
            serde_json::to_value(build_request("book me a flight", &project)).expect("serialize");
        assert_eq!(body["parameters"]["verbose"], true);
        assert_eq!(body["parameters"]["isLoggingEnabled"], false);
        assert_eq!(body["parameters"]["language"], "en");
        assert_eq!(body["parameters"]["directTarget"], "FlightBooking");
        assert_eq!(
            body["analysisInput"]["conversationItem"]["text"],
            "book me a flight"
        );
    }

    #[test]
    fn test_request_body_omits_absent_options() {
        let project = ProjectConfig::new("travel", "production", "https://example.net", "key");
        let body = serde_json::to_value(build_request("hi", &project)).expect("serialize");
        assert!(body["parameters"].get("language").is_none());
        assert!(body["parameters"].get("directTarget").is_none());
    }
}
