//! Cross-trained recognizer set
//!
//! Queries several independently-trained recognizers for the same
//! utterance and picks one authoritative result.
//!
//! Responsibilities:
//! - Concurrent fan-out with per-call isolation (one slow or failed
//!   backend never corrupts sibling results)
//! - Deferral detection via a pluggable policy
//! - Deterministic selection independent of completion order
//! - Graceful degradation on individual backend outages
//!
//! Selection policy, in order: a single non-deferring, non-sentinel
//! result wins outright; several compete on top-intent score with ties
//! resolved to the first-registered recognizer; if everyone defers, the
//! first-registered recognizer's sentinel result is the stable fallback.

use futures_util::stream::{FuturesUnordered, StreamExt};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::error::RecognitionError;
use crate::recognizer::{RecognitionContext, Recognizer};
use crate::types::RecognitionResult;

/// Intent-name suffix the default policy treats as a deferral marker.
pub const DEFAULT_DEFERRAL_SUFFIX: &str = "_ChooseIntent";

/// Top-intent score at or below which the default policy treats a result
/// as deferring.
pub const DEFAULT_LOW_SCORE_FLOOR: f64 = 0.05;

/// Decides whether a recognizer's result means "this utterance belongs to
/// a different recognizer in the set".
///
/// The backend-side rule that generates deferral markers varies by
/// vendor, so the detection rule is pluggable rather than hard-coded.
pub trait DeferralPolicy: Send + Sync {
    fn is_deferral(&self, recognizer_id: &str, result: &RecognitionResult) -> bool;
}

/// Default deferral detection: a top intent carrying the
/// `"<OriginalIntent>_<RecognizerId>_ChooseIntent"`-style suffix, or a
/// top score at or below the configured floor.
pub struct SuffixDeferralPolicy {
    suffix: String,
    low_score_floor: f64,
}

impl SuffixDeferralPolicy {
    /// Policy with the default suffix and score floor.
    pub fn new() -> Self {
        Self {
            suffix: DEFAULT_DEFERRAL_SUFFIX.to_string(),
            low_score_floor: DEFAULT_LOW_SCORE_FLOOR,
        }
    }

    /// Override the marker suffix.
    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }

    /// Override the low-score floor.
    pub fn with_low_score_floor(mut self, floor: f64) -> Self {
        self.low_score_floor = floor;
        self
    }
}

impl Default for SuffixDeferralPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl DeferralPolicy for SuffixDeferralPolicy {
    fn is_deferral(&self, _recognizer_id: &str, result: &RecognitionResult) -> bool {
        match result.top_intent() {
            None => true,
            Some((name, score)) => name.ends_with(&self.suffix) || score <= self.low_score_floor,
        }
    }
}

/// An ordered set of cross-trained recognizers with a selection policy.
pub struct CrossTrainedRecognizerSet {
    recognizers: Vec<Recognizer>,
    deferral: Arc<dyn DeferralPolicy>,
}

struct Candidate {
    id: String,
    result: RecognitionResult,
    /// Synthesized from a backend outage rather than a real answer.
    failed: bool,
}

impl CrossTrainedRecognizerSet {
    /// Create a set over recognizers in registration order, with the
    /// default deferral policy.
    pub fn new(recognizers: Vec<Recognizer>) -> Self {
        Self {
            recognizers,
            deferral: Arc::new(SuffixDeferralPolicy::new()),
        }
    }

    /// Replace the deferral detection policy.
    pub fn with_deferral_policy(mut self, deferral: Arc<dyn DeferralPolicy>) -> Self {
        self.deferral = deferral;
        self
    }

    /// Number of registered recognizers.
    pub fn len(&self) -> usize {
        self.recognizers.len()
    }

    /// True when no recognizer is registered.
    pub fn is_empty(&self) -> bool {
        self.recognizers.is_empty()
    }

    /// Query every recognizer concurrently and select the authoritative
    /// result.
    ///
    /// Individual `BackendUnavailable` failures degrade into the
    /// `properties["partialFailures"]` entry of the selected result;
    /// contract-break errors from any member fail the whole set.
    /// Cancellation mid-fan-out drops in-flight calls and returns
    /// `Cancelled` with no partial result. An empty set yields the
    /// sentinel result directly.
    pub async fn recognize(
        &self,
        utterance: &str,
        ctx: &RecognitionContext,
    ) -> Result<RecognitionResult, RecognitionError> {
        if self.recognizers.is_empty() {
            return Ok(RecognitionResult::none(utterance));
        }

        let mut in_flight = FuturesUnordered::new();
        for (index, recognizer) in self.recognizers.iter().enumerate() {
            in_flight.push(async move { (index, recognizer.recognize(utterance, ctx).await) });
        }

        let mut completed = Vec::with_capacity(self.recognizers.len());
        loop {
            tokio::select! {
                _ = ctx.cancellation.cancelled() => return Err(RecognitionError::Cancelled),
                next = in_flight.next() => match next {
                    Some(outcome) => completed.push(outcome),
                    None => break,
                },
            }
        }
        // Re-establish registration order so selection never depends on
        // completion order.
        completed.sort_by_key(|(index, _)| *index);

        let mut partial_failures: Vec<Value> = Vec::new();
        let mut candidates = Vec::with_capacity(completed.len());
        for (index, outcome) in completed {
            let id = self.recognizers[index].id().to_string();
            match outcome {
                Ok(result) => candidates.push(Candidate {
                    id,
                    result,
                    failed: false,
                }),
                Err(RecognitionError::BackendUnavailable {
                    status_code,
                    message,
                }) => {
                    tracing::warn!(
                        recognizer_id = %id,
                        status_code = status_code,
                        "backend unavailable, degrading to sentinel: {}",
                        message
                    );
                    partial_failures.push(json!({
                        "recognizerId": id,
                        "statusCode": status_code,
                        "message": message,
                    }));
                    candidates.push(Candidate {
                        id,
                        result: RecognitionResult::none(utterance),
                        failed: true,
                    });
                }
                Err(RecognitionError::Cancelled) => return Err(RecognitionError::Cancelled),
                Err(hard) => return Err(hard),
            }
        }

        let mut selected = self.select(candidates, utterance, ctx);
        if !partial_failures.is_empty() {
            selected
                .properties
                .insert("partialFailures".to_string(), Value::Array(partial_failures));
        }
        Ok(selected)
    }

    fn select(
        &self,
        mut candidates: Vec<Candidate>,
        utterance: &str,
        ctx: &RecognitionContext,
    ) -> RecognitionResult {
        let mut winner: Option<usize> = None;
        for (index, candidate) in candidates.iter().enumerate() {
            let eligible = !candidate.failed
                && !candidate.result.is_none_result()
                && !self.deferral.is_deferral(&candidate.id, &candidate.result);
            if !eligible {
                continue;
            }
            match winner {
                // Strict greater-than keeps ties on the first-registered.
                Some(current)
                    if candidate.result.top_score() <= candidates[current].result.top_score() => {}
                _ => winner = Some(index),
            }
        }

        match winner {
            Some(index) => {
                let candidate = candidates.swap_remove(index);
                tracing::info!(
                    request_id = %ctx.request_id,
                    recognizer_id = %candidate.id,
                    top_score = candidate.result.top_score(),
                    "cross-trained selection completed"
                );
                candidate.result
            }
            None => {
                tracing::info!(
                    request_id = %ctx.request_id,
                    "all recognizers deferred, falling back to sentinel"
                );
                match candidates.into_iter().next() {
                    Some(first) => sentinel_fallback(first.result),
                    None => RecognitionResult::none(utterance),
                }
            }
        }
    }
}

/// Stable fallback when every recognizer defers: the first-registered
/// recognizer's result, reduced to the sentinel intent. Deferral-marker
/// intents and entities are discarded; text and diagnostics are kept.
fn sentinel_fallback(result: RecognitionResult) -> RecognitionResult {
    if result.is_none_result() {
        return result;
    }
    let mut sentinel = RecognitionResult::none(result.text);
    sentinel.altered_text = result.altered_text;
    sentinel.properties = result.properties;
    sentinel
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use tokio::time::{sleep, Duration};
    use tokio_util::sync::CancellationToken;

    use crate::adapter::{BackendAdapter, ProjectConfig};
    use crate::types::{
        ConversationPrediction, PredictedIntent, Prediction, RawBackendPayload, NONE_INTENT,
    };

    fn intent_payload(name: &str, score: f64) -> RawBackendPayload {
        RawBackendPayload {
            query: None,
            prediction: Prediction::Conversation(ConversationPrediction {
                top_intent: Some(name.to_string()),
                intents: vec![PredictedIntent {
                    category: name.to_string(),
                    confidence: score,
                }],
                entities: Vec::new(),
            }),
        }
    }

    fn project() -> ProjectConfig {
        ProjectConfig::new("p", "production", "https://example.net", "key")
    }

    struct StaticAdapter {
        payload: RawBackendPayload,
        delay_ms: u64,
    }

    impl StaticAdapter {
        fn intent(name: &str, score: f64) -> Self {
            Self {
                payload: intent_payload(name, score),
                delay_ms: 0,
            }
        }

        fn with_delay(mut self, delay_ms: u64) -> Self {
            self.delay_ms = delay_ms;
            self
        }
    }

    #[async_trait]
    impl BackendAdapter for StaticAdapter {
        async fn call(
            &self,
            _utterance: &str,
            _project: &ProjectConfig,
        ) -> Result<RawBackendPayload, RecognitionError> {
            if self.delay_ms > 0 {
                sleep(Duration::from_millis(self.delay_ms)).await;
            }
            Ok(self.payload.clone())
        }
    }

    struct FailingAdapter;

    #[async_trait]
    impl BackendAdapter for FailingAdapter {
        async fn call(
            &self,
            _utterance: &str,
            _project: &ProjectConfig,
        ) -> Result<RawBackendPayload, RecognitionError> {
            Err(RecognitionError::backend_unavailable(Some(502), "bad gateway"))
        }
    }

    struct MalformedAdapter;

    #[async_trait]
    impl BackendAdapter for MalformedAdapter {
        async fn call(
            &self,
            _utterance: &str,
            _project: &ProjectConfig,
        ) -> Result<RawBackendPayload, RecognitionError> {
            Err(RecognitionError::MalformedResponse(
                "unknown projectKind".to_string(),
            ))
        }
    }

    struct PendingAdapter;

    #[async_trait]
    impl BackendAdapter for PendingAdapter {
        async fn call(
            &self,
            _utterance: &str,
            _project: &ProjectConfig,
        ) -> Result<RawBackendPayload, RecognitionError> {
            std::future::pending::<()>().await;
            unreachable!()
        }
    }

    fn recognizer(id: &str, adapter: impl BackendAdapter + 'static) -> Recognizer {
        Recognizer::new(id, Arc::new(adapter), project())
    }

    #[test]
    fn test_single_confident_recognizer_wins() {
        tokio_test::block_on(async {
            let set = CrossTrainedRecognizerSet::new(vec![
                recognizer("weather", StaticAdapter::intent("Weather", 0.92)),
                recognizer("home", StaticAdapter::intent(NONE_INTENT, 0.1)),
            ]);

            let result = set
                .recognize("what's the weather", &RecognitionContext::new())
                .await
                .expect("recognize");
            assert_eq!(result.top_intent(), Some(("Weather", 0.92)));
        });
    }

    #[test]
    fn test_equal_scores_resolve_to_first_registered() {
        tokio_test::block_on(async {
            let set = CrossTrainedRecognizerSet::new(vec![
                recognizer("first", StaticAdapter::intent("A", 0.8)),
                recognizer("second", StaticAdapter::intent("B", 0.8)),
            ]);

            let result = set
                .recognize("ambiguous", &RecognitionContext::new())
                .await
                .expect("recognize");
            assert_eq!(result.top_intent(), Some(("A", 0.8)));
        });
    }

    #[test]
    fn test_selection_is_independent_of_completion_order() {
        tokio_test::block_on(async {
            // The first-registered recognizer completes last but still
            // wins the tie.
            let set = CrossTrainedRecognizerSet::new(vec![
                recognizer("slow", StaticAdapter::intent("A", 0.8).with_delay(40)),
                recognizer("fast", StaticAdapter::intent("B", 0.8)),
            ]);

            let result = set
                .recognize("ambiguous", &RecognitionContext::new())
                .await
                .expect("recognize");
            assert_eq!(result.top_intent(), Some(("A", 0.8)));
        });
    }

    #[test]
    fn test_deferral_marker_excludes_recognizer() {
        tokio_test::block_on(async {
            let set = CrossTrainedRecognizerSet::new(vec![
                recognizer("weather", StaticAdapter::intent("Weather", 0.6)),
                recognizer(
                    "home",
                    StaticAdapter::intent("Weather_home_ChooseIntent", 0.9),
                ),
            ]);

            let result = set
                .recognize("turn on the weather channel", &RecognitionContext::new())
                .await
                .expect("recognize");
            assert_eq!(result.top_intent(), Some(("Weather", 0.6)));
        });
    }

    #[test]
    fn test_backend_outage_degrades_to_partial_failure() {
        tokio_test::block_on(async {
            let set = CrossTrainedRecognizerSet::new(vec![
                recognizer("down", FailingAdapter),
                recognizer("greeting", StaticAdapter::intent("Greeting", 0.6)),
            ]);

            let result = set
                .recognize("hello there", &RecognitionContext::new())
                .await
                .expect("recognize");
            assert_eq!(result.top_intent(), Some(("Greeting", 0.6)));

            let failures = result.properties["partialFailures"]
                .as_array()
                .expect("failures array");
            assert_eq!(failures.len(), 1);
            assert_eq!(failures[0]["recognizerId"], json!("down"));
            assert_eq!(failures[0]["statusCode"], json!(502));
        });
    }

    #[test]
    fn test_all_deferring_falls_back_to_first_registered_sentinel() {
        tokio_test::block_on(async {
            let set = CrossTrainedRecognizerSet::new(vec![
                recognizer("first", StaticAdapter::intent("Greeting_first_ChooseIntent", 0.7)),
                recognizer("second", StaticAdapter::intent(NONE_INTENT, 0.0)),
            ]);

            let result = set
                .recognize("mumble", &RecognitionContext::new())
                .await
                .expect("recognize");
            assert_eq!(result.top_intent(), Some((NONE_INTENT, 0.0)));
            assert_eq!(result.text, "mumble");
        });
    }

    #[test]
    fn test_contract_break_fails_the_whole_set() {
        tokio_test::block_on(async {
            let set = CrossTrainedRecognizerSet::new(vec![
                recognizer("broken", MalformedAdapter),
                recognizer("fine", StaticAdapter::intent("Greeting", 0.9)),
            ]);

            let err = set
                .recognize("hello", &RecognitionContext::new())
                .await
                .expect_err("hard failure");
            assert!(matches!(err, RecognitionError::MalformedResponse(_)));
        });
    }

    #[test]
    fn test_cancellation_mid_fan_out_returns_cancelled() {
        tokio_test::block_on(async {
            let set = CrossTrainedRecognizerSet::new(vec![
                recognizer("fast", StaticAdapter::intent("Weather", 0.9)),
                recognizer("stuck", PendingAdapter),
            ]);

            let token = CancellationToken::new();
            let ctx = RecognitionContext::new().with_cancellation(token.clone());
            let cancel = token.clone();
            tokio::spawn(async move {
                sleep(Duration::from_millis(20)).await;
                cancel.cancel();
            });

            let err = set
                .recognize("hang on", &ctx)
                .await
                .expect_err("cancelled mid fan-out");
            assert!(matches!(err, RecognitionError::Cancelled));
        });
    }

    #[test]
    fn test_empty_set_yields_sentinel() {
        tokio_test::block_on(async {
            let set = CrossTrainedRecognizerSet::new(Vec::new());
            let result = set
                .recognize("anyone", &RecognitionContext::new())
                .await
                .expect("recognize");
            assert!(result.is_none_result());
        });
    }

    #[test]
    fn test_suffix_policy_detects_marker_and_floor() {
        let policy = SuffixDeferralPolicy::new();

        let mut marker = RecognitionResult::empty("x");
        marker.intents.insert(
            "Weather_home_ChooseIntent".to_string(),
            crate::types::IntentScore::new(0.9),
        );
        assert!(policy.is_deferral("home", &marker));

        let mut low = RecognitionResult::empty("x");
        low.intents
            .insert("Weather".to_string(), crate::types::IntentScore::new(0.05));
        assert!(policy.is_deferral("home", &low));

        let mut confident = RecognitionResult::empty("x");
        confident
            .intents
            .insert("Weather".to_string(), crate::types::IntentScore::new(0.06));
        assert!(!policy.is_deferral("home", &confident));
    }
}
