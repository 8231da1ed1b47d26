//! Raw backend payload model
//!
//! The discriminated shape an NLU backend answers with. A payload is
//! created per request by an adapter, consumed once by the normalizer and
//! then discarded; nothing here is persisted.
//!
//! The project kind and the orchestration target kind are both explicit
//! serde tags decided at the producer boundary, so the normalizer can
//! match over them exhaustively instead of inspecting runtime type names.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use crate::error::RecognitionError;

/// One backend response: the echoed query plus a kind-tagged prediction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawBackendPayload {
    /// Query as the backend echoed it back, when it does.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    pub prediction: Prediction,
}

impl RawBackendPayload {
    /// Parse a payload out of a raw JSON value.
    ///
    /// A missing or unknown `projectKind` discriminator is a contract
    /// break with the backend and surfaces as `MalformedResponse`.
    pub fn from_json(value: Value) -> Result<Self, RecognitionError> {
        serde_json::from_value(value).map_err(|e| RecognitionError::MalformedResponse(e.to_string()))
    }
}

/// Prediction payload, discriminated by the project kind that produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "projectKind")]
pub enum Prediction {
    /// Direct intent/entity result from a conversation-style project.
    Conversation(ConversationPrediction),
    /// A meta project routing to one of several sub-projects.
    Orchestration(OrchestrationPrediction),
    /// Answer + confidence list from a question-answering project.
    QuestionAnswering(QuestionAnsweringPrediction),
}

/// Intent/entity prediction of a conversation-style project.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationPrediction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_intent: Option<String>,
    #[serde(default)]
    pub intents: Vec<PredictedIntent>,
    #[serde(default)]
    pub entities: Vec<PredictedEntity>,
}

/// A scored intent as reported by a conversation or orchestration project.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictedIntent {
    pub category: String,
    pub confidence: f64,
}

/// An entity span as reported by a conversation project: character offset
/// plus length into the analyzed query.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictedEntity {
    pub category: String,
    pub text: String,
    pub offset: usize,
    pub length: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<Value>,
}

/// Prediction of an orchestration project: its own intent ranking (one
/// intent per candidate sub-project) plus the table of target results
/// keyed by that intent name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrchestrationPrediction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_intent: Option<String>,
    #[serde(default)]
    pub intents: Vec<PredictedIntent>,
    #[serde(default)]
    pub targets: HashMap<String, TargetReference>,
}

impl OrchestrationPrediction {
    /// Name of the highest-confidence intent, independent of list order.
    pub fn top_scoring_intent(&self) -> Option<&str> {
        self.intents
            .iter()
            .max_by(|a, b| {
                a.confidence
                    .partial_cmp(&b.confidence)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|intent| intent.category.as_str())
    }
}

/// Result a sub-project produced for its orchestration parent,
/// discriminated by the kind of the target project.
///
/// Exclusively owned by the orchestration payload that contains it; the
/// normalizer reads it once and produces a flattened result.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "targetKind")]
pub enum TargetReference {
    /// The target is itself a conversation (or nested orchestration)
    /// project; the normalizer recurses into its payload.
    Conversation { payload: Box<RawBackendPayload> },
    /// Classic intent/entity model: single top intent plus alternates.
    ClassicIntent { prediction: ClassicPrediction },
    /// Question-answering project: list of scored answers.
    QuestionAnswering { prediction: QuestionAnsweringPrediction },
}

/// Classic intent/entity shape with explicit spans.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassicPrediction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_intent: Option<String>,
    #[serde(default)]
    pub intents: Vec<ClassicIntent>,
    #[serde(default)]
    pub entities: Vec<ClassicEntity>,
}

/// A scored intent in the classic shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassicIntent {
    pub name: String,
    pub score: f64,
}

/// An entity span in the classic shape: zero-based, end-exclusive.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassicEntity {
    pub category: String,
    pub text: String,
    pub start_index: usize,
    pub end_index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<Value>,
}

/// Prediction of a question-answering project.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionAnsweringPrediction {
    #[serde(default)]
    pub answers: Vec<QaAnswer>,
}

impl QuestionAnsweringPrediction {
    /// Highest-confidence answer, when any answer exists.
    pub fn best_answer(&self) -> Option<&QaAnswer> {
        self.answers.iter().max_by(|a, b| {
            a.confidence
                .partial_cmp(&b.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
        })
    }
}

/// One scored answer from a question-answering project.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QaAnswer {
    pub answer: String,
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub questions: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_conversation_payload_parses_from_tagged_json() {
        let payload = RawBackendPayload::from_json(json!({
            "query": "what's the weather",
            "prediction": {
                "projectKind": "Conversation",
                "topIntent": "Weather",
                "intents": [
                    {"category": "Weather", "confidence": 0.92},
                    {"category": "None", "confidence": 0.03}
                ],
                "entities": [
                    {"category": "place", "text": "weather", "offset": 11, "length": 7}
                ]
            }
        }))
        .expect("payload");

        match payload.prediction {
            Prediction::Conversation(p) => {
                assert_eq!(p.top_intent.as_deref(), Some("Weather"));
                assert_eq!(p.intents.len(), 2);
                assert_eq!(p.entities[0].offset, 11);
            }
            other => panic!("expected conversation prediction, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_project_kind_is_malformed() {
        let err = RawBackendPayload::from_json(json!({
            "query": "hi",
            "prediction": {"topIntent": "Greeting"}
        }))
        .expect_err("discriminator missing");

        assert!(matches!(err, RecognitionError::MalformedResponse(_)));
    }

    #[test]
    fn test_unknown_project_kind_is_malformed() {
        let err = RawBackendPayload::from_json(json!({
            "prediction": {"projectKind": "Telepathy", "intents": []}
        }))
        .expect_err("unknown discriminator");

        assert!(matches!(err, RecognitionError::MalformedResponse(_)));
    }

    #[test]
    fn test_orchestration_top_scoring_intent_ignores_list_order() {
        let prediction = OrchestrationPrediction {
            top_intent: None,
            intents: vec![
                PredictedIntent {
                    category: "FlightBooking".to_string(),
                    confidence: 0.31,
                },
                PredictedIntent {
                    category: "HotelBooking".to_string(),
                    confidence: 0.64,
                },
            ],
            targets: HashMap::new(),
        };

        assert_eq!(prediction.top_scoring_intent(), Some("HotelBooking"));
    }

    #[test]
    fn test_best_answer_picks_highest_confidence() {
        let prediction = QuestionAnsweringPrediction {
            answers: vec![
                QaAnswer {
                    answer: "close at 5pm".to_string(),
                    confidence: 0.41,
                    source: None,
                    questions: Vec::new(),
                },
                QaAnswer {
                    answer: "open at 9am".to_string(),
                    confidence: 0.88,
                    source: Some("faq.md".to_string()),
                    questions: Vec::new(),
                },
            ],
        };

        assert_eq!(
            prediction.best_answer().map(|a| a.answer.as_str()),
            Some("open at 9am")
        );
    }
}
