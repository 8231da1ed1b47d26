//! Canonical recognition result schema
//!
//! RecognitionResult is the one durable contract of this crate: every
//! backend payload is flattened into it, and downstream consumers (dialog
//! engines, interruption logic) depend on its JSON wire shape.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Sentinel intent name used when a backend recognized nothing.
pub const NONE_INTENT: &str = "None";

/// Intent name under which a question-answering match is surfaced.
pub const QUESTION_ANSWERING_MATCH_INTENT: &str = "QuestionAnsweringMatch";

/// Normalized result of one recognition request.
///
/// Invariants: `intents` is never empty after normalization (absence of a
/// recognized intent is the [`NONE_INTENT`] sentinel with a score), and
/// entity ranges are zero-based, end-exclusive and never exceed
/// `text.len()`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecognitionResult {
    /// Original utterance.
    pub text: String,
    /// Utterance as rewritten by the backend (e.g. spelling-corrected).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub altered_text: Option<String>,
    /// Recognized intents keyed by name.
    #[serde(default)]
    pub intents: HashMap<String, IntentScore>,
    /// Extracted entities keyed by entity type.
    #[serde(default)]
    pub entities: HashMap<String, Vec<ExtractedEntity>>,
    /// Backend-specific extras that don't belong in the core schema.
    #[serde(default)]
    pub properties: HashMap<String, Value>,
}

/// Confidence score for a single intent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentScore {
    /// Confidence in [0, 1].
    pub score: f64,
    /// Extracted slot values bound to this intent, when the backend
    /// reports them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub child_bindings: Option<HashMap<String, Value>>,
}

impl IntentScore {
    /// Score-only intent entry.
    pub fn new(score: f64) -> Self {
        Self {
            score,
            child_bindings: None,
        }
    }
}

/// A typed span extracted from the utterance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedEntity {
    /// Matched surface text.
    pub value: String,
    /// Zero-based start of the span.
    pub start_index: usize,
    /// End of the span, exclusive.
    pub end_index: usize,
    /// Backend-side resolution of the span (dates, numbers, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_value: Option<Value>,
}

impl RecognitionResult {
    /// Empty result shell for an utterance. The normalizer fills it and
    /// guarantees the non-empty-intents invariant before handing it out.
    pub fn empty(utterance: impl Into<String>) -> Self {
        Self {
            text: utterance.into(),
            ..Self::default()
        }
    }

    /// The [`NONE_INTENT`] sentinel result for an utterance.
    pub fn none(utterance: impl Into<String>) -> Self {
        let mut result = Self::empty(utterance);
        result
            .intents
            .insert(NONE_INTENT.to_string(), IntentScore::new(0.0));
        result
    }

    /// Best-scoring intent as `(name, score)`.
    ///
    /// Equal scores resolve to the lexicographically smaller name so map
    /// iteration order never leaks into selection decisions.
    pub fn top_intent(&self) -> Option<(&str, f64)> {
        self.intents
            .iter()
            .map(|(name, intent)| (name.as_str(), intent.score))
            .max_by(|(a_name, a_score), (b_name, b_score)| {
                a_score
                    .partial_cmp(b_score)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| b_name.cmp(a_name))
            })
    }

    /// Score of the best intent, 0.0 when no intent is present.
    pub fn top_score(&self) -> f64 {
        self.top_intent().map(|(_, score)| score).unwrap_or(0.0)
    }

    /// True when the best intent is the [`NONE_INTENT`] sentinel.
    pub fn is_none_result(&self) -> bool {
        matches!(self.top_intent(), None | Some((NONE_INTENT, _)))
    }
}
