//! Result normalizer module
//!
//! The normalizer is the stability core of Parlance: it flattens every
//! backend payload shape into the canonical [`RecognitionResult`].
//!
//! Responsibilities:
//! - Map conversation, classic and question-answering predictions 1:1
//!   into the result schema
//! - Resolve orchestration payloads recursively down to the responding
//!   leaf project, bounded by a depth guard
//! - Guarantee the non-empty-intents invariant (sentinel `"None"`)
//! - Clamp entity spans to the utterance
//!
//! The normalizer does NOT handle:
//! - Transport or authentication (adapter concern)
//! - Cross-recognizer selection (cross-trained set concern)

use serde_json::{json, Value};

use crate::error::RecognitionError;
use crate::types::{
    ClassicPrediction, ConversationPrediction, ExtractedEntity, IntentScore,
    OrchestrationPrediction, Prediction, QuestionAnsweringPrediction, RawBackendPayload,
    RecognitionResult, TargetReference, NONE_INTENT, QUESTION_ANSWERING_MATCH_INTENT,
};

/// Maximum number of orchestration hops before a project graph is treated
/// as cyclic or misconfigured.
pub const MAX_ORCHESTRATION_DEPTH: usize = 5;

/// Flatten one backend payload into the canonical result schema.
///
/// Total over every well-formed payload: the only failure modes are an
/// orchestration intent with no entry in the target table
/// (`UnresolvedTarget`) and a project graph deeper than
/// [`MAX_ORCHESTRATION_DEPTH`] (`OrchestrationDepthExceeded`).
pub fn normalize(
    payload: &RawBackendPayload,
    utterance: &str,
) -> Result<RecognitionResult, RecognitionError> {
    let mut result = RecognitionResult::empty(utterance);
    result.altered_text = payload.query.clone();

    resolve_prediction(&payload.prediction, &mut result, 0)?;

    if matches!(payload.prediction, Prediction::Orchestration(_)) {
        if let Some(query) = &payload.query {
            result
                .properties
                .entry("topLevelQuery".to_string())
                .or_insert_with(|| json!(query));
        }
    }

    if result.intents.is_empty() {
        result
            .intents
            .insert(NONE_INTENT.to_string(), IntentScore::new(0.0));
    }

    Ok(result)
}

fn resolve_prediction(
    prediction: &Prediction,
    out: &mut RecognitionResult,
    depth: usize,
) -> Result<(), RecognitionError> {
    if depth > MAX_ORCHESTRATION_DEPTH {
        return Err(RecognitionError::OrchestrationDepthExceeded(
            MAX_ORCHESTRATION_DEPTH,
        ));
    }

    match prediction {
        Prediction::Conversation(p) => {
            map_conversation(p, out);
            Ok(())
        }
        Prediction::QuestionAnswering(p) => {
            map_question_answering(p, out);
            Ok(())
        }
        Prediction::Orchestration(p) => resolve_orchestration(p, out, depth),
    }
}

fn resolve_orchestration(
    prediction: &OrchestrationPrediction,
    out: &mut RecognitionResult,
    depth: usize,
) -> Result<(), RecognitionError> {
    let Some(top) = prediction.top_scoring_intent() else {
        tracing::debug!(depth, "orchestration intent list empty");
        merge_orchestration_properties(prediction, out);
        return Ok(());
    };
    let top = top.to_string();

    let target = prediction
        .targets
        .get(&top)
        .ok_or_else(|| RecognitionError::UnresolvedTarget(top.clone()))?;

    tracing::debug!(target = %top, depth, "resolving orchestration target");

    match target {
        TargetReference::Conversation { payload } => {
            if out.altered_text.is_none() {
                out.altered_text = payload.query.clone();
            }
            resolve_prediction(&payload.prediction, out, depth + 1)?;
        }
        TargetReference::ClassicIntent { prediction } => map_classic(prediction, out),
        TargetReference::QuestionAnswering { prediction } => map_question_answering(prediction, out),
    }

    // Orchestration-level metadata is supplementary: the nested
    // resolution owns any keys it already set.
    merge_orchestration_properties(prediction, out);
    Ok(())
}

fn map_conversation(prediction: &ConversationPrediction, out: &mut RecognitionResult) {
    for intent in &prediction.intents {
        out.intents.insert(
            intent.category.clone(),
            IntentScore::new(intent.confidence),
        );
    }
    for entity in &prediction.entities {
        let (start_index, end_index) = clamp_span(
            entity.offset,
            entity.offset.saturating_add(entity.length),
            out.text.len(),
        );
        out.entities
            .entry(entity.category.clone())
            .or_default()
            .push(ExtractedEntity {
                value: entity.text.clone(),
                start_index,
                end_index,
                resolved_value: entity.resolution.clone(),
            });
    }
}

fn map_classic(prediction: &ClassicPrediction, out: &mut RecognitionResult) {
    for intent in &prediction.intents {
        out.intents
            .insert(intent.name.clone(), IntentScore::new(intent.score));
    }
    for entity in &prediction.entities {
        let (start_index, end_index) =
            clamp_span(entity.start_index, entity.end_index, out.text.len());
        out.entities
            .entry(entity.category.clone())
            .or_default()
            .push(ExtractedEntity {
                value: entity.text.clone(),
                start_index,
                end_index,
                resolved_value: entity.resolution.clone(),
            });
    }
}

fn map_question_answering(prediction: &QuestionAnsweringPrediction, out: &mut RecognitionResult) {
    let Some(best) = prediction.best_answer() else {
        tracing::debug!("question answering returned no answers");
        return;
    };

    out.intents.insert(
        QUESTION_ANSWERING_MATCH_INTENT.to_string(),
        IntentScore::new(best.confidence),
    );
    out.properties
        .insert("answer".to_string(), json!(best.answer));
    out.properties
        .insert("answerConfidence".to_string(), json!(best.confidence));
    if let Some(source) = &best.source {
        out.properties
            .insert("answerSource".to_string(), json!(source));
    }
    if !best.questions.is_empty() {
        out.properties
            .insert("answerQuestions".to_string(), json!(best.questions));
    }
}

fn merge_orchestration_properties(
    prediction: &OrchestrationPrediction,
    out: &mut RecognitionResult,
) {
    if !prediction.intents.is_empty() {
        let ranking: Vec<Value> = prediction
            .intents
            .iter()
            .map(|i| json!({"category": i.category, "confidence": i.confidence}))
            .collect();
        out.properties
            .entry("orchestrationIntents".to_string())
            .or_insert_with(|| Value::Array(ranking));
    }
    if let Some(top) = prediction.top_scoring_intent() {
        out.properties
            .entry("respondingProjectName".to_string())
            .or_insert_with(|| json!(top));
    }
}

/// Clamp a backend-reported span into `[0, len]`, end-exclusive.
fn clamp_span(start: usize, end: usize, len: usize) -> (usize, usize) {
    let clamped_start = start.min(len);
    let clamped_end = end.min(len).max(clamped_start);
    if (clamped_start, clamped_end) != (start, end) {
        tracing::debug!(start, end, len, "clamped entity span to utterance");
    }
    (clamped_start, clamped_end)
}
