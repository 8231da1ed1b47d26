//! Interruption policy
//!
//! Consumed by an external dialog engine: given a recognition result and
//! a confidence threshold, decide whether the utterance should be handled
//! locally or deferred to the parent dialog. Stateless, no side effects;
//! it lives here because its only input is the canonical result schema.

use crate::types::RecognitionResult;

/// True when the top-intent score reaches the threshold, i.e. the local
/// dialog should handle the utterance instead of deferring to its parent.
pub fn should_interrupt(result: &RecognitionResult, threshold: f64) -> bool {
    result.top_score() >= threshold
}
