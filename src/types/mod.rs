//! Core type definitions for Parlance
//!
//! This module contains the fundamental types used throughout the system:
//! - RecognitionResult: the canonical backend-agnostic result schema
//! - RawBackendPayload: the discriminated per-request payload an adapter
//!   returns and the normalizer consumes

mod payload;
mod result;

pub use payload::{
    ClassicEntity, ClassicIntent, ClassicPrediction, ConversationPrediction,
    OrchestrationPrediction, PredictedEntity, PredictedIntent, Prediction, QaAnswer,
    QuestionAnsweringPrediction, RawBackendPayload, TargetReference,
};
pub use result::{
    ExtractedEntity, IntentScore, RecognitionResult, NONE_INTENT, QUESTION_ANSWERING_MATCH_INTENT,
};
