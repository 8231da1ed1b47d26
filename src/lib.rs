//! # Parlance
//!
//! An intent-recognition orchestration core: query one or more
//! natural-language-understanding backends for an utterance, normalize
//! their heterogeneous outputs into one canonical result schema, and
//! reconcile cross-trained recognizer sets into a single authoritative
//! answer.
//!
//! ## Core Concepts
//!
//! - **RecognitionResult**: the canonical, backend-agnostic result schema
//! - **BackendAdapter**: capability contract one NLU backend implements
//! - **Normalizer**: flattens raw payloads, resolving orchestration
//!   projects recursively down to the responding leaf
//! - **Recognizer**: one adapter + the normalizer + a diagnostic trace
//!   side-channel
//! - **CrossTrainedRecognizerSet**: concurrent fan-out over several
//!   recognizers with a deterministic selection policy
//!
//! ## Architecture
//!
//! ```text
//! Utterance
//!    ↓
//! BackendAdapter(s)
//!    ↓
//! RawBackendPayload(s)
//!    ↓
//! Normalizer (recursive orchestration resolution)
//!    ↓
//! RecognitionResult(s)
//!    ↓
//! CrossTrainedRecognizerSet selection (if > 1)
//!    ↓
//! RecognitionResult → should_interrupt → external dialog engine
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use parlance::prelude::*;
//!
//! let adapter = Arc::new(HttpBackendAdapter::new()?);
//! let project = ProjectConfig::new("weather-conversations", "production", endpoint, key);
//! let recognizer = Recognizer::new("weather", adapter, project);
//!
//! let ctx = RecognitionContext::new();
//! let result = recognizer.recognize("will it rain tomorrow", &ctx).await?;
//! if should_interrupt(&result, 0.5) {
//!     // handle locally
//! }
//! ```

pub mod adapter;
pub mod config;
pub mod crosstrain;
pub mod error;
pub mod interruption;
pub mod normalizer;
pub mod recognizer;
pub mod types;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::adapter::{
        BackendAdapter, HttpBackendAdapter, NoopTraceSink, ProjectConfig, TraceEvent, TraceSink,
    };
    pub use crate::config::{
        load_config, BackendSpec, ConfigError, CrossTrainingConfig, ParlanceConfig,
    };
    pub use crate::crosstrain::{CrossTrainedRecognizerSet, DeferralPolicy, SuffixDeferralPolicy};
    pub use crate::error::RecognitionError;
    pub use crate::interruption::should_interrupt;
    pub use crate::normalizer::{normalize, MAX_ORCHESTRATION_DEPTH};
    pub use crate::recognizer::{RecognitionContext, Recognizer};
    pub use crate::types::{
        ExtractedEntity, IntentScore, Prediction, RawBackendPayload, RecognitionResult,
        TargetReference, NONE_INTENT, QUESTION_ANSWERING_MATCH_INTENT,
    };
}

// Re-export key types at crate root
pub use adapter::{BackendAdapter, ProjectConfig, TraceEvent, TraceSink};
pub use crosstrain::{CrossTrainedRecognizerSet, DeferralPolicy, SuffixDeferralPolicy};
pub use error::RecognitionError;
pub use interruption::should_interrupt;
pub use normalizer::normalize;
pub use recognizer::{RecognitionContext, Recognizer};
pub use types::{RecognitionResult, NONE_INTENT, QUESTION_ANSWERING_MATCH_INTENT};
