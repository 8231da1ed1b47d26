//! Configuration
//!
//! Single-file YAML configuration for a cross-trained recognizer set: the
//! backend projects to query and the selection/interruption policy knobs.
//! Configs are loaded once at construction; recognition itself is
//! stateless and request-scoped.

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

use crate::adapter::{ProjectConfig, DEFAULT_API_VERSION};
use crate::crosstrain::{
    SuffixDeferralPolicy, DEFAULT_DEFERRAL_SUFFIX, DEFAULT_LOW_SCORE_FLOOR,
};

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Top-level configuration schema.
#[derive(Debug, Clone, Deserialize)]
pub struct ParlanceConfig {
    /// Config schema version.
    #[serde(default = "default_version")]
    pub version: u32,
    /// Backend projects in registration order.
    #[serde(default)]
    pub backends: Vec<BackendSpec>,
    #[serde(default)]
    pub cross_training: CrossTrainingConfig,
}

fn default_version() -> u32 {
    1
}

/// One backend project entry.
#[derive(Debug, Clone, Deserialize)]
pub struct BackendSpec {
    /// Recognizer id within the set.
    pub id: String,
    pub project_name: String,
    pub deployment_name: String,
    pub endpoint: String,
    pub credential: String,
    #[serde(default = "default_api_version")]
    pub api_version: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub verbose: bool,
    #[serde(default)]
    pub is_logging_enabled: bool,
    #[serde(default)]
    pub direct_target: Option<String>,
}

fn default_api_version() -> String {
    DEFAULT_API_VERSION.to_string()
}

impl BackendSpec {
    /// Per-call project config for this backend.
    pub fn project_config(&self) -> ProjectConfig {
        let mut project = ProjectConfig::new(
            &self.project_name,
            &self.deployment_name,
            &self.endpoint,
            &self.credential,
        )
        .with_api_version(&self.api_version)
        .with_verbose(self.verbose)
        .with_logging_enabled(self.is_logging_enabled);
        if let Some(language) = &self.language {
            project = project.with_language(language);
        }
        if let Some(target) = &self.direct_target {
            project = project.with_direct_target(target);
        }
        project
    }
}

/// Selection and interruption policy knobs.
#[derive(Debug, Clone, Deserialize)]
pub struct CrossTrainingConfig {
    /// Intent-name suffix treated as a deferral marker.
    #[serde(default = "default_deferral_suffix")]
    pub deferral_suffix: String,
    /// Top score at or below which a result counts as deferring.
    #[serde(default = "default_low_score_floor")]
    pub low_score_floor: f64,
    /// Threshold handed to the interruption policy.
    #[serde(default = "default_interrupt_threshold")]
    pub interrupt_threshold: f64,
}

fn default_deferral_suffix() -> String {
    DEFAULT_DEFERRAL_SUFFIX.to_string()
}

fn default_low_score_floor() -> f64 {
    DEFAULT_LOW_SCORE_FLOOR
}

fn default_interrupt_threshold() -> f64 {
    0.5
}

impl CrossTrainingConfig {
    /// Deferral policy configured by this section.
    pub fn deferral_policy(&self) -> SuffixDeferralPolicy {
        SuffixDeferralPolicy::new()
            .with_suffix(&self.deferral_suffix)
            .with_low_score_floor(self.low_score_floor)
    }
}

impl Default for CrossTrainingConfig {
    fn default() -> Self {
        Self {
            deferral_suffix: default_deferral_suffix(),
            low_score_floor: default_low_score_floor(),
            interrupt_threshold: default_interrupt_threshold(),
        }
    }
}

/// Load and validate configuration from a YAML file.
pub fn load_config(path: &Path) -> Result<ParlanceConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parse and validate configuration from YAML text.
pub fn parse_config(content: &str) -> Result<ParlanceConfig, ConfigError> {
    let config: ParlanceConfig = serde_yaml::from_str(content)?;
    validate_config(&config)?;
    Ok(config)
}

fn validate_config(config: &ParlanceConfig) -> Result<(), ConfigError> {
    if config.version == 0 {
        return Err(ConfigError::Invalid(
            "version must be greater than 0".to_string(),
        ));
    }

    let mut seen_ids = std::collections::HashSet::new();
    for backend in &config.backends {
        if backend.id.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "backends[].id must not be empty".to_string(),
            ));
        }
        if !seen_ids.insert(backend.id.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "duplicate backend id '{}'",
                backend.id
            )));
        }
        if backend.endpoint.trim().is_empty() {
            return Err(ConfigError::Invalid(format!(
                "backends['{}'].endpoint must not be empty",
                backend.id
            )));
        }
        if backend.project_name.trim().is_empty() {
            return Err(ConfigError::Invalid(format!(
                "backends['{}'].project_name must not be empty",
                backend.id
            )));
        }
    }

    let policy = &config.cross_training;
    if !(0.0..=1.0).contains(&policy.low_score_floor) {
        return Err(ConfigError::Invalid(
            "cross_training.low_score_floor must be within [0, 1]".to_string(),
        ));
    }
    if !(0.0..=1.0).contains(&policy.interrupt_threshold) {
        return Err(ConfigError::Invalid(
            "cross_training.interrupt_threshold must be within [0, 1]".to_string(),
        ));
    }

    Ok(())
}
