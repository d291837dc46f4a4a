//! Configuration (TOML)
//!
//! Every field has a default, so an empty file (or no file at all) gives the
//! stock setup: 3-mers, TF-IDF, 100 seeded trees, threshold 0.5.
//!
//! ```toml
//! [features]
//! kmer_size = 3
//! weighting = "tfidf"
//!
//! [forest]
//! n_estimators = 100
//! seed = 42
//!
//! [prediction]
//! threshold = 0.5
//! ```

use crate::error::{ProtoxError, Result};
use crate::features::{KmerSize, Weighting};
use crate::model::ForestParams;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default decision threshold on the toxic-class probability
pub const DEFAULT_THRESHOLD: f64 = 0.5;

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProtoxConfig {
    /// Featurization settings (training only; inference reads k from the vectorizer)
    pub features: FeatureConfig,
    /// Random-forest hyperparameters
    pub forest: ForestParams,
    /// Inference settings
    pub prediction: PredictionConfig,
}

/// K-mer featurization settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FeatureConfig {
    /// Window length
    pub kmer_size: KmerSize,
    /// Term weighting
    pub weighting: Weighting,
}

/// Inference settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PredictionConfig {
    /// Toxic iff probability > threshold
    pub threshold: f64,
}

impl Default for PredictionConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

impl ProtoxConfig {
    /// Load and validate configuration from a TOML file
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ProtoxError::Config(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        let config = Self::from_toml(&content)?;
        tracing::debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: ProtoxConfig = toml::from_str(content)
            .map_err(|e| ProtoxError::Config(format!("Failed to parse config file: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        self.forest
            .validate()
            .map_err(|e| ProtoxError::Config(format!("forest: {}", e)))?;
        validate_threshold(self.prediction.threshold)
            .map_err(|e| ProtoxError::Config(format!("prediction: {}", e)))?;
        Ok(())
    }
}

/// Check that a decision threshold is a probability
pub fn validate_threshold(threshold: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&threshold) {
        return Err(ProtoxError::InvalidParameter(format!(
            "threshold must be within [0, 1], got {}",
            threshold
        )));
    }
    Ok(())
}
