use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierOptions {
    pub score_floor: f64,
    pub tie_epsilon: f64,
    pub smoothing: f64,
}

impl Default for ClassifierOptions {
    fn default() -> Self {
        Self {
            score_floor: 0.35,
            tie_epsilon: 1e-6,
            smoothing: 1e-6,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsensusOptions {
    pub threshold: f64,
    pub single_rater_threshold: f64,
}

impl Default for ConsensusOptions {
    fn default() -> Self {
        Self {
            threshold: 0.7,
            single_rater_threshold: 0.85,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorOptions {
    pub low_coverage_ratio: f64,
    pub near_universal_ratio: f64,
    pub uniform_confidence_ratio: f64,
    pub low_domain_confidence: f64,
    pub min_reliable_alpha: f64,
    pub error_penalty: f64,
    pub warning_penalty: f64,
}

impl Default for ValidatorOptions {
    fn default() -> Self {
        Self {
            low_coverage_ratio: 0.1,
            near_universal_ratio: 0.98,
            uniform_confidence_ratio: 0.95,
            low_domain_confidence: 0.5,
            min_reliable_alpha: 0.667,
            error_penalty: 0.35,
            warning_penalty: 0.05,
        }
    }
}

/// Tunable thresholds for one analysis run. Every field has a default so a
/// partial JSON file only overrides what it names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub min_acceptance_confidence: f64,
    pub classifier: ClassifierOptions,
    pub consensus: ConsensusOptions,
    pub validator: ValidatorOptions,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            min_acceptance_confidence: 0.5,
            classifier: ClassifierOptions::default(),
            consensus: ConsensusOptions::default(),
            validator: ValidatorOptions::default(),
        }
    }
}

impl AnalysisConfig {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => {
                let raw = fs::read(path)
                    .with_context(|| format!("failed to read config {}", path.display()))?;
                serde_json::from_slice::<Self>(&raw)
                    .with_context(|| format!("failed to parse config {}", path.display()))?
            }
            None => Self::default(),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn with_threshold(mut self, threshold: Option<f64>) -> Result<Self> {
        if let Some(threshold) = threshold {
            self.consensus.threshold = threshold;
            self.validate()?;
        }
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        let unit_fields = [
            ("min_acceptance_confidence", self.min_acceptance_confidence),
            ("classifier.score_floor", self.classifier.score_floor),
            ("consensus.threshold", self.consensus.threshold),
            (
                "consensus.single_rater_threshold",
                self.consensus.single_rater_threshold,
            ),
            ("validator.low_coverage_ratio", self.validator.low_coverage_ratio),
            (
                "validator.near_universal_ratio",
                self.validator.near_universal_ratio,
            ),
            (
                "validator.uniform_confidence_ratio",
                self.validator.uniform_confidence_ratio,
            ),
            (
                "validator.low_domain_confidence",
                self.validator.low_domain_confidence,
            ),
            ("validator.error_penalty", self.validator.error_penalty),
            ("validator.warning_penalty", self.validator.warning_penalty),
        ];

        for (name, value) in unit_fields {
            if !(0.0..=1.0).contains(&value) {
                bail!("config value {name} = {value} is outside [0, 1]");
            }
        }

        let tie_epsilon = self.classifier.tie_epsilon;
        if !tie_epsilon.is_finite() || tie_epsilon < 0.0 {
            bail!(
                "config value classifier.tie_epsilon = {tie_epsilon} must be a finite non-negative number"
            );
        }

        let smoothing = self.classifier.smoothing;
        if !smoothing.is_finite() || smoothing <= 0.0 {
            bail!("config value classifier.smoothing = {smoothing} must be a finite positive number");
        }

        if !self.validator.min_reliable_alpha.is_finite() || self.validator.min_reliable_alpha > 1.0
        {
            bail!(
                "config value validator.min_reliable_alpha = {} must be at most 1",
                self.validator.min_reliable_alpha
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
