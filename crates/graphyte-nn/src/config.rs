//! Training and evaluation configuration.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Training configuration.
///
/// Every field has a default, so a partial TOML/JSON document is enough to
/// override individual values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Number of training epochs (default: 5).
    pub epochs: usize,
    /// Initial learning rate (default: 0.001).
    pub learning_rate: f32,
    /// Layer decay rate. Carried as configuration only (default: 0.95).
    pub decay_rate: f32,
    /// Momentum coefficient for weight updates (default: 0.9).
    pub momentum: f32,
    /// Maximum Frobenius norm of a layer's weight gradient (default: 5.0).
    pub clip_norm: f32,
    /// Weight Q of the negative-edge loss term (default: 5.0).
    pub negative_weight: f32,
    /// Floor added inside the loss logarithms (default: 1e-7).
    pub epsilon: f32,
    /// Dot products are clipped to `[-logit_clip, logit_clip]` in the loss
    /// (default: 10.0).
    pub logit_clip: f32,
    /// Epochs without improvement before stopping (default: 5).
    pub patience: usize,
    /// Improvement over the best loss that resets patience (default: 1e-4).
    pub min_delta: f32,
    /// Share of the new layer output in the feature update; the rest comes
    /// from the initial features (default: 0.8).
    pub skip_weight: f32,
    /// Learning-rate multiplier applied when the loss increases
    /// (default: 0.95).
    pub lr_decay: f32,
    /// Seed for weight initialization (default: 42).
    pub seed: u64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            epochs: 5,
            learning_rate: 0.001,
            decay_rate: 0.95,
            momentum: 0.9,
            clip_norm: 5.0,
            negative_weight: 5.0,
            epsilon: 1e-7,
            logit_clip: 10.0,
            patience: 5,
            min_delta: 1e-4,
            skip_weight: 0.8,
            lr_decay: 0.95,
            seed: 42,
        }
    }
}

impl TrainingConfig {
    pub fn with_epochs(mut self, epochs: usize) -> Self {
        self.epochs = epochs;
        self
    }

    pub fn with_learning_rate(mut self, lr: f32) -> Self {
        self.learning_rate = lr;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_patience(mut self, patience: usize) -> Self {
        self.patience = patience;
        self
    }

    pub fn with_momentum(mut self, momentum: f32) -> Self {
        self.momentum = momentum;
        self
    }

    pub fn with_negative_weight(mut self, q: f32) -> Self {
        self.negative_weight = q;
        self
    }

    /// Reject values that would make training meaningless.
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("learning_rate", self.learning_rate),
            ("clip_norm", self.clip_norm),
            ("epsilon", self.epsilon),
            ("logit_clip", self.logit_clip),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(Error::InvalidConfig(format!(
                    "{name} must be positive and finite, got {value}"
                )));
            }
        }
        let unit = [
            ("momentum", self.momentum),
            ("skip_weight", self.skip_weight),
            ("lr_decay", self.lr_decay),
            ("decay_rate", self.decay_rate),
        ];
        for (name, value) in unit {
            if !(0.0..=1.0).contains(&value) {
                return Err(Error::InvalidConfig(format!(
                    "{name} must be in [0, 1], got {value}"
                )));
            }
        }
        if !(self.negative_weight.is_finite() && self.negative_weight >= 0.0) {
            return Err(Error::InvalidConfig(format!(
                "negative_weight must be non-negative, got {}",
                self.negative_weight
            )));
        }
        if self.patience == 0 {
            return Err(Error::InvalidConfig("patience must be at least 1".into()));
        }
        if !(self.min_delta >= 0.0) {
            return Err(Error::InvalidConfig(format!(
                "min_delta must be non-negative, got {}",
                self.min_delta
            )));
        }
        Ok(())
    }
}

/// Evaluation configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalConfig {
    /// Cut-off for Hits@K (default: 10).
    pub k: usize,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self { k: 10 }
    }
}
