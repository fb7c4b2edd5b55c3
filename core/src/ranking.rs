//! Weight components and the model that folds them into one score.
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Six ranking signals, each expected in `[0, 1]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WeightComponents {
    pub base_frequency: f32,
    pub match_accuracy: f32,
    pub user_preference: f32,
    pub context_relevance: f32,
    pub input_efficiency: f32,
    pub temporal_factor: f32,
}

fn unit(x: f32) -> f32 {
    if x.is_finite() {
        x.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

impl WeightComponents {
    /// Copy with every component forced into `[0, 1]`; NaN becomes 0.
    pub fn clamped(&self) -> Self {
        Self {
            base_frequency: unit(self.base_frequency),
            match_accuracy: unit(self.match_accuracy),
            user_preference: unit(self.user_preference),
            context_relevance: unit(self.context_relevance),
            input_efficiency: unit(self.input_efficiency),
            temporal_factor: unit(self.temporal_factor),
        }
    }

    pub fn sum(&self) -> f32 {
        self.base_frequency
            + self.match_accuracy
            + self.user_preference
            + self.context_relevance
            + self.input_efficiency
            + self.temporal_factor
    }

    /// `frequency / scale`, clamped to `[0, 1]`.
    pub fn frequency_score(frequency: u64, scale: f64) -> f32 {
        if scale <= 0.0 {
            return 0.0;
        }
        (frequency as f64 / scale).clamp(0.0, 1.0) as f32
    }
}

/// Per-component multipliers. All ones gives the plain sum.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RankingWeights {
    pub base_frequency: f32,
    pub match_accuracy: f32,
    pub user_preference: f32,
    pub context_relevance: f32,
    pub input_efficiency: f32,
    pub temporal_factor: f32,
}

impl Default for RankingWeights {
    fn default() -> Self {
        Self {
            base_frequency: 1.0,
            match_accuracy: 1.0,
            user_preference: 1.0,
            context_relevance: 1.0,
            input_efficiency: 1.0,
            temporal_factor: 1.0,
        }
    }
}

impl RankingWeights {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fields = [
            ("base_frequency", self.base_frequency),
            ("match_accuracy", self.match_accuracy),
            ("user_preference", self.user_preference),
            ("context_relevance", self.context_relevance),
            ("input_efficiency", self.input_efficiency),
            ("temporal_factor", self.temporal_factor),
        ];
        for (name, value) in fields {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidWeight { name, value });
            }
        }
        Ok(())
    }

    pub fn is_unit(&self) -> bool {
        *self == Self::default()
    }
}

/// Folds weight components into the composed score.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RankingModel {
    weights: RankingWeights,
}

impl RankingModel {
    pub fn new(weights: RankingWeights) -> Result<Self, ConfigError> {
        weights.validate()?;
        Ok(Self { weights })
    }

    pub fn weights(&self) -> &RankingWeights {
        &self.weights
    }

    pub fn compose(&self, c: &WeightComponents) -> f32 {
        let w = &self.weights;
        if w.is_unit() {
            return c.sum();
        }
        c.base_frequency * w.base_frequency
            + c.match_accuracy * w.match_accuracy
            + c.user_preference * w.user_preference
            + c.context_relevance * w.context_relevance
            + c.input_efficiency * w.input_efficiency
            + c.temporal_factor * w.temporal_factor
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_model_is_plain_sum() {
        let c = WeightComponents {
            base_frequency: 0.1,
            match_accuracy: 0.95,
            user_preference: 0.0,
            context_relevance: 0.0,
            input_efficiency: 0.5,
            temporal_factor: 0.5,
        };
        let model = RankingModel::default();
        assert!((model.compose(&c) - c.sum()).abs() < 1e-6);
    }

    #[test]
    fn weighted_model_scales_components() {
        let weights = RankingWeights {
            base_frequency: 2.0,
            temporal_factor: 0.0,
            ..RankingWeights::default()
        };
        let model = RankingModel::new(weights).unwrap();
        let c = WeightComponents {
            base_frequency: 0.5,
            temporal_factor: 1.0,
            ..WeightComponents::default()
        };
        assert!((model.compose(&c) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn negative_weight_rejected() {
        let weights = RankingWeights {
            user_preference: -1.0,
            ..RankingWeights::default()
        };
        assert!(matches!(
            RankingModel::new(weights),
            Err(ConfigError::InvalidWeight { name: "user_preference", .. })
        ));
    }

    #[test]
    fn components_are_clamped() {
        let c = WeightComponents {
            base_frequency: 3.0,
            match_accuracy: f32::NAN,
            input_efficiency: -1.0,
            ..WeightComponents::default()
        }
        .clamped();
        assert_eq!(c.base_frequency, 1.0);
        assert_eq!(c.match_accuracy, 0.0);
        assert_eq!(c.input_efficiency, 0.0);
        assert_eq!(WeightComponents::frequency_score(50_000, 100_000.0), 0.5);
    }
}
