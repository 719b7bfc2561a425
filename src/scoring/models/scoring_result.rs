use serde::{Deserialize, Serialize};

use crate::classifier::Inference;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoringResult {
    pub fraud_probability: f64,
    pub flagged: bool,
}

impl ScoringResult {
    pub fn new(inference: &Inference) -> Self {
        Self {
            fraud_probability: round_probability(inference.probability),
            flagged: inference.class,
        }
    }
}

/// Rounds to 4 decimal places, half away from zero.
pub fn round_probability(probability: f64) -> f64 {
    (probability * 10_000.0).round() / 10_000.0
}
