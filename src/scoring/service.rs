use std::sync::Arc;

use crate::{
    app::models::api_error::ApiError,
    classifier::{errors::ModelError, Classifier, Inference},
    transactions::{models::transaction::Transaction, sink::PersistenceSink},
};

use super::{errors::ScoringApiError, models::scoring_result::ScoringResult};

/// Scores one transaction at a time: a single inference pass, a background
/// persistence task, then the rounded result.
#[derive(Clone)]
pub struct ScoringService {
    classifier: Arc<dyn Classifier>,
    sink: PersistenceSink,
}

impl ScoringService {
    pub fn new(classifier: Arc<dyn Classifier>, sink: PersistenceSink) -> Self {
        Self { classifier, sink }
    }

    pub fn classifier_name(&self) -> &str {
        self.classifier.name()
    }

    /// Must be called from within a tokio runtime.
    pub fn score(&self, tx: Transaction) -> Result<ScoringResult, ApiError> {
        let inference = match self.infer(&tx) {
            Ok(inference) => inference,
            Err(e) => {
                tracing::error!(%e, step = tx.step, kind = %tx.kind, "inference failed");
                return Err(ScoringApiError::InferenceFailed.value());
            }
        };

        let result = ScoringResult::new(&inference);

        tracing::debug!(
            step = tx.step,
            kind = %tx.kind,
            probability = result.fraud_probability,
            flagged = result.flagged,
            "transaction scored"
        );

        // the response never waits on persistence
        self.sink
            .record_in_background(tx, inference.probability, inference.class);

        Ok(result)
    }

    fn infer(&self, tx: &Transaction) -> Result<Inference, ModelError> {
        let inference = self.classifier.infer(tx)?;

        if inference.probability.is_nan() {
            return Err(ModelError::NonFiniteScore);
        }
        if !(0.0..=1.0).contains(&inference.probability) {
            return Err(ModelError::ProbabilityOutOfRange(inference.probability));
        }

        Ok(inference)
    }
}
