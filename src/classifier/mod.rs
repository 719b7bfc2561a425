//! Model handle: the fraud classifier loaded once at startup and shared
//! read-only across requests.

pub mod errors;
pub mod features;
pub mod pipeline;

use crate::transactions::models::transaction::Transaction;

use self::errors::ModelError;

/// Output of a single inference pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Inference {
    /// Probability of the fraud class, in `[0, 1]`.
    pub probability: f64,
    /// The model's own decision for this transaction.
    pub class: bool,
}

/// A fraud classifier that can be shared between concurrent requests.
///
/// Implementations must be side-effect free: `infer` may be called from many
/// tasks at once.
pub trait Classifier: Send + Sync {
    fn name(&self) -> &str;

    fn infer(&self, transaction: &Transaction) -> Result<Inference, ModelError>;

    fn predict_probability(&self, transaction: &Transaction) -> Result<f64, ModelError> {
        Ok(self.infer(transaction)?.probability)
    }

    fn predict_class(&self, transaction: &Transaction) -> Result<bool, ModelError> {
        Ok(self.infer(transaction)?.class)
    }
}
