//! Fraud pipeline exported to ONNX and executed with ONNX Runtime.
//!
//! The graph takes a single `float32[N, 11]` input built by
//! [`features::extract`] and returns a fraud probability, either as a
//! `[N, 2]` tensor or as sklearn's ZipMap `seq(map(int64, float))`. When the
//! export also carries a `label` output, the predicted class is read from it
//! so both values come from the same `run`.

use std::{path::Path, sync::Mutex};

use ort::{
    memory::Allocator,
    session::{builder::GraphOptimizationLevel, Session},
    value::{DowncastableTarget, DynMapValueType, DynSequenceValueType, DynValue, Tensor},
};

use crate::transactions::models::transaction::Transaction;

use super::{
    errors::ModelError,
    features::{self, FEATURE_COUNT, TRANSACTION_TYPES},
    Classifier, Inference,
};

/// Decision rule for exports without a label output, same as sklearn's
/// `predict` on a binary classifier.
pub static DEFAULT_THRESHOLD: f64 = 0.5;

pub struct PipelineModel {
    name: String,
    // Session::run takes &mut self
    session: Mutex<Session>,
    input_name: String,
    probability_output: String,
    label_output: Option<String>,
}

impl PipelineModel {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ModelError> {
        Self::load_with_threads(path, 1)
    }

    pub fn load_with_threads<P: AsRef<Path>>(
        path: P,
        intra_threads: usize,
    ) -> Result<Self, ModelError> {
        let path = path.as_ref();

        tracing::info!(path = %path.display(), threads = intra_threads, "loading onnx model");

        if !path.is_file() {
            return Err(ModelError::Missing(path.to_path_buf()));
        }

        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(intra_threads)?
            .commit_from_file(path)
            .map_err(|source| ModelError::Load {
                path: path.to_path_buf(),
                source,
            })?;

        let input_name = match session.inputs.as_slice() {
            [input] => input.name.clone(),
            inputs => {
                return Err(ModelError::Invalid(format!(
                    "expected a single input, found {}",
                    inputs.len()
                )))
            }
        };

        let label_output = session
            .outputs
            .iter()
            .find(|o| o.name.contains("label"))
            .map(|o| o.name.clone());

        let probability_output = session
            .outputs
            .iter()
            .find(|o| o.name.contains("prob"))
            .or_else(|| session.outputs.iter().find(|o| !o.name.contains("label")))
            .map(|o| o.name.clone())
            .ok_or_else(|| ModelError::Invalid("model has no probability output".to_string()))?;

        let name = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or("onnx_model")
            .to_string();

        let model = Self {
            name,
            session: Mutex::new(session),
            input_name,
            probability_output,
            label_output,
        };

        // a graph that loads but cannot score our row must not start serving
        let sample = Transaction {
            step: 1,
            kind: TRANSACTION_TYPES[0].to_string(),
            amount: 0.0,
            old_balance_org: 0.0,
            new_balance_orig: 0.0,
            old_balance_dest: 0.0,
            new_balance_dest: 0.0,
        };
        model.infer(&sample).map_err(|err| {
            ModelError::Invalid(format!(
                "model could not score a {} column row: {}",
                FEATURE_COUNT, err
            ))
        })?;

        tracing::info!(
            model = %model.name,
            input = %model.input_name,
            probability = %model.probability_output,
            label = model.label_output.as_deref().unwrap_or("none"),
            "model loaded"
        );

        Ok(model)
    }
}

/// Reads P(fraud) for the first row from a probability tensor or a ZipMap.
fn fraud_probability(output: &DynValue, output_name: &str) -> Result<f64, ModelError> {
    if let Ok((shape, data)) = output.try_extract_tensor::<f32>() {
        let dims: Vec<i64> = shape.iter().copied().collect();
        // [1, 2] or [2] carry both classes, [1, 1] or [1] only the positive one
        let index = match dims.last() {
            Some(classes) if *classes >= 2 => 1,
            _ => 0,
        };

        return data
            .get(index)
            .map(|p| *p as f64)
            .ok_or_else(|| ModelError::UnreadableOutput(output_name.to_string()));
    }

    let dtype = output.dtype();
    if DynSequenceValueType::can_downcast(&dtype) {
        return zipmap_probability(output, output_name);
    }

    Err(ModelError::UnreadableOutput(output_name.to_string()))
}

fn zipmap_probability(output: &DynValue, output_name: &str) -> Result<f64, ModelError> {
    let allocator = Allocator::default();

    let sequence = output.downcast_ref::<DynSequenceValueType>()?;
    let maps = sequence.try_extract_sequence::<DynMapValueType>(&allocator)?;
    let first = maps
        .first()
        .ok_or_else(|| ModelError::UnreadableOutput(output_name.to_string()))?;
    let pairs = first.try_extract_key_values::<i64, f32>()?;

    pairs
        .iter()
        .find(|(class, _)| *class == 1)
        .map(|(_, p)| *p as f64)
        .or_else(|| {
            pairs
                .iter()
                .find(|(class, _)| *class == 0)
                .map(|(_, p)| 1.0 - *p as f64)
        })
        .ok_or_else(|| ModelError::UnreadableOutput(output_name.to_string()))
}

fn predicted_label(output: &DynValue, output_name: &str) -> Result<bool, ModelError> {
    let (_, data) = output.try_extract_tensor::<i64>()?;

    data.first()
        .map(|label| *label == 1)
        .ok_or_else(|| ModelError::UnreadableOutput(output_name.to_string()))
}

impl Classifier for PipelineModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn infer(&self, transaction: &Transaction) -> Result<Inference, ModelError> {
        let row = features::extract(transaction);
        let input = Tensor::from_array((vec![1_i64, FEATURE_COUNT as i64], row))?;

        let mut session = self.session.lock().map_err(|_| ModelError::Poisoned)?;
        let outputs = session.run(ort::inputs![self.input_name.as_str() => input])?;

        let probability = match outputs.get(self.probability_output.as_str()) {
            Some(output) => fraud_probability(output, &self.probability_output)?,
            None => return Err(ModelError::UnreadableOutput(self.probability_output.clone())),
        };
        if !probability.is_finite() {
            return Err(ModelError::NonFiniteScore);
        }

        let class = match &self.label_output {
            Some(name) => match outputs.get(name.as_str()) {
                Some(output) => predicted_label(output, name)?,
                None => return Err(ModelError::UnreadableOutput(name.clone())),
            },
            None => probability >= DEFAULT_THRESHOLD,
        };

        Ok(Inference { probability, class })
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn bundled() -> PipelineModel {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("models/fraud_pipeline_v1.onnx");

        PipelineModel::load(path).unwrap()
    }

    fn drained_transfer() -> Transaction {
        Transaction {
            step: 1,
            kind: "TRANSFER".to_string(),
            amount: 9000.0,
            old_balance_org: 9000.0,
            new_balance_orig: 0.0,
            old_balance_dest: 0.0,
            new_balance_dest: 9000.0,
        }
    }

    fn small_payment() -> Transaction {
        Transaction {
            step: 1,
            kind: "PAYMENT".to_string(),
            amount: 120.0,
            old_balance_org: 5000.0,
            new_balance_orig: 4880.0,
            old_balance_dest: 0.0,
            new_balance_dest: 0.0,
        }
    }

    #[test]
    fn bundled_model_reads_both_outputs() {
        let model = bundled();

        assert_eq!(model.name(), "fraud_pipeline_v1");
        assert_eq!(model.input_name, "float_input");
        assert_eq!(model.probability_output, "probabilities");
        assert_eq!(model.label_output.as_deref(), Some("label"));
    }

    #[test]
    fn drained_transfer_is_flagged_and_small_payment_is_not() {
        let model = bundled();

        let drained = model.infer(&drained_transfer()).unwrap();
        let payment = model.infer(&small_payment()).unwrap();

        assert!(drained.class);
        assert!(!payment.class);
        assert!(drained.probability > payment.probability);
        assert!((0.0..=1.0).contains(&drained.probability));
        assert!((0.0..=1.0).contains(&payment.probability));
    }

    #[test]
    fn label_matches_probability_decision() {
        let model = bundled();

        for tx in [drained_transfer(), small_payment()] {
            let inference = model.infer(&tx).unwrap();
            assert_eq!(inference.class, inference.probability >= DEFAULT_THRESHOLD);
        }
    }

    #[test]
    fn probability_and_class_agree_with_single_pass() {
        let model = bundled();
        let tx = drained_transfer();

        let inference = model.infer(&tx).unwrap();
        assert_eq!(model.predict_probability(&tx).unwrap(), inference.probability);
        assert_eq!(model.predict_class(&tx).unwrap(), inference.class);
    }

    #[test]
    fn unknown_type_still_scores() {
        let model = bundled();
        let mut tx = drained_transfer();
        tx.kind = "WIRE".to_string();

        let inference = model.infer(&tx).unwrap();
        assert!((0.0..=1.0).contains(&inference.probability));
    }

    #[test]
    fn load_fails_for_missing_artifact() {
        let err = PipelineModel::load("does/not/exist.onnx").err().unwrap();

        assert!(matches!(err, ModelError::Missing(_)));
    }

    #[test]
    fn load_fails_for_corrupt_artifact() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"{\"not\": \"an onnx graph\"}").unwrap();

        let err = PipelineModel::load(file.path()).err().unwrap();

        assert!(matches!(err, ModelError::Load { .. }));
    }
}
