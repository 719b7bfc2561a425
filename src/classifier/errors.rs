use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("model artifact {0} does not exist")]
    Missing(PathBuf),
    #[error("failed to load model artifact {path}: {source}")]
    Load {
        path: PathBuf,
        #[source]
        source: ort::Error,
    },
    #[error("onnx runtime error: {0}")]
    Runtime(#[from] ort::Error),
    #[error("invalid model artifact: {0}")]
    Invalid(String),
    #[error("model output {0} could not be read")]
    UnreadableOutput(String),
    #[error("model session lock was poisoned")]
    Poisoned,
    #[error("model produced a non-finite score")]
    NonFiniteScore,
    #[error("model produced probability {0} outside [0, 1]")]
    ProbabilityOutOfRange(f64),
}
