//! Error taxonomy for extraction, dataset building and inference.

use std::path::PathBuf;

use thiserror::Error;

/// Every failure the core can report.
///
/// Extraction-side variants are per-file and never abort a dataset build;
/// the inference-side variants only concern single-file classification.
#[derive(Error, Debug)]
pub enum FeatureError {
    /// A dictionary source is missing or unreadable. Fatal for a run.
    #[error("dictionary not found: '{path}': {source}")]
    DictionaryNotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The import table could not be parsed.
    #[error("not a valid PE executable: '{path}': {detail}")]
    MalformedBinary { path: PathBuf, detail: String },

    /// Printable-string scan failed. Degrades string features to zero.
    #[error("string scan failed for '{path}': {reason}")]
    StringScanFailure { path: PathBuf, reason: String },

    /// File exceeds the configured size bound.
    #[error("'{path}' is {size} bytes, above the {limit} byte limit")]
    UnsupportedInputSize { path: PathBuf, size: u64, limit: u64 },

    /// Input file could not be opened or read.
    #[error("cannot read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A dataset row could not be written.
    #[error("cannot append dataset row for '{filename}': {source}")]
    Sink {
        filename: String,
        #[source]
        source: std::io::Error,
    },

    /// Model or scaler not loaded, or the runtime rejected the input.
    #[error("inference unavailable: {reason}")]
    InferenceUnavailable { reason: String },

    /// Feature vector width does not match the fitted scaler/model.
    #[error("feature vector has {actual} columns, model expects {expected}")]
    ShapeMismatch { expected: usize, actual: usize },
}

impl FeatureError {
    pub(crate) fn malformed(path: impl Into<PathBuf>, detail: impl ToString) -> Self {
        FeatureError::MalformedBinary {
            path: path.into(),
            detail: detail.to_string(),
        }
    }

    pub(crate) fn inference(reason: impl ToString) -> Self {
        FeatureError::InferenceUnavailable {
            reason: reason.to_string(),
        }
    }

    /// True for failures raised after features were extracted successfully.
    pub fn is_inference_failure(&self) -> bool {
        matches!(
            self,
            FeatureError::InferenceUnavailable { .. } | FeatureError::ShapeMismatch { .. }
        )
    }
}

pub type Result<T, E = FeatureError> = std::result::Result<T, E>;
