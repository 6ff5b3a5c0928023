//! Inference boundary: fitted scaler followed by a binary classifier.
//!
//! Both artifacts come from the training side and are treated as opaque:
//! the scaler as JSON `{ "mean": [...], "scale": [...] }`, the classifier as
//! an ONNX model run through `ort`.

use std::fs;
use std::path::Path;
use std::sync::Mutex;

use ndarray::{Array1, Array2, Axis};
use ort::session::Session;
use ort::value::TensorRef;
use serde::Deserialize;
use tracing::info;

use crate::error::{FeatureError, Result};
use crate::features::FeatureVector;

pub const MALICIOUS_LABEL: &str = "Ransomware (Malicious)";
pub const BENIGN_LABEL: &str = "Benign";

/// Human-readable name of a predicted class.
pub fn class_label(class: u8) -> &'static str {
    if class == 1 {
        MALICIOUS_LABEL
    } else {
        BENIGN_LABEL
    }
}

/// Standardization fitted at training time: `(x - mean) / scale`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f32>,
    pub scale: Vec<f32>,
}

impl StandardScaler {
    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path).map_err(|e| {
            FeatureError::inference(format!("cannot read scaler '{}': {e}", path.display()))
        })?;
        let scaler: StandardScaler = serde_json::from_str(&data).map_err(|e| {
            FeatureError::inference(format!("invalid scaler '{}': {e}", path.display()))
        })?;
        if scaler.mean.len() != scaler.scale.len() {
            return Err(FeatureError::inference(format!(
                "scaler has {} means but {} scales",
                scaler.mean.len(),
                scaler.scale.len()
            )));
        }
        Ok(scaler)
    }

    pub fn width(&self) -> usize {
        self.mean.len()
    }

    /// Scale one vector into a `(1, width)` batch.
    pub fn transform(&self, vector: &FeatureVector) -> Result<Array2<f32>> {
        if vector.len() != self.width() {
            return Err(FeatureError::ShapeMismatch {
                expected: self.width(),
                actual: vector.len(),
            });
        }
        let x = Array1::from(vector.to_f32());
        let mean = Array1::from(self.mean.clone());
        // Constant features were fitted with zero variance.
        let scale = Array1::from_iter(
            self.scale
                .iter()
                .map(|&s| if s == 0.0 { 1.0 } else { s }),
        );
        Ok(((x - mean) / scale).insert_axis(Axis(0)))
    }
}

/// Binary classifier over a scaled `(1, width)` batch.
pub trait Classifier: Send + Sync {
    fn predict(&self, input: &Array2<f32>) -> Result<u8>;
}

/// Score outputs at or above this value map to the malicious class.
const SCORE_THRESHOLD: f32 = 0.5;

pub struct OnnxClassifier {
    session: Mutex<Session>,
    input_name: String,
    output_name: String,
}

impl OnnxClassifier {
    /// Load an ONNX model; the first input and first output are used.
    pub fn load(model_path: &Path) -> Result<Self> {
        let session = Session::builder()
            .and_then(|b| b.with_intra_threads(1))
            .and_then(|b| b.commit_from_file(model_path))
            .map_err(|e| {
                FeatureError::inference(format!(
                    "cannot load model '{}': {e}",
                    model_path.display()
                ))
            })?;

        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .ok_or_else(|| FeatureError::inference("model declares no inputs"))?;
        let output_name = session
            .outputs
            .first()
            .map(|o| o.name.clone())
            .ok_or_else(|| FeatureError::inference("model declares no outputs"))?;

        Ok(Self {
            session: Mutex::new(session),
            input_name,
            output_name,
        })
    }
}

impl Classifier for OnnxClassifier {
    fn predict(&self, input: &Array2<f32>) -> Result<u8> {
        let input_tensor = TensorRef::from_array_view(input).map_err(FeatureError::inference)?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| FeatureError::inference(format!("lock error: {e}")))?;
        let outputs = session
            .run(ort::inputs![self.input_name.as_str() => input_tensor])
            .map_err(FeatureError::inference)?;
        let output = &outputs[self.output_name.as_str()];

        // Label outputs (scikit-learn converters) first, then probability/score outputs.
        if let Ok(labels) = output.try_extract_array::<i64>() {
            let class = labels.iter().next().copied().unwrap_or(0);
            return Ok(u8::from(class == 1));
        }
        let scores = output
            .try_extract_array::<f32>()
            .map_err(FeatureError::inference)?;
        let score = scores.iter().last().copied().unwrap_or(0.0);
        Ok(u8::from(score >= SCORE_THRESHOLD))
    }
}

/// Scaler and classifier, built once at startup and only read afterwards.
pub struct InferenceContext {
    scaler: StandardScaler,
    classifier: Box<dyn Classifier>,
}

impl InferenceContext {
    pub fn new(scaler: StandardScaler, classifier: Box<dyn Classifier>) -> Self {
        Self { scaler, classifier }
    }

    pub fn load(model_path: &Path, scaler_path: &Path) -> Result<Self> {
        let scaler = StandardScaler::load(scaler_path)?;
        let classifier = OnnxClassifier::load(model_path)?;
        info!(
            model = %model_path.display(),
            scaler = %scaler_path.display(),
            width = scaler.width(),
            "loaded inference artifacts"
        );
        Ok(Self::new(scaler, Box::new(classifier)))
    }

    /// Scale then classify one vector, returning the class (0 or 1).
    pub fn predict(&self, vector: &FeatureVector) -> Result<u8> {
        let scaled = self.scaler.transform(vector)?;
        self.classifier.predict(&scaled)
    }
}
