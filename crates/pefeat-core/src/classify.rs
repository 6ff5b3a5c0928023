//! Single-file classification: extraction followed by inference.
//!
//! Unlike the dataset builder nothing is tolerated here; every failure goes
//! back to the caller. Extraction runs before the inference context is
//! consulted so callers can tell a bad executable from a missing model.
//! The reported digest is taken from the same bytes that were analyzed.

use std::io::{Read, Write};
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::dictionary::FeatureDictionary;
use crate::error::{FeatureError, Result};
use crate::features::{encode, facts_from_bytes, read_bounded, ScanLimits};
use crate::inference::{class_label, InferenceContext};
use crate::report::Prediction;

pub fn sha256_hex(data: &[u8]) -> String {
    format!("{:x}", Sha256::digest(data))
}

/// Read an upload stream, stopping one byte past the size limit.
pub fn read_upload<R: Read>(reader: R, filename: &str, limits: &ScanLimits) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    reader
        .take(limits.max_file_size + 1)
        .read_to_end(&mut bytes)
        .map_err(|source| FeatureError::Io {
            path: filename.into(),
            source,
        })?;
    if bytes.len() as u64 > limits.max_file_size {
        return Err(FeatureError::UnsupportedInputSize {
            path: filename.into(),
            size: bytes.len() as u64,
            limit: limits.max_file_size,
        });
    }
    Ok(bytes)
}

/// Classify a file already on disk.
pub fn classify_file(
    ctx: Option<&InferenceContext>,
    path: &Path,
    dict: &FeatureDictionary,
    limits: &ScanLimits,
) -> Result<Prediction> {
    let data = read_bounded(path, limits.max_file_size)?;
    let vector = encode(facts_from_bytes(path, &data, limits), dict)?;
    let ctx = ctx.ok_or_else(|| FeatureError::inference("model and scaler are not loaded"))?;
    let class = ctx.predict(&vector)?;

    Ok(Prediction {
        filename: path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        sha256: sha256_hex(&data),
        prediction_class: class,
        prediction_label: class_label(class).to_string(),
    })
}

/// Classify uploaded bytes through a transient file.
///
/// The transient file lives in `upload_dir` (system temp dir when `None`)
/// and is removed when this returns, whatever the outcome.
pub fn classify_upload(
    ctx: Option<&InferenceContext>,
    dict: &FeatureDictionary,
    limits: &ScanLimits,
    upload_dir: Option<&Path>,
    filename: &str,
    bytes: &[u8],
) -> Result<Prediction> {
    if bytes.len() as u64 > limits.max_file_size {
        return Err(FeatureError::UnsupportedInputSize {
            path: filename.into(),
            size: bytes.len() as u64,
            limit: limits.max_file_size,
        });
    }

    let io_err = |source| FeatureError::Io {
        path: filename.into(),
        source,
    };
    let mut builder = tempfile::Builder::new();
    builder.prefix("upload-");
    let mut transient = match upload_dir {
        Some(dir) => builder.tempfile_in(dir),
        None => builder.tempfile(),
    }
    .map_err(io_err)?;
    transient.write_all(bytes).map_err(io_err)?;
    transient.flush().map_err(io_err)?;

    let mut prediction = classify_file(ctx, transient.path(), dict, limits)?;
    prediction.filename = filename.to_string();
    Ok(prediction)
}
