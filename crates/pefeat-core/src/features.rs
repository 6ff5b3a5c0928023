//! Feature encoding: one file → one fixed-length presence vector.
//!
//! - Read the file once, up to `max_file_size` bytes
//! - Import names via the PE import table (required; failure rejects the file)
//! - Printable strings via the in-process scanner (optional; failure zeroes string bits)
//! - For each dictionary entry in order: 1 if its key is in the matching set, else 0

use std::collections::HashSet;
use std::fs;
use std::io::Read;
use std::path::Path;

use serde::Serialize;
use tracing::warn;

use crate::dictionary::{FeatureDictionary, FeatureKind};
use crate::error::{FeatureError, Result};
use crate::imports::imports_from_bytes;
use crate::strings::scan_strings;

pub const DEFAULT_MIN_STRING_LEN: usize = 4;
pub const DEFAULT_MAX_FILE_SIZE: u64 = 64 * 1024 * 1024; // 64MB

/// Bounds applied to every per-file extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanLimits {
    pub min_string_len: usize,
    pub max_file_size: u64,
}

impl Default for ScanLimits {
    fn default() -> Self {
        Self {
            min_string_len: DEFAULT_MIN_STRING_LEN,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

/// Read a whole file, refusing anything above `max_size` bytes.
pub fn read_bounded(path: &Path, max_size: u64) -> Result<Vec<u8>> {
    let io_err = |source| FeatureError::Io {
        path: path.to_path_buf(),
        source,
    };
    let too_big = |size| FeatureError::UnsupportedInputSize {
        path: path.to_path_buf(),
        size,
        limit: max_size,
    };

    let file = fs::File::open(path).map_err(io_err)?;
    let size = file.metadata().map_err(io_err)?.len();
    if size > max_size {
        return Err(too_big(size));
    }

    let mut data = Vec::with_capacity(size as usize);
    // One byte past the limit catches files that grew after the size check.
    file.take(max_size + 1)
        .read_to_end(&mut data)
        .map_err(io_err)?;
    if data.len() as u64 > max_size {
        return Err(too_big(data.len() as u64));
    }
    Ok(data)
}

/// What extraction learned about one file.
///
/// Each set is either available (possibly empty) or the error that made it
/// unavailable.
#[derive(Debug)]
pub struct ExtractedFileFacts {
    pub imported_functions: Result<HashSet<String>>,
    pub extracted_strings: Result<HashSet<String>>,
}

/// Run both extractors over bytes already read from `path`.
pub fn facts_from_bytes(path: &Path, data: &[u8], limits: &ScanLimits) -> ExtractedFileFacts {
    ExtractedFileFacts {
        imported_functions: imports_from_bytes(data)
            .map_err(|detail| FeatureError::malformed(path, detail)),
        extracted_strings: Ok(scan_strings(data, limits.min_string_len)),
    }
}

/// Run both extractors over `path`, reading it once.
pub fn extract_facts(path: &Path, limits: &ScanLimits) -> ExtractedFileFacts {
    match read_bounded(path, limits.max_file_size) {
        Ok(data) => facts_from_bytes(path, &data, limits),
        Err(e) => {
            let reason = e.to_string();
            ExtractedFileFacts {
                imported_functions: Err(e),
                extracted_strings: Err(FeatureError::StringScanFailure {
                    path: path.to_path_buf(),
                    reason,
                }),
            }
        }
    }
}

/// Presence bits, index-aligned with the dictionary that produced them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FeatureVector(Vec<u8>);

impl FeatureVector {
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_f32(&self) -> Vec<f32> {
        self.0.iter().map(|&b| f32::from(b)).collect()
    }
}

/// Encode extracted facts against the dictionary.
///
/// Missing imports reject the file. Missing strings only zero the string bits.
pub fn encode(facts: ExtractedFileFacts, dict: &FeatureDictionary) -> Result<FeatureVector> {
    let functions = facts.imported_functions?;
    let strings = match facts.extracted_strings {
        Ok(strings) => strings,
        Err(e) => {
            warn!(reason = %e, "string features unavailable, defaulting to zero");
            HashSet::new()
        }
    };

    let bits = dict
        .entries()
        .iter()
        .map(|entry| {
            let set = match entry.kind {
                FeatureKind::ImportName => &functions,
                FeatureKind::StringFragment => &strings,
            };
            u8::from(set.contains(&entry.key))
        })
        .collect();

    Ok(FeatureVector(bits))
}

/// Extract and encode a single file, surfacing any failure to the caller.
pub fn encode_single(
    path: &Path,
    dict: &FeatureDictionary,
    limits: &ScanLimits,
) -> Result<FeatureVector> {
    encode(extract_facts(path, limits), dict)
}
