//! pefeat-core — static feature extraction for PE malware classification.
//!
//! Provides dictionary loading, import-table and printable-string
//! extraction, feature encoding, dataset building and the inference
//! boundary used by the CLI.

pub mod classify;
pub mod config;
pub mod dataset;
pub mod dictionary;
pub mod error;
pub mod features;
pub mod imports;
pub mod inference;
pub mod report;
pub mod strings;

#[cfg(test)]
mod test_support;

pub use error::{FeatureError, Result};
