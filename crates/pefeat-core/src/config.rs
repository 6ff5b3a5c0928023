//! Run configuration loaded from an optional JSON file.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::features::{ScanLimits, DEFAULT_MAX_FILE_SIZE, DEFAULT_MIN_STRING_LEN};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    pub functions_path: PathBuf,
    pub strings_path: PathBuf,
    pub min_string_len: usize,
    pub max_file_size: u64,
    pub model_path: Option<PathBuf>,
    pub scaler_path: Option<PathBuf>,
    pub upload_dir: Option<PathBuf>,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            functions_path: PathBuf::from("ransomware_functions.txt"),
            strings_path: PathBuf::from("ransomware_strings.txt"),
            min_string_len: DEFAULT_MIN_STRING_LEN,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            model_path: None,
            scaler_path: None,
            upload_dir: None,
        }
    }
}

impl ExtractorConfig {
    pub fn limits(&self) -> ScanLimits {
        ScanLimits {
            min_string_len: self.min_string_len,
            max_file_size: self.max_file_size,
        }
    }

    /// Resolve relative paths against `base`.
    fn rebase(mut self, base: &Path) -> Self {
        let join = |p: &Path| {
            if p.is_relative() {
                base.join(p)
            } else {
                p.to_path_buf()
            }
        };
        self.functions_path = join(&self.functions_path);
        self.strings_path = join(&self.strings_path);
        self.model_path = self.model_path.as_deref().map(join);
        self.scaler_path = self.scaler_path.as_deref().map(join);
        self.upload_dir = self.upload_dir.as_deref().map(join);
        self
    }
}

/// Load a config file. Relative paths inside it are relative to the file.
pub fn load_config(path: &Path) -> Result<ExtractorConfig> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("Cannot read config {}", path.display()))?;
    let config: ExtractorConfig = serde_json::from_str(&data)
        .with_context(|| format!("Invalid config {}", path.display()))?;
    let base = path.parent().unwrap_or_else(|| Path::new(""));
    Ok(config.rebase(base))
}
