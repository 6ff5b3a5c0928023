//! Dataset builder: encodes a directory of labeled files into `;`-separated rows.

use std::fs::{self, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use rayon::prelude::*;
use serde::Serialize;
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::dictionary::{quote_field, FeatureDictionary};
use crate::error::{FeatureError, Result};
use crate::features::{encode_single, FeatureVector, ScanLimits};

/// One labeled, encoded file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetRow {
    pub filename: String,
    pub label: u8,
    pub vector: FeatureVector,
}

impl DatasetRow {
    /// `filename;label;bit;bit;...`, with the filename quoted when it
    /// contains the delimiter, a quote or a line break.
    pub fn to_line(&self) -> String {
        let mut line = format!("{};{}", quote_field(&self.filename), self.label);
        for bit in self.vector.as_slice() {
            line.push(';');
            line.push(char::from(b'0' + bit));
        }
        line
    }
}

/// Destination for dataset rows. Appends must not interleave.
pub trait RowSink: Sync {
    fn append(&self, row: &DatasetRow) -> io::Result<()>;
}

impl RowSink for Mutex<Vec<DatasetRow>> {
    fn append(&self, row: &DatasetRow) -> io::Result<()> {
        self.lock()
            .map_err(|e| io::Error::other(format!("lock error: {e}")))?
            .push(row.clone());
        Ok(())
    }
}

/// Append-mode dataset file. Existing rows are never rewritten.
pub struct DatasetWriter {
    path: PathBuf,
    file: Mutex<fs::File>,
}

impl DatasetWriter {
    /// Open `path` for appending, writing the schema header if the file is new or empty.
    ///
    /// A non-empty file must start with this dictionary's header; rows for a
    /// different schema are never appended to it.
    pub fn open(path: &Path, dict: &FeatureDictionary) -> io::Result<Self> {
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)?;
        let header = dict.header();
        if file.metadata()?.len() == 0 {
            writeln!(file, "{header}")?;
        } else {
            let mut existing = String::new();
            BufReader::new(&file).read_line(&mut existing)?;
            let existing = existing.trim_end_matches(['\r', '\n']);
            if existing != header {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!(
                        "{} was built with a different feature dictionary",
                        path.display()
                    ),
                ));
            }
        }
        Ok(Self {
            path: path.to_path_buf(),
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RowSink for DatasetWriter {
    fn append(&self, row: &DatasetRow) -> io::Result<()> {
        let mut line = row.to_line();
        line.push('\n');
        let mut file = self
            .file
            .lock()
            .map_err(|e| io::Error::other(format!("lock error: {e}")))?;
        file.write_all(line.as_bytes())
    }
}

/// Counters updated while a build runs.
pub struct BuildProgress {
    pub total_files: AtomicUsize,
    pub processed: AtomicUsize,
    pub failed: AtomicUsize,
}

impl BuildProgress {
    pub fn new() -> Self {
        Self {
            total_files: AtomicUsize::new(0),
            processed: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
        }
    }
}

impl Default for BuildProgress {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FileFailure {
    pub filename: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct BuildSummary {
    pub directory: PathBuf,
    pub label: u8,
    pub processed: usize,
    pub failed: usize,
    pub failures: Vec<FileFailure>,
}

/// Regular files directly inside `dir`, sorted by name.
pub fn collect_files(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .flatten()
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .collect()
}

fn encode_row(
    path: &Path,
    label: u8,
    dict: &FeatureDictionary,
    limits: &ScanLimits,
    sink: &dyn RowSink,
) -> Result<()> {
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let vector = encode_single(path, dict, limits)?;
    let row = DatasetRow {
        filename: filename.clone(),
        label,
        vector,
    };
    sink.append(&row)
        .map_err(|source| FeatureError::Sink { filename, source })
}

/// Encode every regular file in `directory` and append its row to `sink`.
///
/// A failing file is logged and counted; it never stops the build. Rows
/// accumulate across runs on the same sink.
pub fn build_dataset(
    directory: &Path,
    label: u8,
    dict: &FeatureDictionary,
    limits: &ScanLimits,
    sink: &dyn RowSink,
    progress: &BuildProgress,
) -> BuildSummary {
    info!(directory = %directory.display(), label, "processing directory");

    let files = collect_files(directory);
    progress.total_files.store(files.len(), Ordering::Relaxed);

    let failures: Vec<FileFailure> = files
        .par_iter()
        .filter_map(|path| match encode_row(path, label, dict, limits, sink) {
            Ok(()) => {
                progress.processed.fetch_add(1, Ordering::Relaxed);
                None
            }
            Err(e) => {
                progress.failed.fetch_add(1, Ordering::Relaxed);
                let filename = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                warn!(file = %filename, reason = %e, "failed to process file, skipping");
                Some(FileFailure {
                    filename,
                    reason: e.to_string(),
                })
            }
        })
        .collect();

    let summary = BuildSummary {
        directory: directory.to_path_buf(),
        label,
        processed: files.len() - failures.len(),
        failed: failures.len(),
        failures,
    };
    info!(
        directory = %directory.display(),
        processed = summary.processed,
        failed = summary.failed,
        "directory complete"
    );
    summary
}
