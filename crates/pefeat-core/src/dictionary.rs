//! Reference dictionaries and the feature schema derived from them.
//!
//! Two line-delimited sources define the schema: malicious API names first,
//! then malicious string fragments. Entry order is vector index order, and
//! the same order drives the dataset header, so both always agree.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use tracing::{debug, warn};

use crate::error::{FeatureError, Result};

/// Which extracted set a dictionary entry is matched against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeatureKind {
    ImportName,
    StringFragment,
}

impl FeatureKind {
    fn column_prefix(self) -> &'static str {
        match self {
            FeatureKind::ImportName => "func_",
            FeatureKind::StringFragment => "str_",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureEntry {
    pub kind: FeatureKind,
    /// Trimmed source line as written in the dictionary file.
    pub name: String,
    /// Lowercased `name`; the only value ever compared against a file.
    pub key: String,
}

impl FeatureEntry {
    fn new(kind: FeatureKind, line: &str) -> Self {
        let name = line.trim().to_string();
        let key = name.to_lowercase();
        Self { kind, name, key }
    }

    /// Dataset column name: `func_<name>` or `str_<sanitized name>`.
    pub fn column_name(&self) -> String {
        let label = match self.kind {
            FeatureKind::ImportName => self.name.clone(),
            FeatureKind::StringFragment => sanitize_identifier(&self.name),
        };
        format!("{}{}", self.kind.column_prefix(), label)
    }
}

/// Keep only alphanumerics and underscores.
pub fn sanitize_identifier(text: &str) -> String {
    text.chars()
        .filter(|c| c.is_alphanumeric() || *c == '_')
        .collect()
}

/// Ordered feature schema shared read-only by every encoding in a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeatureDictionary {
    entries: Vec<FeatureEntry>,
}

impl FeatureDictionary {
    /// Load both dictionary files. Either one missing is fatal.
    pub fn load(functions_path: &Path, strings_path: &Path) -> Result<Self> {
        let functions = read_source(functions_path)?;
        let strings = read_source(strings_path)?;
        let dict = Self::from_sources(&functions, &strings);
        debug!(
            functions = %functions_path.display(),
            strings = %strings_path.display(),
            features = dict.len(),
            "loaded feature dictionary"
        );
        Ok(dict)
    }

    /// Build from in-memory sources, one entry per non-blank line.
    pub fn from_sources(functions: &str, strings: &str) -> Self {
        let mut entries = Vec::new();
        push_kind(&mut entries, FeatureKind::ImportName, functions);
        push_kind(&mut entries, FeatureKind::StringFragment, strings);
        Self { entries }
    }

    pub fn entries(&self) -> &[FeatureEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn column_names(&self) -> Vec<String> {
        self.entries.iter().map(FeatureEntry::column_name).collect()
    }

    /// `filename;fileclass;<columns>` header for the dataset file.
    pub fn header(&self) -> String {
        let mut columns = vec!["filename".to_string(), "fileclass".to_string()];
        columns.extend(self.column_names());
        columns
            .iter()
            .map(|c| quote_field(c))
            .collect::<Vec<_>>()
            .join(";")
    }
}

/// Quote a dataset field that contains the delimiter, a quote or a line break.
///
/// Embedded quotes are doubled, as in standard CSV dialects.
pub fn quote_field(field: &str) -> String {
    if field.contains([';', '"', '\r', '\n']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn read_source(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|source| FeatureError::DictionaryNotFound {
        path: path.to_path_buf(),
        source,
    })
}

fn push_kind(entries: &mut Vec<FeatureEntry>, kind: FeatureKind, source: &str) {
    let mut seen = HashSet::new();
    for line in source.lines() {
        if line.trim().is_empty() {
            continue;
        }
        let entry = FeatureEntry::new(kind, line);
        if !seen.insert(entry.key.clone()) {
            warn!(name = %entry.name, ?kind, "duplicate dictionary entry ignored");
            continue;
        }
        entries.push(entry);
    }
}
