//! PE import-table extraction via `goblin`.

use std::collections::HashSet;

use goblin::pe::import::SyntheticImportLookupTableEntry;
use goblin::pe::options::ParseOptions;
use goblin::pe::PE;

/// Lowercased names of every function a PE image held in memory imports by name.
///
/// Handles both PE32 and PE32+. Ordinal-only imports carry no name and are
/// skipped. Errors are returned as a description so the caller can attach
/// the file path.
pub fn imports_from_bytes(data: &[u8]) -> std::result::Result<HashSet<String>, String> {
    // Signatures are irrelevant to imports; a bad certificate table must not
    // reject an otherwise readable image.
    let opts = ParseOptions {
        parse_attribute_certificates: false,
        ..ParseOptions::default()
    };
    let pe = PE::parse_with_opts(data, &opts).map_err(|e| e.to_string())?;
    let import_data = pe
        .import_data
        .as_ref()
        .ok_or_else(|| "no import directory".to_string())?;

    let mut functions = HashSet::new();
    for module in &import_data.import_data {
        let Some(lookup_table) = module.import_lookup_table.as_ref() else {
            continue;
        };
        for entry in lookup_table {
            if let SyntheticImportLookupTableEntry::HintNameTableRVA((_, hint_name)) = entry {
                if !hint_name.name.is_empty() {
                    functions.insert(hint_name.name.to_lowercase());
                }
            }
        }
    }

    Ok(functions)
}
