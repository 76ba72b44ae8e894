//! Tabular projection of accumulated file results into a CSV export.
//!
//! Each selected file contributes one row per diploma record, built by
//! merging institution metadata, the fiscalization period, and the
//! record's own fields (diploma fields win key collisions). Columns are
//! the client-selected identifiers intersected with the keys actually
//! present, in selection order; unknown identifiers are silently
//! dropped, never an error.

use serde::Deserialize;

use crate::model::FileResult;

/// Attachment name of the CSV download.
pub const EXPORT_FILENAME: &str = "fiscalizacao_export.csv";

/// UTF-8 byte-order marker so spreadsheet tools pick the right encoding.
const UTF8_BOM: &[u8] = b"\xef\xbb\xbf";

/// Client-chosen files and field identifiers against a previously
/// produced batch result. Ephemeral; consumed by the projector only.
#[derive(Debug, Deserialize)]
pub struct ExportSelection {
    #[serde(default)]
    pub selected_files: Vec<String>,
    #[serde(default)]
    pub fields: Vec<String>,
    #[serde(default)]
    pub files_data: Vec<FileResult>,
}

/// Flattened export table: ordered columns plus one row per diploma.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ExportTable {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Insert or overwrite a key while keeping first-insertion order, the
/// merge semantics of the export contract.
fn merge_pair(row: &mut Vec<(String, String)>, key: &str, value: &str) {
    match row.iter_mut().find(|(k, _)| k == key) {
        Some((_, existing)) => *existing = value.to_string(),
        None => row.push((key.to_string(), value.to_string())),
    }
}

/// Build the export table from a selection.
pub fn build_table(selection: &ExportSelection) -> ExportTable {
    let mut merged_rows: Vec<Vec<(String, String)>> = Vec::new();

    for file in &selection.files_data {
        if !selection.selected_files.contains(&file.filename) {
            continue;
        }

        for diploma in &file.diplomas {
            let mut row: Vec<(String, String)> = Vec::new();

            if let Some(ies) = &file.ies_info {
                for (key, value) in ies.flatten() {
                    merge_pair(&mut row, key, value);
                }
            }
            if let Some(dates) = &file.dates_info {
                for (key, value) in dates.flatten() {
                    merge_pair(&mut row, key, value);
                }
            }
            for (key, value) in diploma.flatten() {
                merge_pair(&mut row, key, value);
            }

            merged_rows.push(row);
        }
    }

    if merged_rows.is_empty() {
        return ExportTable {
            columns: Vec::new(),
            rows: Vec::new(),
        };
    }

    // Selected identifiers intersected with keys actually present, in
    // selection order.
    let columns: Vec<String> = selection
        .fields
        .iter()
        .filter(|field| {
            merged_rows
                .iter()
                .any(|row| row.iter().any(|(k, _)| k == *field))
        })
        .cloned()
        .collect();

    let rows = merged_rows
        .iter()
        .map(|row| {
            columns
                .iter()
                .map(|column| {
                    row.iter()
                        .find(|(k, _)| k == column)
                        .map(|(_, v)| v.clone())
                        .unwrap_or_default()
                })
                .collect()
        })
        .collect();

    ExportTable { columns, rows }
}

/// Encode a table as BOM-prefixed CSV bytes.
pub fn to_csv_bytes(table: &ExportTable) -> Vec<u8> {
    let mut out = Vec::from(UTF8_BOM);

    if !table.columns.is_empty() {
        push_csv_line(&mut out, &table.columns);
        for row in &table.rows {
            push_csv_line(&mut out, row);
        }
    }

    out
}

fn push_csv_line(out: &mut Vec<u8>, values: &[String]) {
    for (i, value) in values.iter().enumerate() {
        if i > 0 {
            out.push(b',');
        }
        out.extend_from_slice(escape_csv(value).as_bytes());
    }
    out.push(b'\n');
}

fn escape_csv(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
