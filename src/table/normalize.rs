// src/table/normalize.rs
use super::{Record, Table};

/// Marker some exports prepend to the first header cell.
const FIELD_MARKER: &str = "# ";

/// Trim whitespace and strip the stray `# ` marker from a field name. Only
/// the first marker occurrence is removed; values are never touched.
/// Idempotent: a clean name passes through unchanged.
pub fn clean_field_name(raw: &str) -> String {
    raw.trim().replacen(FIELD_MARKER, "", 1)
}

fn normalize_record(record: &Record) -> Record {
    record
        .iter()
        .map(|(name, value)| (clean_field_name(name), value.clone()))
        .collect()
}

/// Produce a copy of `table` whose field names are cleaned. The input is left
/// untouched and diagnostics are carried over as-is. Malformed names are
/// tolerated: a name that cleans down to the empty string stays on the record
/// as an unusable field rather than rejecting the row.
pub fn normalize(table: &Table) -> Table {
    Table {
        records: table.records.iter().map(normalize_record).collect(),
        diagnostics: table.diagnostics.clone(),
    }
}
