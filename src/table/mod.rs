// src/table/mod.rs
pub mod clip;
pub mod normalize;

use csv::ReaderBuilder;
use std::collections::HashMap;
use std::io::Cursor;
use tracing::{debug, instrument, warn};

pub use clip::{clip_quantities, MAX_QUANTITY, MIN_QUANTITY};
pub use normalize::normalize;

/// One input row: field name → raw string value. Values are untyped strings;
/// numeric fields are parsed with a fallback at aggregation time.
pub type Record = HashMap<String, String>;

/// A non-fatal problem found while reading the raw text. Diagnostics never
/// abort parsing; the rest of the table is still usable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// 1-based line in the raw text, when the reader can attribute one.
    pub line: Option<u64>,
    pub message: String,
}

/// Parsed table: records in input order, plus the diagnostics collected along
/// the way.
#[derive(Debug, Default)]
pub struct Table {
    pub records: Vec<Record>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Table {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Parse comma-separated text with a header row into a `Table`.
///
/// Field counts may vary per row (`flexible`). A short row keeps what it has
/// and leaves the trailing fields absent; a long row drops the extras, which
/// have no header to attach to. Either mismatch is reported as a `Diagnostic`
/// but the row itself is kept. Blank lines are skipped silently. A row the
/// reader cannot decode at all is skipped with a diagnostic. This function
/// itself never fails.
#[instrument(level = "debug", skip(text), fields(bytes = text.len()))]
pub fn parse_table(text: &str) -> Table {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(Cursor::new(text));

    let headers: Vec<String> = match rdr.headers() {
        Ok(h) => h.iter().map(|s| s.to_string()).collect(),
        Err(e) => {
            warn!(error = %e, "unreadable header row");
            return Table {
                records: Vec::new(),
                diagnostics: vec![Diagnostic {
                    line: Some(1),
                    message: format!("unreadable header row: {e}"),
                }],
            };
        }
    };

    let mut table = Table::default();
    for result in rdr.records() {
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                let line = e.position().map(|p| p.line());
                warn!(line, error = %e, "skipping unreadable row");
                table.diagnostics.push(Diagnostic {
                    line,
                    message: e.to_string(),
                });
                continue;
            }
        };

        // The reader reports a blank line as a single empty field.
        if record.iter().all(|f| f.trim().is_empty()) {
            continue;
        }

        if record.len() != headers.len() {
            let line = record.position().map(|p| p.line());
            let message = format!(
                "expected {} fields, got {}",
                headers.len(),
                record.len()
            );
            warn!(line, %message, "field count mismatch");
            table.diagnostics.push(Diagnostic { line, message });
        }

        let mut row: Record = HashMap::with_capacity(headers.len());
        for (header, value) in headers.iter().zip(record.iter()) {
            row.insert(header.clone(), value.to_string());
        }
        table.records.push(row);
    }

    debug!(
        records = table.records.len(),
        diagnostics = table.diagnostics.len(),
        "parsed table"
    );
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::{EnvFilter, FmtSubscriber};

    fn init_test_logging() {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| EnvFilter::new("info,cosecha::table=debug")),
            )
            .with_test_writer()
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }

    #[test]
    fn parses_header_and_rows() {
        init_test_logging();
        let table = parse_table("Nombre,Origen,Cantidad\nApple,Chile,10\nPear,Peru,5\n");
        assert!(table.diagnostics.is_empty());
        assert_eq!(table.records.len(), 2);
        assert_eq!(table.records[0]["Nombre"], "Apple");
        assert_eq!(table.records[1]["Cantidad"], "5");
    }

    #[test]
    fn short_row_kept_with_absent_fields_and_diagnosed() {
        let table = parse_table("Nombre,Origen,Cantidad\nApple,Chile\n");
        assert_eq!(table.records.len(), 1);
        assert_eq!(table.records[0].get("Cantidad"), None);
        assert_eq!(table.diagnostics.len(), 1);
        assert_eq!(table.diagnostics[0].message, "expected 3 fields, got 2");
        assert_eq!(table.diagnostics[0].line, Some(2));
    }

    #[test]
    fn long_row_drops_extras_and_is_diagnosed() {
        let table = parse_table("Nombre,Origen,Cantidad\nApple,Chile,10,stray\n");
        assert_eq!(table.records.len(), 1);
        assert_eq!(table.records[0]["Cantidad"], "10");
        assert_eq!(table.diagnostics.len(), 1);
    }

    #[test]
    fn blank_lines_are_skipped_silently() {
        let table = parse_table("Nombre,Origen,Cantidad\n\nApple,Chile,10\n\n");
        assert_eq!(table.records.len(), 1);
        assert!(table.diagnostics.is_empty());
    }

    #[test]
    fn quoted_fields_may_contain_commas() {
        let table = parse_table("Nombre,Origen,Cantidad\n\"Apple, red\",Chile,10\n");
        assert_eq!(table.records[0]["Nombre"], "Apple, red");
    }

    #[test]
    fn empty_input_yields_empty_table() {
        let table = parse_table("");
        assert!(table.is_empty());
        assert!(table.diagnostics.is_empty());
    }
}
