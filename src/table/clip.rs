// src/table/clip.rs
use tracing::{debug, instrument};

use super::Table;

/// Bounds the inventory data is clipped to before charting.
pub const MIN_QUANTITY: i64 = 0;
pub const MAX_QUANTITY: i64 = 2500;

/// Clamp every numeric value of `field` into `[min, max]`, returning a new
/// table. Values that do not parse as integers, and records without the
/// field, pass through untouched; so do all other fields and the
/// diagnostics. The input is not mutated.
#[instrument(level = "debug", skip(table))]
pub fn clip_quantities(table: &Table, field: &str, min: i64, max: i64) -> Table {
    let mut clipped = 0usize;
    let records = table
        .records
        .iter()
        .map(|record| {
            let mut row = record.clone();
            if let Some(value) = record.get(field) {
                if let Ok(n) = value.trim().parse::<i64>() {
                    let bounded = n.clamp(min, max);
                    if bounded != n {
                        clipped += 1;
                        row.insert(field.to_string(), bounded.to_string());
                    }
                }
            }
            row
        })
        .collect();
    debug!(clipped, "clipped quantity outliers");
    Table {
        records,
        diagnostics: table.diagnostics.clone(),
    }
}
