// src/aggregate/mod.rs
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, instrument};

use crate::table::{Record, Table};

/// One stacked-bar series: a group (country of origin) and its sums, aligned
/// one-to-one with `MatrixAggregate::labels`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Series {
    pub label: String,
    pub data: Vec<i64>,
}

/// Chart-ready shape for the stacked bar chart: item names on the axis, one
/// series per group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatrixAggregate {
    pub labels: Vec<String>,
    pub datasets: Vec<Series>,
}

/// Per-group totals for the choropleth. BTreeMap keeps the serialized payload
/// deterministic.
pub type ScalarAggregate = BTreeMap<String, i64>;

/// Parse a quantity value as an integer: the leading (optionally signed)
/// digit run counts, a trailing tail is ignored, so `"12abc"` is 12 and
/// `"12.5"` is 12. A missing value or one without leading digits is 0.
fn parse_quantity(value: Option<&String>) -> i64 {
    let Some(raw) = value else { return 0 };
    let trimmed = raw.trim();
    let (sign, digits) = match trimmed.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    let run = digits
        .find(|c: char| !c.is_ascii_digit())
        .map_or(digits, |end| &digits[..end]);
    run.parse::<i64>().map(|n| sign * n).unwrap_or(0)
}

/// Distinct non-empty values of `field` across `records`, in first-seen order
/// so chart axes stay stable across runs.
fn distinct_values(records: &[Record], field: &str) -> Vec<String> {
    let mut seen = Vec::new();
    for record in records {
        match record.get(field) {
            Some(v) if !v.is_empty() && !seen.contains(v) => seen.push(v.clone()),
            _ => {}
        }
    }
    seen
}

/// Build the matrix view: distinct items × distinct groups, each cell the sum
/// of the quantity field over records matching that (item, group) pair.
///
/// A pair with no matching records yields a 0 cell, never an omitted one, so
/// every series is aligned with the label axis. Zero records produce empty
/// labels and no series.
#[instrument(level = "debug", skip(table))]
pub fn matrix(
    table: &Table,
    item_field: &str,
    group_field: &str,
    qty_field: &str,
) -> MatrixAggregate {
    let labels = distinct_values(&table.records, item_field);
    let groups = distinct_values(&table.records, group_field);

    let datasets: Vec<Series> = groups
        .into_iter()
        .map(|group| {
            let data = labels
                .iter()
                .map(|item| {
                    table
                        .records
                        .iter()
                        .filter(|r| {
                            r.get(item_field) == Some(item) && r.get(group_field) == Some(&group)
                        })
                        .map(|r| parse_quantity(r.get(qty_field)))
                        .sum()
                })
                .collect();
            Series { label: group, data }
        })
        .collect();

    debug!(
        items = labels.len(),
        series = datasets.len(),
        "built matrix aggregate"
    );
    MatrixAggregate { labels, datasets }
}

/// Build the scalar view: per-group quantity totals keyed by the trimmed
/// group value.
///
/// Unlike the matrix view, a record missing either the group or the quantity
/// field (absent or empty) is skipped outright instead of counting as 0. The
/// asymmetry is inherited behavior, kept deliberately.
#[instrument(level = "debug", skip(table))]
pub fn scalar(table: &Table, group_field: &str, qty_field: &str) -> ScalarAggregate {
    let mut totals = ScalarAggregate::new();
    for record in &table.records {
        let group = match record.get(group_field) {
            Some(g) if !g.is_empty() => g.trim(),
            _ => continue,
        };
        let qty = match record.get(qty_field) {
            Some(q) if !q.is_empty() => q,
            _ => continue,
        };
        *totals.entry(group.to_string()).or_insert(0) += parse_quantity(Some(qty));
    }
    debug!(groups = totals.len(), "built scalar aggregate");
    totals
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{normalize, parse_table};

    const ITEM: &str = "Nombre";
    const GROUP: &str = "Origen";
    const QTY: &str = "Cantidad";

    fn sample() -> Table {
        parse_table(
            "Nombre,Origen,Cantidad\n\
             Apple,Chile,10\n\
             Apple,Peru,5\n\
             Pear,Chile,3\n",
        )
    }

    #[test]
    fn matrix_matches_reference_table() {
        let m = matrix(&sample(), ITEM, GROUP, QTY);
        assert_eq!(m.labels, vec!["Apple", "Pear"]);
        assert_eq!(
            m.datasets,
            vec![
                Series { label: "Chile".into(), data: vec![10, 3] },
                Series { label: "Peru".into(), data: vec![5, 0] },
            ]
        );
    }

    #[test]
    fn scalar_matches_reference_table() {
        let s = scalar(&sample(), GROUP, QTY);
        assert_eq!(s.get("Chile"), Some(&13));
        assert_eq!(s.get("Peru"), Some(&5));
        assert_eq!(s.len(), 2);
    }

    #[test]
    fn matrix_column_sums_equal_scalar_totals() {
        let table = sample();
        let m = matrix(&table, ITEM, GROUP, QTY);
        let s = scalar(&table, GROUP, QTY);
        for series in &m.datasets {
            let col_sum: i64 = series.data.iter().sum();
            assert_eq!(Some(&col_sum), s.get(&series.label), "group {}", series.label);
        }
    }

    #[test]
    fn quantity_with_trailing_tail_keeps_its_leading_digits() {
        let table = parse_table("Nombre,Origen,Cantidad\nApple,Chile,12abc\nApple,Chile,3\n");
        let s = scalar(&table, GROUP, QTY);
        assert_eq!(s.get("Chile"), Some(&15));
        let m = matrix(&table, ITEM, GROUP, QTY);
        assert_eq!(m.datasets[0].data, vec![15]);
    }

    #[test]
    fn quantity_parsing_handles_signs_and_decimals() {
        let table = parse_table(
            "Nombre,Origen,Cantidad\n\
             Apple,Chile,-4x\n\
             Pear,Peru,+7\n\
             Uva,Brasil,12.5\n",
        );
        let s = scalar(&table, GROUP, QTY);
        assert_eq!(s.get("Chile"), Some(&-4));
        assert_eq!(s.get("Peru"), Some(&7));
        assert_eq!(s.get("Brasil"), Some(&12));
    }

    #[test]
    fn non_numeric_quantity_contributes_zero_to_both_views() {
        let table = parse_table("Nombre,Origen,Cantidad\nApple,Chile,abc\nApple,Chile,4\n");
        let m = matrix(&table, ITEM, GROUP, QTY);
        assert_eq!(m.datasets[0].data, vec![4]);
        let s = scalar(&table, GROUP, QTY);
        assert_eq!(s.get("Chile"), Some(&4));
    }

    #[test]
    fn empty_table_yields_empty_views() {
        let table = Table::default();
        let m = matrix(&table, ITEM, GROUP, QTY);
        assert!(m.labels.is_empty());
        assert!(m.datasets.is_empty());
        assert!(scalar(&table, GROUP, QTY).is_empty());
    }

    #[test]
    fn empty_item_and_group_values_are_excluded_from_axes() {
        let table = parse_table("Nombre,Origen,Cantidad\n,Chile,10\nApple,,5\nApple,Peru,2\n");
        let m = matrix(&table, ITEM, GROUP, QTY);
        assert_eq!(m.labels, vec!["Apple"]);
        assert_eq!(m.datasets.len(), 2); // Chile and Peru; Chile's Apple cell is 0
        assert_eq!(m.datasets[0].data, vec![0]);
    }

    #[test]
    fn scalar_keys_by_trimmed_group_value() {
        let table = parse_table("Nombre,Origen,Cantidad\nApple, Chile ,10\nPear,Chile,3\n");
        let s = scalar(&table, GROUP, QTY);
        assert_eq!(s.get("Chile"), Some(&13));
    }

    // Known asymmetry between the two views, preserved from the inherited
    // behavior pending product clarification: a record without a group is
    // skipped by the scalar view but still contributes its item name (with
    // zero cells) to the matrix.
    #[test]
    fn known_asymmetry_missing_group_skipped_by_scalar_but_labels_matrix() {
        let table = parse_table("Nombre,Origen,Cantidad\nKiwi,,7\nApple,Chile,1\n");
        let s = scalar(&table, GROUP, QTY);
        assert_eq!(s.get("Chile"), Some(&1));
        assert_eq!(s.len(), 1);

        let m = matrix(&table, ITEM, GROUP, QTY);
        assert_eq!(m.labels, vec!["Kiwi", "Apple"]);
        // Kiwi matches no group, so its cell is zero-filled rather than absent.
        assert_eq!(m.datasets[0].data, vec![0, 1]);
    }

    #[test]
    fn aggregation_follows_normalized_field_names() {
        let raw = parse_table("# Nombre, Origen ,Cantidad\nApple,Chile,10\n");
        let table = normalize(&raw);
        let m = matrix(&table, ITEM, GROUP, QTY);
        assert_eq!(m.labels, vec!["Apple"]);
        assert_eq!(m.datasets[0].data, vec![10]);
    }
}
