//! Renaming of report table rows into flat statistics.
//!
//! Reports list their statistics as rows of `(display name, formatted value)`.
//! A static table of [`ColumnDef`]s maps the display names we care about to
//! short keys that stay stable across samples and report versions. Rows with
//! unknown names are ignored, so new rows added upstream do not break parsing.

use serde::Deserialize;

use crate::core::types::{HeaderMeta, HeaderRegistry, SampleStats, ValueFormat};
use crate::parsing::values::RowValue;

/// One row of a report table
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum TableRow {
    /// `["Estimated Number of Cells", "1,234"]`
    Pair(String, RowValue),
    /// `{"name": "Estimated Number of Cells", "value": "1,234"}`
    Named { name: String, value: RowValue },
}

impl TableRow {
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Pair(name, _) | Self::Named { name, .. } => name,
        }
    }

    #[must_use]
    pub fn value(&self) -> &RowValue {
        match self {
            Self::Pair(_, value) | Self::Named { value, .. } => value,
        }
    }
}

/// Mapping of a report row name to a short statistic key and its color scale
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnDef {
    /// Row name as displayed in the report
    pub name: &'static str,
    /// Short key used in statistics tables
    pub key: &'static str,
    pub scale: Option<&'static str>,
}

impl ColumnDef {
    #[must_use]
    pub const fn new(name: &'static str, key: &'static str, scale: Option<&'static str>) -> Self {
        Self { name, key, scale }
    }
}

/// Human-readable column title for a short key
#[must_use]
pub fn title_for_key(key: &str) -> String {
    let mut chars = key.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Machine id for a column: `<category>_<key>`, lowercase, non-alphanumerics as `_`
#[must_use]
pub fn column_id(category: &str, key: &str) -> String {
    format!("{category}_{key}")
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect()
}

/// Merge report rows into `stats`, registering a header for each new key.
///
/// For every row whose name appears in `columns`, the value is parsed and
/// stored under the column's short key, replacing any earlier value. Rows
/// with unknown names, or values that do not parse as numbers, are skipped.
/// Headers are registered once per key: re-registering is a no-op, so the
/// registry is independent of which samples carry which statistics.
pub fn merge_rows<'a>(
    stats: &mut SampleStats,
    headers: &mut HeaderRegistry,
    rows: impl IntoIterator<Item = &'a TableRow>,
    columns: &[ColumnDef],
    category: &str,
) {
    for row in rows {
        let Some(column) = columns.iter().find(|c| c.name == row.name()) else {
            continue;
        };
        let Some(parsed) = row.value().parse() else {
            continue;
        };

        stats.insert(column.key.to_string(), parsed.value);

        if headers.contains(column.key) {
            continue;
        }

        let format = if parsed.is_percent {
            ValueFormat::Percent
        } else if parsed.is_integral {
            ValueFormat::Count
        } else {
            ValueFormat::Float
        };

        let mut header = HeaderMeta::new(
            column_id(category, column.key),
            title_for_key(column.key),
            column.name,
        )
        .with_format(format)
        .with_shared_key(category);
        if let Some(scale) = column.scale {
            header = header.with_scale(scale);
        }
        headers.register(column.key, header);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COLUMNS: &[ColumnDef] = &[
        ColumnDef::new("Number of Reads", "reads", Some("PuBuGn")),
        ColumnDef::new("Valid Barcodes", "valid bc", Some("RdYlGn")),
        ColumnDef::new("Mean Reads per Cell", "avg reads/cell", None),
    ];

    fn rows(json: &str) -> Vec<TableRow> {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_merge_renames_and_parses() {
        let rows = rows(
            r#"[["Number of Reads", "1,000,000"], ["Valid Barcodes", "97.5%"],
                {"name": "Mean Reads per Cell", "value": 1234.5}]"#,
        );
        let mut stats = SampleStats::new();
        let mut headers = HeaderRegistry::new();

        merge_rows(&mut stats, &mut headers, &rows, COLUMNS, "Count");

        assert_eq!(stats.len(), 3);
        assert!((stats["reads"] - 1_000_000.0).abs() < f64::EPSILON);
        assert!((stats["valid bc"] - 0.975).abs() < 1e-12);
        assert!((stats["avg reads/cell"] - 1234.5).abs() < f64::EPSILON);

        let valid = headers.get("valid bc").unwrap();
        assert_eq!(valid.rid, "count_valid_bc");
        assert_eq!(valid.title, "Valid bc");
        assert_eq!(valid.description, "Valid Barcodes");
        assert_eq!(valid.scale.as_deref(), Some("RdYlGn"));
        assert_eq!(valid.shared_key.as_deref(), Some("Count"));
        assert_eq!(valid.format, ValueFormat::Percent);
        assert_eq!(headers.get("reads").unwrap().format, ValueFormat::Count);
        assert!(headers.get("avg reads/cell").unwrap().scale.is_none());
    }

    #[test]
    fn test_unknown_rows_leave_stats_unchanged() {
        let rows = rows(r#"[["Some Future Metric", "12"], ["Another", "3%"]]"#);
        let mut stats = SampleStats::new();
        stats.insert("reads".to_string(), 5.0);
        let mut headers = HeaderRegistry::new();

        merge_rows(&mut stats, &mut headers, &rows, COLUMNS, "Count");

        assert_eq!(stats.len(), 1);
        assert!((stats["reads"] - 5.0).abs() < f64::EPSILON);
        assert!(headers.is_empty());
    }

    #[test]
    fn test_bad_value_skips_only_that_row() {
        let rows = rows(r#"[["Number of Reads", "lots"], ["Valid Barcodes", "90%"]]"#);
        let mut stats = SampleStats::new();
        let mut headers = HeaderRegistry::new();

        merge_rows(&mut stats, &mut headers, &rows, COLUMNS, "Count");

        assert!(!stats.contains_key("reads"));
        assert!(!headers.contains("reads"));
        assert!((stats["valid bc"] - 0.9).abs() < 1e-12);
    }

    #[test]
    fn test_headers_registered_once_across_samples() {
        let first = rows(r#"[["Number of Reads", "10"], ["Valid Barcodes", "90%"]]"#);
        let second = rows(r#"[["Number of Reads", "20.5"]]"#);
        let mut headers = HeaderRegistry::new();

        let mut stats_a = SampleStats::new();
        merge_rows(&mut stats_a, &mut headers, &first, COLUMNS, "Count");
        let mut stats_b = SampleStats::new();
        merge_rows(&mut stats_b, &mut headers, &second, COLUMNS, "Count");
        merge_rows(&mut stats_b, &mut headers, &first, COLUMNS, "Count");

        assert_eq!(headers.len(), 2);
        // First registration wins, even though the second sample's value is fractional
        assert_eq!(headers.get("reads").unwrap().format, ValueFormat::Count);
        // Later rows overwrite earlier values within a sample
        assert!((stats_b["reads"] - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_column_id_and_title() {
        assert_eq!(column_id("Count", "avg reads/cell"), "count_avg_reads_cell");
        assert_eq!(title_for_key("estimated cells"), "Estimated cells");
        assert_eq!(title_for_key("Q30 bc"), "Q30 bc");
        assert_eq!(title_for_key(""), "");
    }
}
