//! Parser for HUMID deduplication statistics (`stats.dat`).
//!
//! The file holds `field: integer` lines in no particular order:
//!
//! ```text
//! total: 10000
//! usable: 9500
//! clusters: 7000
//! ```
//!
//! It carries no sample name; callers name the sample after the directory
//! holding the file.

use std::collections::BTreeMap;
use std::io::BufRead;

use crate::core::diagnostics::Diagnostics;
use crate::parsing::ParseError;

/// Name of every HUMID statistics file
pub const STATS_FILE_NAME: &str = "stats.dat";

/// Field name -> count for one sample
pub type RawStatsRecord = BTreeMap<String, i64>;

/// Parse `field: integer` lines.
///
/// Blank lines and lines that do not parse are skipped. A repeated field keeps
/// its last value.
///
/// # Errors
///
/// Returns `ParseError::Io` if reading fails.
pub fn parse_stats_lines<R: BufRead>(reader: R) -> Result<RawStatsRecord, ParseError> {
    let mut record = RawStatsRecord::new();
    for line in reader.lines() {
        let line = line?;
        let Some((field, value)) = line.trim().split_once(':') else {
            continue;
        };
        let Ok(value) = value.trim().parse::<i64>() else {
            continue;
        };
        record.insert(field.trim().to_string(), value);
    }
    Ok(record)
}

fn required(record: &RawStatsRecord, field: &str) -> Result<i64, ParseError> {
    record
        .get(field)
        .copied()
        .ok_or_else(|| ParseError::MissingField(field.to_string()))
}

/// Derive `filtered` and `duplicates` and check that the counts add up.
///
/// `filtered = total - usable` and `duplicates = total - clusters - filtered`.
/// Values already present in the record take precedence over derived ones, so
/// a file that states them is checked against `duplicates + clusters +
/// filtered == total`. Negative counts are rejected as well.
///
/// # Errors
///
/// Returns `ParseError::MissingField` if `total`, `usable` or `clusters` is
/// absent, or `ParseError::Inconsistent` if the counts do not reconcile or
/// their arithmetic overflows.
pub fn reconcile(record: &mut RawStatsRecord) -> Result<(), ParseError> {
    let total = required(record, "total")?;
    let usable = required(record, "usable")?;
    let clusters = required(record, "clusters")?;

    let filtered = match record.get("filtered") {
        Some(filtered) => *filtered,
        None => total
            .checked_sub(usable)
            .ok_or_else(|| overflow("total - usable"))?,
    };
    let duplicates = match record.get("duplicates") {
        Some(duplicates) => *duplicates,
        None => total
            .checked_sub(clusters)
            .and_then(|rest| rest.checked_sub(filtered))
            .ok_or_else(|| overflow("total - clusters - filtered"))?,
    };
    record.insert("filtered".to_string(), filtered);
    record.insert("duplicates".to_string(), duplicates);

    let sum = duplicates
        .checked_add(clusters)
        .and_then(|partial| partial.checked_add(filtered))
        .ok_or_else(|| overflow("duplicates + clusters + filtered"))?;
    if sum != total {
        return Err(ParseError::Inconsistent(format!(
            "duplicates ({duplicates}) + clusters ({clusters}) + filtered ({filtered}) != total ({total})"
        )));
    }

    if let Some((field, value)) = record.iter().find(|(_, v)| **v < 0) {
        return Err(ParseError::Inconsistent(format!("{field} is negative ({value})")));
    }

    Ok(())
}

fn overflow(expression: &str) -> ParseError {
    ParseError::Inconsistent(format!("{expression} overflows"))
}

/// Parse and reconcile one statistics file.
///
/// Returns `Ok(None)` when the statistics do not reconcile; the sample is
/// reported through `diagnostics` and should be skipped.
///
/// # Errors
///
/// Returns `ParseError::Io` if reading fails.
pub fn parse_stats_file<R: BufRead>(
    reader: R,
    sample: &str,
    diagnostics: &dyn Diagnostics,
) -> Result<Option<RawStatsRecord>, ParseError> {
    let mut record = parse_stats_lines(reader)?;
    match reconcile(&mut record) {
        Ok(()) => Ok(Some(record)),
        Err(e) => {
            diagnostics.warning(&format!("HUMID stats looked wrong, skipping: {sample} ({e})"));
            Ok(None)
        }
    }
}
