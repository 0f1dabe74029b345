//! Parser for DRAGEN FastQC metrics (`<prefix>.fastqc_metrics.csv`).
//!
//! Every row is `group,read label,metric,value`, e.g.
//! `READ GC CONTENT,Read1,50% GC Reads,1041`. There is no header line.
//!
//! Two things are extracted:
//!
//! - the read-weighted mean GC content over the `READ GC CONTENT` rows
//! - per-read positional tables used to compute the mean quality and the
//!   quality quantiles at each read position

use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Read;

use crate::core::types::{QuantileSeries, Series};
use crate::parsing::values::parse_percent_fraction;
use crate::parsing::ParseError;

/// Suffix of metrics file names; the rest of the name is the sample
pub const FILE_SUFFIX: &str = ".fastqc_metrics.csv";

pub const GC_CONTENT_GROUP: &str = "READ GC CONTENT";
pub const MEAN_QUALITY_GROUP: &str = "POSITIONAL BASE MEAN QUALITY";
pub const BASE_CONTENT_GROUP: &str = "POSITIONAL BASE CONTENT";
pub const QUALITY_GROUP: &str = "POSITIONAL QUALITY";

/// Quality assumed for `N` calls
const N_QUALITY: i64 = 2;

/// Bases with positional tables
const BASES: [char; 5] = ['A', 'C', 'G', 'T', 'N'];

/// Sample name encoded in a metrics file name, `None` if the name does not match
#[must_use]
pub fn sample_from_file_name(file_name: &str) -> Option<&str> {
    file_name
        .strip_suffix(FILE_SUFFIX)
        .filter(|prefix| !prefix.is_empty())
}

/// Running read-weighted GC fraction
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct GcAccumulator {
    weighted_reads: f64,
    total_reads: f64,
}

impl GcAccumulator {
    /// Add one `READ GC CONTENT` row. Returns `false` if either field fails to
    /// parse, in which case nothing is accumulated.
    pub fn add(&mut self, metric: &str, reads: &str) -> bool {
        let Ok(reads) = reads.trim().parse::<f64>() else {
            return false;
        };
        let Some(fraction) = metric.split('%').next().and_then(parse_percent_fraction) else {
            return false;
        };
        if !reads.is_finite() {
            return false;
        }
        self.weighted_reads += reads * fraction;
        self.total_reads += reads;
        true
    }

    /// Total reads counted so far
    #[must_use]
    pub fn total_reads(&self) -> f64 {
        self.total_reads
    }

    /// Mean GC content in percent, `None` when no reads were counted
    #[must_use]
    pub fn mean_percent(&self) -> Option<f64> {
        (self.total_reads > 0.0).then(|| 100.0 * self.weighted_reads / self.total_reads)
    }
}

/// Positional metric tables of one read: metric name -> raw value
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PositionalTables {
    pub mean_quality: BTreeMap<String, String>,
    pub base_content: BTreeMap<String, String>,
    /// `ReadPos <pos> <q>% Quantile` -> quality value
    pub quality: BTreeMap<String, String>,
}

/// Everything kept from one metrics file
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FastqcMetrics {
    pub gc: GcAccumulator,
    /// Read label (e.g. `Read1`) -> positional tables
    pub positional: BTreeMap<String, PositionalTables>,
}

impl FastqcMetrics {
    /// Mean GC content in percent; see [`GcAccumulator::mean_percent`]
    #[must_use]
    pub fn gc_content_percent(&self) -> Option<f64> {
        self.gc.mean_percent()
    }
}

/// Stream a metrics CSV.
///
/// Rows that do not have exactly four fields or whose numbers fail to parse are
/// skipped individually.
///
/// # Errors
///
/// Returns `ParseError::Csv` if the underlying reader fails.
pub fn parse_fastqc_metrics<R: Read>(reader: R) -> Result<FastqcMetrics, ParseError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut metrics = FastqcMetrics::default();
    for record in csv_reader.records() {
        let record = match record {
            Ok(record) => record,
            Err(e) if e.is_io_error() => return Err(e.into()),
            Err(_) => continue,
        };
        if record.len() != 4 {
            continue;
        }
        let (group, read, metric, value) = (&record[0], &record[1], &record[2], &record[3]);

        match group {
            GC_CONTENT_GROUP => {
                metrics.gc.add(metric, value);
            }
            MEAN_QUALITY_GROUP => {
                metrics
                    .positional
                    .entry(read.to_string())
                    .or_default()
                    .mean_quality
                    .insert(metric.to_string(), value.to_string());
            }
            BASE_CONTENT_GROUP => {
                metrics
                    .positional
                    .entry(read.to_string())
                    .or_default()
                    .base_content
                    .insert(metric.to_string(), value.to_string());
            }
            QUALITY_GROUP => {
                metrics
                    .positional
                    .entry(read.to_string())
                    .or_default()
                    .quality
                    .insert(metric.to_string(), value.to_string());
            }
            _ => {}
        }
    }

    Ok(metrics)
}

/// Position key of `ReadPos <pos> <base> ...` metrics.
///
/// Positions may be ranges (`10-14`); the key is `start + end`, i.e. twice the
/// midpoint, which keeps keys integral and ordered. Positions too large to
/// double give `None`.
fn position_key(position: &str) -> Option<u64> {
    match position.split_once('-') {
        Some((start, end)) => start
            .parse::<u64>()
            .ok()?
            .checked_add(end.parse::<u64>().ok()?),
        None => position.parse::<u64>().ok()?.checked_mul(2),
    }
}

/// Read position (in bp) of a position key
#[allow(clippy::cast_precision_loss)]
fn position_from_key(key: u64) -> f64 {
    key as f64 / 2.0
}

/// Split `ReadPos 4 A Average Quality` into (position key, base)
fn parse_positional_metric(metric: &str) -> Option<(u64, char)> {
    let mut parts = metric.split_whitespace();
    parts.next()?;
    let position = position_key(parts.next()?)?;
    let mut base = parts.next()?.chars();
    let base = base.next()?.to_ascii_uppercase();
    BASES.contains(&base).then_some((position, base))
}

/// Mean base quality at each read position.
///
/// Per-base average qualities are weighted by per-base counts at the same
/// position; `N` calls count with a fixed quality of 2. Positions with no
/// bases are omitted. Points are sorted by position.
///
/// A count row that would overflow its position's totals is skipped.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
pub fn mean_quality_by_position(tables: &PositionalTables) -> Series {
    let mut averages: BTreeMap<(char, u64), f64> = BTreeMap::new();
    for (metric, value) in &tables.mean_quality {
        if value == "NA" {
            continue;
        }
        let (Some(key), Ok(avg)) = (parse_positional_metric(metric), value.parse::<f64>()) else {
            continue;
        };
        averages.insert((key.1, key.0), avg);
    }

    let mut quality_sums: BTreeMap<u64, i64> = BTreeMap::new();
    let mut totals: BTreeMap<u64, i64> = BTreeMap::new();
    for (metric, value) in &tables.base_content {
        let (Some((position, base)), Ok(count)) = (parse_positional_metric(metric), value.parse::<i64>())
        else {
            continue;
        };
        let Some(total) = totals.get(&position).copied().unwrap_or(0).checked_add(count) else {
            continue;
        };
        if count == 0 {
            totals.insert(position, total);
            continue;
        }

        let quality = if base == 'N' {
            count.checked_mul(N_QUALITY)
        } else {
            // Float to int casts saturate
            Some(
                averages
                    .get(&(base, position))
                    .map_or(0, |avg| (count as f64 * avg).round() as i64),
            )
        };
        let Some(sum) = quality.and_then(|q| {
            quality_sums.get(&position).copied().unwrap_or(0).checked_add(q)
        }) else {
            continue;
        };
        totals.insert(position, total);
        quality_sums.insert(position, sum);
    }

    quality_sums
        .into_iter()
        .filter_map(|(position, sum)| {
            let total = *totals.get(&position)?;
            let mean = sum as f64 / total as f64;
            (total > 0).then_some((position_from_key(position), mean))
        })
        .collect()
}

/// Quality quantiles at each read position.
///
/// Metrics look like `ReadPos 4 25% Quantile`; each yields one quantile
/// (percent) and its quality value. Unparsable rows are skipped. Points are
/// sorted by position.
#[must_use]
pub fn quality_quantiles_by_position(tables: &PositionalTables) -> QuantileSeries {
    let mut by_position: BTreeMap<u64, BTreeMap<u32, i64>> = BTreeMap::new();
    for (metric, value) in &tables.quality {
        let mut parts = metric.split_whitespace().skip(1);
        let (Some(position), Some(quantile)) = (parts.next(), parts.next()) else {
            continue;
        };
        let (Some(position), Some(quantile), Ok(value)) = (
            position_key(position),
            quantile
                .strip_suffix('%')
                .and_then(|q| q.parse::<u32>().ok()),
            value.parse::<i64>(),
        ) else {
            continue;
        };
        by_position
            .entry(position)
            .or_default()
            .insert(quantile, value);
    }

    by_position
        .into_iter()
        .map(|(position, quantiles)| (position_from_key(position), quantiles))
        .collect()
}
