//! Extractors for tool-specific QC reports.
//!
//! Each parser turns one report file into plain per-sample data; nothing here
//! keeps state across files. Accumulation over a run lives in
//! [`modules`](crate::modules).
//!
//! - **Cell Ranger count** ([`cellranger`]): `web_summary.html` with an embedded
//!   `const data = {...}` JSON assignment
//! - **DRAGEN FastQC** ([`dragen_fastqc`]): `<prefix>.fastqc_metrics.csv`
//! - **HUMID** ([`humid`]): `stats.dat` with `field: integer` lines
//!
//! Shared helpers:
//!
//! - [`merge`]: renames `{name, value}` rows into short statistic keys and
//!   registers column headers
//! - [`plots`]: reshapes plot payloads into ordered `(x, y)` series
//! - [`values`]: parses formatted numbers such as `"1,234"` and `"94.1%"`

use thiserror::Error;

pub mod cellranger;
pub mod dragen_fastqc;
pub mod humid;
pub mod merge;
pub mod plots;
pub mod values;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No line starting with `{0}` found")]
    MissingMarker(&'static str),

    #[error("Invalid embedded JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Missing field: {0}")]
    MissingField(String),

    #[error("Inconsistent statistics: {0}")]
    Inconsistent(String),
}
