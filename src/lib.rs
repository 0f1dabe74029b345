//! # qc-harvest
//!
//! A library for harvesting per-sample QC statistics from the reports of
//! sequencing pipelines.
//!
//! Each supported tool writes its summary in its own shape: Cell Ranger embeds
//! a JSON document in an HTML page, DRAGEN writes a headerless metrics CSV and
//! HUMID writes `field: count` lines. `qc-harvest` finds those files, extracts
//! a normalized statistics table per sample, and collects warnings and
//! plot-ready series next to it.
//!
//! ## Features
//!
//! - **Cell Ranger count**: summary, sequencing and mapping metrics, alarms,
//!   barcode-rank, median-genes and saturation curves
//! - **DRAGEN FastQC**: read-weighted mean GC content and per-position mean quality
//! - **HUMID**: deduplication counts, checked for consistency
//! - **Sample handling**: name cleaning, ignore patterns, duplicate detection
//!
//! ## Example
//!
//! ```rust,no_run
//! use qc_harvest::config::RunConfig;
//! use qc_harvest::core::diagnostics::TracingDiagnostics;
//! use qc_harvest::discovery::collect_candidates;
//! use qc_harvest::modules::{all_modules, run_modules, RunContext};
//! use std::path::PathBuf;
//!
//! let config = RunConfig::default();
//! let candidates = collect_candidates(&[PathBuf::from("results")], config.filesize_limit, &TracingDiagnostics);
//! let ctx = RunContext::new(&config, &TracingDiagnostics).unwrap();
//!
//! for report in run_modules(&all_modules(), &candidates, &ctx).unwrap() {
//!     println!("{}: {} samples", report.name, report.samples.len());
//! }
//! ```
//!
//! ## Modules
//!
//! - [`core`]: Statistics tables, headers, report outputs and diagnostics
//! - [`config`]: Run configuration
//! - [`discovery`]: Finding report files
//! - [`parsing`]: Extractors for each report format
//! - [`modules`]: Per-run accumulation for each tool
//! - [`cli`]: Command-line interface implementation

pub mod cli;
pub mod config;
pub mod core;
pub mod discovery;
pub mod modules;
pub mod parsing;
pub mod utils;

// Re-export commonly used types for convenience
pub use config::RunConfig;
pub use core::report::{ModuleReport, RunReport};
pub use core::types::*;
pub use modules::{all_modules, run_modules, ReportModule, RunContext};
