//! Command-line interface for qc-harvest.
//!
//! Available commands:
//!
//! - **run**: discover report files, run every module and write the report
//! - **inspect**: run a single extractor on a single file
//!
//! ## Usage
//!
//! ```text
//! # Harvest everything below a results directory
//! qc-harvest run results/ -o qc
//!
//! # JSON data files instead of TSV
//! qc-harvest run results/ -o qc --format json
//!
//! # Drop control samples
//! qc-harvest run results/ --ignore-samples 'neg_*'
//!
//! # Look at what one report yields
//! qc-harvest inspect results/lib1/outs/web_summary.html --format json
//! ```

use clap::{Parser, Subcommand};

pub mod inspect;
pub mod run;

#[derive(Parser)]
#[command(name = "qc-harvest")]
#[command(author = "Fulcrum Genomics")]
#[command(version)]
#[command(about = "Harvest QC statistics from sequencing pipeline reports")]
#[command(
    long_about = "qc-harvest collects per-sample QC statistics from the reports of upstream sequencing tools.\n\nSupported reports:\n- Cell Ranger count web summaries (web_summary.html)\n- DRAGEN FastQC metrics (*.fastqc_metrics.csv)\n- HUMID deduplication statistics (stats.dat)"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format
    #[arg(short, long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Discover report files and write the harvested statistics
    Run(run::RunArgs),

    /// Extract statistics from a single report file
    Inspect(inspect::InspectArgs),
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Tsv,
}
