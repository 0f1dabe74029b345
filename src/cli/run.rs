//! Run command - discover report files and harvest every supported tool.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Args;

use crate::cli::OutputFormat;
use crate::config::RunConfig;
use crate::core::diagnostics::TracingDiagnostics;
use crate::core::report::{DataFormat, ModuleReport, RunReport};
use crate::discovery::collect_candidates;
use crate::modules::{all_modules, run_modules, RunContext};

/// Name of the report written into the output directory
pub const REPORT_FILE_NAME: &str = "qc_harvest_report.json";

/// Directory (below the output directory) holding per-module data files
pub const DATA_DIR_NAME: &str = "qc_harvest_data";

#[derive(Args)]
pub struct RunArgs {
    /// Files or directories to search for reports
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Output directory
    #[arg(short, long, default_value = ".")]
    pub outdir: PathBuf,

    /// JSON configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Glob pattern of sample names to leave out (repeatable)
    #[arg(long = "ignore-samples")]
    pub ignore_samples: Vec<String>,

    /// Skip files larger than this many bytes
    #[arg(long)]
    pub filesize_limit: Option<u64>,
}

/// Execute the run command
///
/// # Errors
///
/// Returns an error if the configuration is invalid or the outputs cannot be
/// written. Individual unreadable reports are logged and skipped.
#[allow(clippy::needless_pass_by_value)] // CLI entry point, values from clap
pub fn run(args: RunArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    let config = load_config(&args)?;
    let diagnostics = TracingDiagnostics;

    let candidates = collect_candidates(&args.paths, config.filesize_limit, &diagnostics);
    if verbose {
        eprintln!("Found {} candidate files", candidates.len());
    }

    let ctx = RunContext::new(&config, &diagnostics)?;
    let modules = run_modules(&all_modules(), &candidates, &ctx)?;
    if modules.is_empty() {
        tracing::warn!("No analysis results found in the given paths");
    }

    let data_format = match format {
        OutputFormat::Json => DataFormat::Json,
        OutputFormat::Text | OutputFormat::Tsv => DataFormat::Tsv,
    };
    let report = RunReport::new(modules);
    let written = write_outputs(&report, &args.outdir, data_format)?;

    match format {
        OutputFormat::Text => print_text_summary(&report, &written),
        OutputFormat::Json => println!("{}", report.to_json()?),
        OutputFormat::Tsv => print_tsv_general_stats(&report.modules),
    }

    Ok(())
}

fn load_config(args: &RunArgs) -> anyhow::Result<RunConfig> {
    let mut config = match &args.config {
        Some(path) => RunConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => RunConfig::default(),
    };
    config
        .ignore_samples
        .extend(args.ignore_samples.iter().cloned());
    if let Some(limit) = args.filesize_limit {
        config.filesize_limit = limit;
    }
    Ok(config)
}

/// Write the report and every module's data files, returning the paths written
fn write_outputs(
    report: &RunReport,
    outdir: &Path,
    format: DataFormat,
) -> anyhow::Result<Vec<PathBuf>> {
    let data_dir = outdir.join(DATA_DIR_NAME);
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("Failed to create {}", data_dir.display()))?;

    let report_path = outdir.join(REPORT_FILE_NAME);
    std::fs::write(&report_path, report.to_json()?)
        .with_context(|| format!("Failed to write {}", report_path.display()))?;

    let mut written = vec![report_path];
    for module in &report.modules {
        for data_file in &module.data_files {
            written.push(data_file.write(&data_dir, format)?);
        }
    }
    Ok(written)
}

fn print_text_summary(report: &RunReport, written: &[PathBuf]) {
    if report.modules.is_empty() {
        println!("No reports found.");
    }
    for module in &report.modules {
        println!("{}: {} sample(s)", module.name, module.samples.len());
        for section in &module.sections {
            println!("   - {}", section.name);
        }
    }
    println!();
    for path in written {
        println!("Wrote {}", path.display());
    }
}

/// General statistics in long form: one line per module, sample and column
fn print_tsv_general_stats(modules: &[ModuleReport]) {
    println!("module\tsample\tcolumn\tvalue");
    for module in modules {
        for block in &module.general_stats {
            for (sample, row) in &block.data {
                for (column, value) in row {
                    println!("{}\t{sample}\t{column}\t{value}", block.namespace);
                }
            }
        }
    }
}
