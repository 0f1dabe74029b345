//! Inspect command - run one extractor over one report file.
//!
//! Useful for checking what a single report yields before a full run.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::Args;
use serde::Serialize;

use crate::cli::OutputFormat;
use crate::config::RunConfig;
use crate::core::diagnostics::TracingDiagnostics;
use crate::core::sample::SampleNameCleaner;
use crate::core::types::{PlotSeries, SampleStats};
use crate::discovery::LogFile;
use crate::parsing::cellranger::{parse_count_report, CountHeaders};
use crate::parsing::dragen_fastqc::{
    mean_quality_by_position, parse_fastqc_metrics, sample_from_file_name, FILE_SUFFIX,
};
use crate::parsing::humid::{parse_stats_file, STATS_FILE_NAME};

/// Kind of report to extract
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ReportKind {
    CellrangerCount,
    DragenFastqc,
    Humid,
}

impl ReportKind {
    /// Guess the kind from a file name
    #[must_use]
    pub fn detect(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_string_lossy();
        if name == STATS_FILE_NAME {
            Some(Self::Humid)
        } else if name.ends_with(FILE_SUFFIX) {
            Some(Self::DragenFastqc)
        } else if name.to_lowercase().ends_with(".html") {
            Some(Self::CellrangerCount)
        } else {
            None
        }
    }
}

#[derive(Args)]
pub struct InspectArgs {
    /// Report file to extract
    #[arg(required = true)]
    pub input: PathBuf,

    /// Report kind (auto-detected from the file name by default)
    #[arg(long, value_enum)]
    pub kind: Option<ReportKind>,

    /// JSON configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

/// What one report yielded
#[derive(Debug, Serialize)]
pub struct Inspection {
    pub file: PathBuf,
    pub kind: ReportKind,
    pub sample: String,
    pub stats: SampleStats,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub warnings: BTreeMap<String, String>,
    /// Plot or read name -> points
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub series: PlotSeries,
}

/// Execute the inspect command
///
/// # Errors
///
/// Returns an error if the kind cannot be determined or the file yields no data.
#[allow(clippy::needless_pass_by_value)] // CLI entry point, values from clap
pub fn run(args: InspectArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    let Some(kind) = args.kind.or_else(|| ReportKind::detect(&args.input)) else {
        bail!(
            "Cannot tell the report kind of {}; use --kind",
            args.input.display()
        );
    };
    if verbose {
        eprintln!("Inspecting {} as {kind:?}", args.input.display());
    }

    let config = match &args.config {
        Some(path) => RunConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => RunConfig::default(),
    };
    let cleaner = SampleNameCleaner::from_config(&config);
    let inspection = inspect(&LogFile::new(&args.input), kind, &cleaner)?;

    match format {
        OutputFormat::Text => print_text(&inspection),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&inspection)?),
        OutputFormat::Tsv => print_tsv(&inspection),
    }
    Ok(())
}

/// Extract one file
///
/// # Errors
///
/// Returns an error if the file cannot be read or holds no usable data.
pub fn inspect(
    file: &LogFile,
    kind: ReportKind,
    cleaner: &SampleNameCleaner,
) -> anyhow::Result<Inspection> {
    let reader = file
        .open()
        .with_context(|| format!("Failed to open {}", file.path.display()))?;

    let mut inspection = Inspection {
        file: file.path.clone(),
        kind,
        sample: String::new(),
        stats: SampleStats::new(),
        warnings: BTreeMap::new(),
        series: PlotSeries::new(),
    };

    match kind {
        ReportKind::CellrangerCount => {
            let mut headers = CountHeaders::default();
            let extraction = parse_count_report(reader, &file.root, cleaner, &mut headers)?;
            inspection.series = extraction
                .plot_series
                .into_iter()
                .filter_map(|(plot, mut series)| {
                    let points = series.remove(&extraction.sample)?;
                    Some((plot.anchor().to_string(), points))
                })
                .collect();
            inspection.sample = extraction.sample;
            inspection.stats = extraction.stats;
            inspection.warnings = extraction.warnings;
        }
        ReportKind::DragenFastqc => {
            let raw = sample_from_file_name(&file.file_name).unwrap_or(&file.file_name);
            inspection.sample = cleaner.clean(raw, &file.root);
            let metrics = parse_fastqc_metrics(reader)?;
            let Some(gc) = metrics.gc_content_percent() else {
                bail!("No GC content rows in {}", file.path.display());
            };
            inspection
                .stats
                .insert("avg_gc_content_percent".to_string(), gc);
            inspection.series = metrics
                .positional
                .iter()
                .map(|(mate, tables)| (mate.clone(), mean_quality_by_position(tables)))
                .filter(|(_, points)| !points.is_empty())
                .collect();
        }
        ReportKind::Humid => {
            inspection.sample = cleaner.clean(&file.root.to_string_lossy(), &file.root);
            let Some(record) = parse_stats_file(reader, &inspection.sample, &TracingDiagnostics)?
            else {
                bail!("HUMID statistics in {} do not add up", file.path.display());
            };
            #[allow(clippy::cast_precision_loss)] // read counts stay well below 2^53
            let stats = record.into_iter().map(|(k, v)| (k, v as f64)).collect();
            inspection.stats = stats;
        }
    }

    Ok(inspection)
}

fn print_text(inspection: &Inspection) {
    println!("Sample: {}", inspection.sample);
    println!("File: {}", inspection.file.display());
    println!();
    println!("Statistics:");
    for (key, value) in &inspection.stats {
        println!("   {key}: {value}");
    }
    if !inspection.warnings.is_empty() {
        println!("\nWarnings:");
        for (alarm, status) in &inspection.warnings {
            println!("   {alarm}: {status}");
        }
    }
    if !inspection.series.is_empty() {
        println!("\nPlots:");
        for (name, points) in &inspection.series {
            println!("   {name}: {} point(s)", points.len());
        }
    }
}

fn print_tsv(inspection: &Inspection) {
    println!("sample\tkey\tvalue");
    for (key, value) in &inspection.stats {
        println!("{}\t{key}\t{value}", inspection.sample);
    }
    for (alarm, status) in &inspection.warnings {
        println!("{}\t{alarm}\t{status}", inspection.sample);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_kind() {
        assert_eq!(
            ReportKind::detect(Path::new("/a/lib1/stats.dat")),
            Some(ReportKind::Humid)
        );
        assert_eq!(
            ReportKind::detect(Path::new("HG002.fastqc_metrics.csv")),
            Some(ReportKind::DragenFastqc)
        );
        assert_eq!(
            ReportKind::detect(Path::new("outs/web_summary.html")),
            Some(ReportKind::CellrangerCount)
        );
        assert_eq!(ReportKind::detect(Path::new("notes.txt")), None);
    }

    #[test]
    fn test_inspect_humid() {
        let dir = tempfile::tempdir().unwrap();
        let lib = dir.path().join("lib1");
        std::fs::create_dir_all(&lib).unwrap();
        std::fs::write(lib.join("stats.dat"), "total: 10\nusable: 8\nclusters: 7\n").unwrap();

        let inspection = inspect(
            &LogFile::new(lib.join("stats.dat")),
            ReportKind::Humid,
            &SampleNameCleaner::default(),
        )
        .unwrap();
        assert_eq!(inspection.sample, "lib1");
        assert!((inspection.stats["duplicates"] - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_inspect_dragen_without_gc_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("S1.fastqc_metrics.csv");
        std::fs::write(&path, "READ MEAN QUALITY,Read1,Q30 Reads,5\n").unwrap();

        let result = inspect(
            &LogFile::new(path),
            ReportKind::DragenFastqc,
            &SampleNameCleaner::default(),
        );
        assert!(result.is_err());
    }
}
