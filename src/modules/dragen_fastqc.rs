use std::collections::BTreeMap;

use crate::core::diagnostics::Diagnostics;
use crate::core::report::{
    table_from_stats, DataFile, DataSource, GeneralStatsBlock, ModuleReport, Plot, Section,
};
use crate::core::types::{
    HeaderMeta, HeaderRegistry, PlotConfig, PlotSeries, QuantilePlot, StatsTable,
};
use crate::discovery::{DiscoveryError, LogFile, SearchPattern};
use crate::modules::{ReportModule, RunContext};
use crate::parsing::dragen_fastqc::{
    mean_quality_by_position, parse_fastqc_metrics, quality_quantiles_by_position,
    sample_from_file_name, FastqcMetrics, FILE_SUFFIX, GC_CONTENT_GROUP,
};
use crate::parsing::ParseError;

pub const NAMESPACE: &str = "DRAGEN FastQC";

const GC_KEY: &str = "avg_gc_content_percent";

const MEAN_QUALITY_HELP: &str = "\
To enable multiple samples to be plotted on the same graph, only the mean quality \
scores are plotted (unlike the box plots seen in FastQC reports).

Taken from the [FastQC help](http://www.bioinformatics.babraham.ac.uk/projects/fastqc/Help/3%20Analysis%20Modules/2%20Per%20Base%20Sequence%20Quality.html):

_The y-axis on the graph shows the quality scores. The higher the score, the better \
the base call. The background of the graph divides the y axis into very good quality \
calls (green), calls of reasonable quality (orange), and calls of poor quality (red). \
The quality of calls on most platforms will degrade as the run progresses, so it is \
common to see base calls falling into the orange area towards the end of a read._";

/// DRAGEN `*.fastqc_metrics.csv` files
#[derive(Debug, Clone, Copy, Default)]
pub struct DragenFastqc;

/// Per-run state of the DRAGEN FastQC module
#[derive(Debug, Default)]
pub struct FastqcAccumulator {
    pub stats: StatsTable,
    /// Sample -> read mate -> mean quality by position
    pub mean_quality: BTreeMap<String, PlotSeries>,
    /// Sample -> read mate -> quality quantiles by position
    pub quality_ranges: BTreeMap<String, QuantilePlot>,
    pub sources: Vec<DataSource>,
}

impl FastqcAccumulator {
    /// Parse one metrics file and fold it into the run
    pub fn add_file(&mut self, file: &LogFile, ctx: &RunContext<'_>) {
        let Some(raw_sample) = sample_from_file_name(&file.file_name) else {
            ctx.diagnostics
                .debug(&format!("Not a FastQC metrics file: {}", file.file_name));
            return;
        };
        let sample = ctx.cleaner.clean(raw_sample, &file.root);

        let metrics = match file
            .open()
            .map_err(ParseError::from)
            .and_then(parse_fastqc_metrics)
        {
            Ok(metrics) => metrics,
            Err(e) => {
                ctx.diagnostics.warning(&format!(
                    "Could not read DRAGEN FastQC metrics {}: {e}",
                    file.path.display()
                ));
                return;
            }
        };
        self.add(file, &sample, &metrics, ctx.diagnostics);
    }

    /// Fold the metrics of one sample into the run.
    ///
    /// A sample without any GC-content rows is dropped.
    pub fn add(
        &mut self,
        file: &LogFile,
        sample: &str,
        metrics: &FastqcMetrics,
        diagnostics: &dyn Diagnostics,
    ) {
        let Some(gc) = metrics.gc_content_percent() else {
            diagnostics.debug(&format!(
                "No {GC_CONTENT_GROUP} rows in {}, skipping {sample}",
                file.file_name
            ));
            return;
        };

        if self.stats.contains_key(sample) {
            diagnostics.debug(&format!(
                "Duplicate sample name found in {}! Overwriting: {sample}",
                file.file_name
            ));
        }

        self.stats
            .insert(sample.to_string(), BTreeMap::from([(GC_KEY.to_string(), gc)]));

        let by_mate: PlotSeries = metrics
            .positional
            .iter()
            .map(|(mate, tables)| (mate.clone(), mean_quality_by_position(tables)))
            .filter(|(_, series)| !series.is_empty())
            .collect();
        self.mean_quality.insert(sample.to_string(), by_mate);

        let ranges: QuantilePlot = metrics
            .positional
            .iter()
            .map(|(mate, tables)| (mate.clone(), quality_quantiles_by_position(tables)))
            .filter(|(_, series)| !series.is_empty())
            .collect();
        self.quality_ranges.insert(sample.to_string(), ranges);

        self.sources.retain(|s| s.sample != sample);
        self.sources.push(DataSource {
            module: "dragen_fastqc".to_string(),
            section: Some("stats".to_string()),
            sample: sample.to_string(),
            path: file.path.clone(),
        });
    }

    pub fn finish(mut self, ctx: &RunContext<'_>) -> Option<ModuleReport> {
        ctx.filter.retain(&mut self.stats);
        ctx.filter.retain(&mut self.mean_quality);
        ctx.filter.retain(&mut self.quality_ranges);
        self.sources.retain(|s| !ctx.filter.is_ignored(&s.sample));

        if self.stats.is_empty() {
            return None;
        }

        let mut report = ModuleReport::new(NAMESPACE, "dragen-fastqc").with_info(
            "https://support.illumina.com/sequencing/sequencing_software/dragen-bio-it-platform.html",
            "Illumina Bio-IT Platform that uses FPGA for secondary analysis of sequencing data.",
        );
        report.samples = self.stats.keys().cloned().collect();
        report.sources = self.sources;

        report.general_stats.push(GeneralStatsBlock {
            namespace: NAMESPACE.to_string(),
            data: table_from_stats(&self.stats),
            headers: gc_headers(),
        });
        report
            .data_files
            .push(DataFile::new("dragen_fastqc", table_from_stats(&self.stats)));

        let ranges: QuantilePlot = self
            .quality_ranges
            .into_iter()
            .flat_map(|(sample, by_mate)| {
                by_mate
                    .into_iter()
                    .map(move |(mate, points)| (format!("{sample}_{mate}"), points))
            })
            .collect();
        if !ranges.is_empty() {
            report.sections.push(Section {
                name: "Per-Position Quality Score Ranges".to_string(),
                anchor: "fastqc_pos_qual_ranges".to_string(),
                description:
                    "The range of quality value across each base position in each sample or read"
                        .to_string(),
                helptext: String::new(),
                plot: Plot::BoxPlot {
                    data: ranges,
                    config: PlotConfig {
                        id: "fastqc_per_base_sequence_quality_range_plot".to_string(),
                        title: "DRAGEN-QC: Per-Position Quality Range".to_string(),
                        xlab: "Position (bp)".to_string(),
                        ylab: "Phred Quality Score".to_string(),
                        x_log: false,
                        y_log: false,
                        ymin: Some(0.0),
                        ymax: Some(43.0),
                    },
                },
            });
        }

        let series: PlotSeries = self
            .mean_quality
            .into_iter()
            .flat_map(|(sample, by_mate)| {
                by_mate
                    .into_iter()
                    .map(move |(mate, points)| (format!("{sample}_{mate}"), points))
            })
            .collect();
        if !series.is_empty() {
            report.sections.push(Section {
                name: "Per-Position Mean Quality Scores".to_string(),
                anchor: "fastqc_per_base_sequence_quality".to_string(),
                description: "The mean quality value across each base position in the read."
                    .to_string(),
                helptext: MEAN_QUALITY_HELP.to_string(),
                plot: Plot::LineGraph {
                    series,
                    config: PlotConfig {
                        id: "fastqc_per_base_sequence_quality_plot".to_string(),
                        title: "DRAGEN-QC: Per-Position Quality Scores".to_string(),
                        xlab: "Position (bp)".to_string(),
                        ylab: "Phred Quality Score".to_string(),
                        x_log: false,
                        y_log: false,
                        ymin: Some(0.0),
                        ymax: None,
                    },
                },
            });
        }

        Some(report)
    }
}

fn gc_headers() -> HeaderRegistry {
    let mut header = HeaderMeta::new(GC_KEY, "% GC", "Average % GC Content")
        .with_scale("Set1")
        .with_namespace(NAMESPACE);
    header.min = Some(0.0);
    header.max = Some(100.0);
    header.suffix = Some("%".to_string());
    header.number_format = Some("{:,.0f}".to_string());

    let mut headers = HeaderRegistry::new();
    headers.register(GC_KEY, header);
    headers
}

impl ReportModule for DragenFastqc {
    fn name(&self) -> &'static str {
        NAMESPACE
    }

    fn search_pattern(&self) -> Result<SearchPattern, DiscoveryError> {
        SearchPattern::new(&format!("*{FILE_SUFFIX}"))
    }

    fn run(&self, files: &[LogFile], ctx: &RunContext<'_>) -> Option<ModuleReport> {
        let mut acc = FastqcAccumulator::default();
        for file in files {
            acc.add_file(file, ctx);
        }
        acc.finish(ctx)
    }
}
