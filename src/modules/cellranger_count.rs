use std::collections::{BTreeMap, BTreeSet};

use crate::core::diagnostics::Diagnostics;
use crate::core::report::{
    table_from_stats, table_from_warnings, DataFile, DataSource, GeneralStatsBlock, ModuleReport,
    Plot, Section,
};
use crate::core::types::{PlotDefinition, PlotSeries, StatsTable, WarningSet};
use crate::discovery::{DiscoveryError, LogFile, SearchPattern};
use crate::modules::{read_count_header, ReportModule, RunContext};
use crate::parsing::cellranger::{
    parse_count_report, CountExtraction, CountHeaders, CountPlot, DATA_MARKER,
};
use crate::parsing::ParseError;

pub const NAMESPACE: &str = "Cell Ranger Count";

const GENERAL_HIDDEN: &[&str] = &["Q30 bc", "Q30 UMI", "Q30 read"];

const STATS_HIDDEN: &[&str] = &[
    "Q30 bc",
    "Q30 UMI",
    "Q30 read",
    "reads in cells",
    "avg reads/cell",
    "confident reads",
    "confident transcriptome",
    "confident intronic",
    "confident intergenic",
    "reads antisense",
    "saturation",
];

/// Cell Ranger count `web_summary.html` reports
#[derive(Debug, Clone, Copy, Default)]
pub struct CellRangerCount;

/// Per-run state of the Cell Ranger count module
#[derive(Debug, Default)]
pub struct CountAccumulator {
    pub headers: CountHeaders,
    pub stats: StatsTable,
    pub general_stats: StatsTable,
    pub warnings: WarningSet,
    /// Replaced wholesale by every accepted report
    pub plot_definitions: BTreeMap<CountPlot, PlotDefinition>,
    pub plot_series: BTreeMap<CountPlot, PlotSeries>,
    pub sources: Vec<DataSource>,
}

impl CountAccumulator {
    /// Parse one report and fold it into the run. Errors are reported, not returned.
    pub fn add_file(&mut self, file: &LogFile, ctx: &RunContext<'_>) {
        let result = file
            .open()
            .map_err(ParseError::from)
            .and_then(|reader| {
                parse_count_report(reader, &file.root, &ctx.cleaner, &mut self.headers)
            });

        match result {
            Ok(extraction) => self.add(file, extraction, ctx.diagnostics),
            Err(e) => ctx.diagnostics.warning(&format!(
                "Could not parse Cell Ranger count report {}: {e}",
                file.path.display()
            )),
        }
    }

    /// Fold one extraction into the run.
    ///
    /// Reports without statistics are ignored. A repeated sample name replaces
    /// the earlier sample's tables and warnings.
    pub fn add(
        &mut self,
        file: &LogFile,
        extraction: CountExtraction,
        diagnostics: &dyn Diagnostics,
    ) {
        let CountExtraction {
            sample,
            general_stats,
            stats,
            warnings,
            warning_headers,
            plot_definitions,
            plot_series,
        } = extraction;

        if stats.is_empty() {
            diagnostics.debug(&format!("No statistics found in {}", file.file_name));
            return;
        }

        if self.general_stats.contains_key(&sample) {
            diagnostics.debug(&format!(
                "Duplicate sample name found in {}! Overwriting: {sample}",
                file.file_name
            ));
        }

        self.sources.retain(|s| s.sample != sample);
        self.sources.push(DataSource {
            module: "cellranger".to_string(),
            section: Some("count".to_string()),
            sample: sample.clone(),
            path: file.path.clone(),
        });

        self.stats.insert(sample.clone(), stats);
        self.general_stats.insert(sample.clone(), general_stats);
        if warnings.is_empty() {
            self.warnings.remove(&sample);
        } else {
            self.warnings.insert(sample.clone(), warnings);
        }
        for (key, header) in warning_headers.iter() {
            self.headers.warnings.set(key, header.clone());
        }

        self.plot_definitions = plot_definitions;
        for (kind, series) in plot_series {
            self.plot_series.entry(kind).or_default().extend(series);
        }
    }

    /// Apply the ignore list, finalize headers, and build the report
    pub fn finish(mut self, ctx: &RunContext<'_>) -> Option<ModuleReport> {
        ctx.filter.retain(&mut self.stats);
        ctx.filter.retain(&mut self.general_stats);
        ctx.filter.retain(&mut self.warnings);
        for series in self.plot_series.values_mut() {
            ctx.filter.retain(series);
        }
        self.sources.retain(|s| !ctx.filter.is_ignored(&s.sample));

        // Alarms of overwritten or ignored samples leave no column behind
        let raised: BTreeSet<&str> = self
            .warnings
            .values()
            .flat_map(|alarms| alarms.keys().map(String::as_str))
            .collect();
        self.headers.warnings.retain(|key| raised.contains(key));

        let reads_description = "Number of reads";
        self.headers.general.set(
            "reads",
            read_count_header("count_genstats_reads", "Reads", reads_description, ctx.config)
                .with_shared_key("read_count")
                .with_namespace(NAMESPACE),
        );
        self.headers.general.hide(GENERAL_HIDDEN);
        self.headers.stats.set(
            "reads",
            read_count_header("count_data_reads", "Reads", reads_description, ctx.config),
        );
        self.headers.stats.hide(STATS_HIDDEN);

        if self.general_stats.is_empty() {
            return None;
        }

        let mut report = ModuleReport::new("Cell Ranger", "cellranger").with_info(
            "https://support.10xgenomics.com/single-cell-gene-expression/software/pipelines/latest/what-is-cell-ranger",
            "Analysis pipelines that process Chromium single-cell data.",
        );
        report.samples = self.general_stats.keys().cloned().collect();
        report.sources = self.sources;

        report.general_stats.push(GeneralStatsBlock {
            namespace: NAMESPACE.to_string(),
            data: table_from_stats(&self.general_stats),
            headers: self.headers.general,
        });

        report.data_files.push(DataFile::new(
            "multiqc_cellranger_count",
            table_from_stats(&self.stats),
        ));

        if !self.warnings.is_empty() {
            report.sections.push(Section {
                name: "Count - Warnings".to_string(),
                anchor: "cellranger-count-warnings".to_string(),
                description: "Warnings encountered during the analysis".to_string(),
                helptext: String::new(),
                plot: Plot::Table {
                    data: table_from_warnings(&self.warnings),
                    headers: self.headers.warnings,
                    namespace: Some(NAMESPACE.to_string()),
                },
            });
        }

        report.sections.push(Section {
            name: "Count - Summary stats".to_string(),
            anchor: "cellranger-count-stats".to_string(),
            description: "Summary QC metrics from Cell Ranger count".to_string(),
            helptext: String::new(),
            plot: Plot::Table {
                data: table_from_stats(&self.stats),
                headers: self.headers.stats,
                namespace: Some(NAMESPACE.to_string()),
            },
        });

        for kind in CountPlot::ALL {
            let Some(definition) = self.plot_definitions.remove(&kind) else {
                continue;
            };
            let series = self.plot_series.remove(&kind).unwrap_or_default();
            report.sections.push(Section {
                name: kind.section_name().to_string(),
                anchor: kind.anchor().to_string(),
                description: definition.description,
                helptext: definition.helptext,
                plot: Plot::LineGraph {
                    series,
                    config: definition.config,
                },
            });
        }

        Some(report)
    }
}

impl ReportModule for CellRangerCount {
    fn name(&self) -> &'static str {
        "Cell Ranger count"
    }

    fn search_pattern(&self) -> Result<SearchPattern, DiscoveryError> {
        Ok(SearchPattern::new("*.html")?.with_contents(DATA_MARKER))
    }

    fn run(&self, files: &[LogFile], ctx: &RunContext<'_>) -> Option<ModuleReport> {
        let mut acc = CountAccumulator::default();
        for file in files {
            acc.add_file(file, ctx);
        }
        acc.finish(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RunConfig;
    use crate::core::diagnostics::{Level, MemoryDiagnostics};
    use crate::core::types::{HeaderMeta, HeaderRegistry, PlotConfig, SampleStats};

    fn extraction(sample: &str, reads: f64, alarms: &[&str]) -> CountExtraction {
        let mut stats = SampleStats::new();
        stats.insert("reads".to_string(), reads);
        let mut warning_headers = HeaderRegistry::new();
        for alarm in alarms {
            warning_headers.set(*alarm, HeaderMeta::new(*alarm, *alarm, "alarm"));
        }
        CountExtraction {
            sample: sample.to_string(),
            general_stats: stats.clone(),
            stats,
            warnings: alarms
                .iter()
                .map(|a| ((*a).to_string(), "FAIL".to_string()))
                .collect(),
            warning_headers,
            plot_definitions: BTreeMap::new(),
            plot_series: BTreeMap::new(),
        }
    }

    fn warning_columns(report: &ModuleReport) -> Vec<String> {
        match report.section("cellranger-count-warnings").map(|s| &s.plot) {
            Some(Plot::Table { headers, .. }) => headers.keys().map(String::from).collect(),
            _ => Vec::new(),
        }
    }

    #[test]
    fn test_rejected_report_registers_no_warning_columns() {
        let config = RunConfig::default();
        let diag = MemoryDiagnostics::new();
        let ctx = RunContext::new(&config, &diag).unwrap();
        let file = LogFile::new("/runs/a/web_summary.html");

        let mut acc = CountAccumulator::default();
        let mut empty = extraction("s0", 0.0, &["empty_alarm"]);
        empty.stats.clear();
        acc.add(&file, empty, &diag);
        acc.add(&file, extraction("s1", 10.0, &["low_cells"]), &diag);

        let report = acc.finish(&ctx).unwrap();
        assert_eq!(warning_columns(&report), vec!["low_cells"]);
    }

    #[test]
    fn test_overwritten_alarms_leave_no_column() {
        let config = RunConfig::default();
        let diag = MemoryDiagnostics::new();
        let ctx = RunContext::new(&config, &diag).unwrap();
        let file = LogFile::new("/runs/a/web_summary.html");

        let mut acc = CountAccumulator::default();
        acc.add(&file, extraction("s1", 10.0, &["low_cells"]), &diag);
        acc.add(&file, extraction("s2", 10.0, &["low_reads"]), &diag);
        acc.add(&file, extraction("s1", 20.0, &[]), &diag);

        let report = acc.finish(&ctx).unwrap();
        assert_eq!(warning_columns(&report), vec!["low_reads"]);
    }

    #[test]
    fn test_duplicate_sample_keeps_one_source() {
        let diag = MemoryDiagnostics::new();
        let mut acc = CountAccumulator::default();

        acc.add(
            &LogFile::new("/runs/a/web_summary.html"),
            extraction("s1", 10.0, &[]),
            &diag,
        );
        acc.add(
            &LogFile::new("/runs/b/web_summary.html"),
            extraction("s1", 20.0, &[]),
            &diag,
        );

        assert_eq!(acc.sources.len(), 1);
        assert_eq!(
            acc.sources[0].path,
            std::path::PathBuf::from("/runs/b/web_summary.html")
        );
    }

    #[test]
    fn test_duplicate_sample_overwrites() {
        let diag = MemoryDiagnostics::new();
        let mut acc = CountAccumulator::default();
        let file = LogFile::new("/runs/a/web_summary.html");

        acc.add(&file, extraction("s1", 10.0, &["low_cells"]), &diag);
        acc.add(&file, extraction("s1", 20.0, &[]), &diag);

        assert_eq!(acc.stats.len(), 1);
        assert!((acc.stats["s1"]["reads"] - 20.0).abs() < f64::EPSILON);
        assert!((acc.general_stats["s1"]["reads"] - 20.0).abs() < f64::EPSILON);
        assert!(acc.warnings.is_empty());

        let debug = diag.at(Level::Debug);
        assert_eq!(debug.len(), 1);
        assert!(debug[0].contains("Duplicate sample name"));
        assert!(debug[0].contains("s1"));
    }

    fn knee_definition(title: &str) -> PlotDefinition {
        PlotDefinition {
            config: PlotConfig {
                id: "mqc_cellranger_count_bc_knee".to_string(),
                title: title.to_string(),
                xlab: "Barcodes".to_string(),
                ylab: "UMI counts".to_string(),
                x_log: true,
                y_log: true,
                ymin: None,
                ymax: None,
            },
            description: String::new(),
            helptext: String::new(),
        }
    }

    #[test]
    fn test_plot_config_last_write_wins() {
        let diag = MemoryDiagnostics::new();
        let mut acc = CountAccumulator::default();
        let file = LogFile::new("/runs/a/web_summary.html");

        let mut first = extraction("s1", 10.0, &[]);
        first
            .plot_definitions
            .insert(CountPlot::BarcodeRank, knee_definition("first"));
        first.plot_series.insert(
            CountPlot::BarcodeRank,
            PlotSeries::from([("s1".to_string(), vec![(1.0, 100.0)])]),
        );
        let mut second = extraction("s2", 10.0, &[]);
        second
            .plot_definitions
            .insert(CountPlot::BarcodeRank, knee_definition("second"));
        second.plot_series.insert(
            CountPlot::BarcodeRank,
            PlotSeries::from([("s2".to_string(), vec![(1.0, 50.0)])]),
        );

        acc.add(&file, first, &diag);
        acc.add(&file, second, &diag);

        assert_eq!(
            acc.plot_definitions[&CountPlot::BarcodeRank].config.title,
            "second"
        );
        assert_eq!(acc.plot_series[&CountPlot::BarcodeRank].len(), 2);

        // A later report without plots drops the earlier definitions
        acc.add(&file, extraction("s3", 10.0, &[]), &diag);
        assert!(acc.plot_definitions.is_empty());
    }

    #[test]
    fn test_empty_extraction_contributes_nothing() {
        let diag = MemoryDiagnostics::new();
        let mut acc = CountAccumulator::default();
        let mut empty = extraction("s1", 0.0, &["low_cells"]);
        empty.stats.clear();

        acc.add(&LogFile::new("/runs/a/web_summary.html"), empty, &diag);
        assert!(acc.stats.is_empty());
        assert!(acc.warnings.is_empty());
        assert!(acc.sources.is_empty());
    }

    #[test]
    fn test_finish_without_samples() {
        let config = RunConfig::default();
        let diag = MemoryDiagnostics::new();
        let ctx = RunContext::new(&config, &diag).unwrap();
        assert!(CountAccumulator::default().finish(&ctx).is_none());
    }

    #[test]
    fn test_finish_applies_ignore_list_and_headers() {
        let config = RunConfig {
            ignore_samples: vec!["neg*".to_string()],
            ..RunConfig::default()
        };
        let diag = MemoryDiagnostics::new();
        let ctx = RunContext::new(&config, &diag).unwrap();

        let mut acc = CountAccumulator::default();
        let file = LogFile::new("/runs/a/web_summary.html");
        acc.add(&file, extraction("s1", 10.0, &[]), &diag);
        acc.add(&file, extraction("neg_ctrl", 5.0, &["low_cells"]), &diag);

        let report = acc.finish(&ctx).unwrap();
        assert_eq!(report.samples.len(), 1);
        assert!(report.samples.contains("s1"));
        assert_eq!(report.sources.len(), 1);
        assert!(report.section("cellranger-count-warnings").is_none());

        let reads = report.general_stats[0].headers.get("reads").unwrap();
        assert_eq!(reads.title, "M Reads");
        assert_eq!(reads.shared_key.as_deref(), Some("read_count"));
        assert_eq!(reads.multiplier, Some(0.000_001));
    }
}
