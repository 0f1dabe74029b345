use std::collections::BTreeMap;

use crate::core::diagnostics::Diagnostics;
use crate::core::report::{
    BarGraphConfig, Cell, DataFile, DataSource, GeneralStatsBlock, ModuleReport, Plot, Section,
    TableData,
};
use crate::core::types::{BarCategory, HeaderRegistry};
use crate::discovery::{DiscoveryError, LogFile, SearchPattern};
use crate::modules::{read_count_header, ReportModule, RunContext};
use crate::parsing::humid::{parse_stats_file, RawStatsRecord, STATS_FILE_NAME};
use crate::parsing::ParseError;

pub const NAMESPACE: &str = "HUMID";

const SECTION_HELP: &str = "\
- **Unique reads** are the reads that are left over after deduplication.
- **Duplicate reads** are the reads that were determined to be duplicates of the **Unique reads**.
- **Filtered reads** were reads that could not be analysed, due to N nucleotides, or because the UMI or sequences were too short to use.";

/// HUMID `stats.dat` files
#[derive(Debug, Clone, Copy, Default)]
pub struct Humid;

/// Per-run state of the HUMID module: sample -> reconciled counts
#[derive(Debug, Default)]
pub struct HumidAccumulator {
    pub stats: BTreeMap<String, RawStatsRecord>,
    pub sources: Vec<DataSource>,
}

impl HumidAccumulator {
    /// Parse one statistics file, naming the sample after its directory
    pub fn add_file(&mut self, file: &LogFile, ctx: &RunContext<'_>) {
        let sample = ctx
            .cleaner
            .clean(&file.root.to_string_lossy(), &file.root);

        let parsed = file
            .open()
            .map_err(ParseError::from)
            .and_then(|reader| parse_stats_file(reader, &sample, ctx.diagnostics));
        match parsed {
            Ok(Some(record)) => self.add(file, sample, record, ctx.diagnostics),
            Ok(None) => {}
            Err(e) => ctx.diagnostics.warning(&format!(
                "Could not read HUMID stats {}: {e}",
                file.path.display()
            )),
        }
    }

    /// Fold one reconciled record into the run; later samples overwrite earlier ones
    pub fn add(
        &mut self,
        file: &LogFile,
        sample: String,
        record: RawStatsRecord,
        diagnostics: &dyn Diagnostics,
    ) {
        if self.stats.contains_key(&sample) {
            diagnostics.debug(&format!(
                "Duplicate sample name found in {}! Overwriting: {sample}",
                file.path.display()
            ));
        }
        self.sources.retain(|s| s.sample != sample);
        self.sources.push(DataSource {
            module: "humid".to_string(),
            section: None,
            sample: sample.clone(),
            path: file.path.clone(),
        });
        self.stats.insert(sample, record);
    }

    pub fn finish(mut self, ctx: &RunContext<'_>) -> Option<ModuleReport> {
        ctx.filter.retain(&mut self.stats);
        self.sources.retain(|s| !ctx.filter.is_ignored(&s.sample));

        if self.stats.is_empty() {
            return None;
        }

        let mut report = ModuleReport::new(NAMESPACE, "humid").with_info(
            "https://github.com/jfjlaros/HUMID",
            "HUMID is a tool to quickly and easily remove duplicate reads from FastQ files, with or without UMIs.",
        );
        report.samples = self.stats.keys().cloned().collect();
        report.sources = self.sources;

        let rows: TableData = self
            .stats
            .iter()
            .map(|(sample, record)| {
                let cells = record
                    .iter()
                    .map(|(field, value)| (field.clone(), Cell::from(*value)))
                    .collect();
                (sample.clone(), cells)
            })
            .collect();

        let general: TableData = self
            .stats
            .iter()
            .filter_map(|(sample, record)| {
                let clusters = *record.get("clusters")?;
                Some((
                    sample.clone(),
                    BTreeMap::from([("uniq".to_string(), Cell::from(clusters))]),
                ))
            })
            .collect();

        let mut headers = HeaderRegistry::new();
        headers.register(
            "uniq",
            read_count_header(
                "humid_uniq",
                "Unique",
                "Number of unique reads after UMI deduplication",
                ctx.config,
            )
            .with_shared_key("read_count"),
        );
        report.general_stats.push(GeneralStatsBlock {
            namespace: NAMESPACE.to_string(),
            data: general,
            headers,
        });

        report.data_files.push(DataFile::new("multiqc_humid", rows.clone()));

        report.sections.push(Section {
            name: "Duplication Summary".to_string(),
            anchor: "humid-section".to_string(),
            description: "Duplication statistics per sample. Every read in the input data has \
                          been assigned to one of the three categories shown here."
                .to_string(),
            helptext: SECTION_HELP.to_string(),
            plot: Plot::BarGraph {
                data: rows,
                categories: vec![
                    BarCategory::new("clusters", "Unique reads"),
                    BarCategory::new("duplicates", "Duplicate reads"),
                    BarCategory::new("filtered", "Filtered reads"),
                ],
                config: BarGraphConfig {
                    id: "humid-bargraph".to_string(),
                    title: "HUMID: Deduplication results".to_string(),
                    ylab: "Number of reads".to_string(),
                    hide_zero_cats: false,
                },
            },
        });

        Some(report)
    }
}

impl ReportModule for Humid {
    fn name(&self) -> &'static str {
        NAMESPACE
    }

    fn search_pattern(&self) -> Result<SearchPattern, DiscoveryError> {
        SearchPattern::new(STATS_FILE_NAME)
    }

    fn run(&self, files: &[LogFile], ctx: &RunContext<'_>) -> Option<ModuleReport> {
        let mut acc = HumidAccumulator::default();
        for file in files {
            acc.add_file(file, ctx);
        }
        acc.finish(ctx)
    }
}
