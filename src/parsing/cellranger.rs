//! Parser for Cell Ranger count `web_summary.html` reports.
//!
//! The report embeds all of its data in a single line of the form
//! `const data = {...}`. The JSON models the tabs of the web summary:
//!
//! ```text
//! summary
//! ├── sample.id
//! ├── summary_tab
//! │   ├── cells       { table.rows, help.data, barcode_knee_plot }
//! │   ├── sequencing  { table.rows }
//! │   └── mapping     { table.rows }
//! ├── alarms.alarms   [ { id, title } ]
//! └── analysis_tab
//!     ├── median_gene_plot     { help, plot }
//!     └── seq_saturation_plot  { help, plot }
//! ```
//!
//! Table rows are `[display name, formatted value]` pairs. Only rows listed in
//! the column tables below are extracted.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::BufRead;
use std::path::Path;

use crate::core::sample::SampleNameCleaner;
use crate::core::types::{
    HeaderMeta, HeaderRegistry, PlotConfig, PlotDefinition, PlotSeries, SampleStats, FAIL_STATUS,
};
use crate::parsing::merge::{column_id, merge_rows, ColumnDef, TableRow};
use crate::parsing::plots::{knee_series, xy_series, Curve};
use crate::parsing::ParseError;

/// Prefix of the line holding the embedded JSON
pub const DATA_MARKER: &str = "const data";

/// Category tag of every column this parser registers
pub const CATEGORY: &str = "Count";

/// Background colour of a failed alarm cell
pub const FAIL_COLOUR: &str = "#f06807";

/// Help entry of the cells tab describing the knee plot
const BARCODE_RANK_HELP: &str = "Barcode Rank Plot";

/// General-stats columns taken from the cells table
pub const GENERAL_CELL_COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("Estimated Number of Cells", "estimated cells", Some("PuBu")),
    ColumnDef::new("Mean Reads per Cell", "avg reads/cell", Some("GnBu")),
    ColumnDef::new("Fraction Reads in Cells", "reads in cells", Some("Purples")),
];

/// General-stats columns taken from the sequencing table
pub const GENERAL_SEQUENCING_COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("Number of Reads", "reads", Some("PuBuGn")),
    ColumnDef::new("Valid Barcodes", "valid bc", Some("RdYlGn")),
    ColumnDef::new("Q30 Bases in Barcode", "Q30 bc", Some("RdYlBu")),
    ColumnDef::new("Q30 Bases in UMI", "Q30 UMI", Some("Spectral")),
    ColumnDef::new("Q30 Bases in RNA Read", "Q30 read", Some("RdBu")),
];

/// Columns of the full statistics table, taken from sequencing, cells and mapping
pub const FULL_COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("Number of Reads", "reads", Some("YlGn")),
    ColumnDef::new("Estimated Number of Cells", "estimated cells", Some("RdPu")),
    ColumnDef::new("Mean Reads per Cell", "avg reads/cell", Some("Blues")),
    ColumnDef::new("Total Genes Detected", "genes detected", Some("Greens")),
    ColumnDef::new("Median Genes per Cell", "median genes/cell", Some("Purples")),
    ColumnDef::new("Fraction Reads in Cells", "reads in cells", Some("PuBuGn")),
    ColumnDef::new("Valid Barcodes", "valid bc", Some("Spectral")),
    ColumnDef::new("Valid UMIs", "valid umi", Some("RdYlGn")),
    ColumnDef::new("Median UMI Counts per Cell", "median umi/cell", Some("YlGn")),
    ColumnDef::new("Sequencing Saturation", "saturation", Some("YlOrRd")),
    ColumnDef::new("Q30 Bases in Barcode", "Q30 bc", None),
    ColumnDef::new("Q30 Bases in UMI", "Q30 UMI", None),
    ColumnDef::new("Q30 Bases in RNA Read", "Q30 read", None),
    ColumnDef::new("Reads Mapped to Genome", "reads mapped", None),
    ColumnDef::new("Reads Mapped Confidently to Genome", "confident reads", None),
    ColumnDef::new(
        "Reads Mapped Confidently to Transcriptome",
        "confident transcriptome",
        None,
    ),
    ColumnDef::new(
        "Reads Mapped Confidently to Exonic Regions",
        "confident exonic",
        None,
    ),
    ColumnDef::new(
        "Reads Mapped Confidently to Intronic Regions",
        "confident intronic",
        None,
    ),
    ColumnDef::new(
        "Reads Mapped Confidently to Intergenic Regions",
        "confident intergenic",
        None,
    ),
    ColumnDef::new("Reads Mapped Antisense to Gene", "reads antisense", None),
];

// === Embedded report model ===

#[derive(Debug, Clone, Deserialize)]
pub struct CountReport {
    pub summary: Summary,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Summary {
    pub sample: SampleInfo,
    pub summary_tab: SummaryTab,
    #[serde(default)]
    pub alarms: Option<AlarmSection>,
    #[serde(default)]
    pub analysis_tab: Option<AnalysisTab>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SampleInfo {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SummaryTab {
    pub cells: CellsSection,
    pub sequencing: TableSection,
    pub mapping: TableSection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Table {
    pub rows: Vec<TableRow>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TableSection {
    pub table: Table,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CellsSection {
    pub table: Table,
    #[serde(default)]
    pub help: Option<HelpSection>,
    #[serde(default)]
    pub barcode_knee_plot: Option<PlotPayload>,
}

/// Help entries as `[title, [paragraph, ...]]`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HelpSection {
    #[serde(default)]
    pub data: Vec<(String, Vec<String>)>,
}

impl HelpSection {
    /// First paragraph of the entry titled `title`
    #[must_use]
    pub fn entry(&self, title: &str) -> Option<&str> {
        self.data
            .iter()
            .find(|(t, _)| t == title)
            .and_then(|(_, paragraphs)| paragraphs.first())
            .map(String::as_str)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AlarmSection {
    #[serde(default)]
    pub alarms: Vec<Alarm>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Alarm {
    pub id: String,
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalysisTab {
    #[serde(default)]
    pub median_gene_plot: Option<HelpedPlot>,
    #[serde(default)]
    pub seq_saturation_plot: Option<HelpedPlot>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HelpedPlot {
    #[serde(default)]
    pub help: PlotHelp,
    pub plot: PlotPayload,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlotHelp {
    #[serde(default)]
    pub title: String,
    #[serde(default, rename = "helpText")]
    pub help_text: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlotPayload {
    #[serde(default)]
    pub layout: Layout,
    #[serde(default)]
    pub data: Vec<Curve>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Layout {
    #[serde(default)]
    pub title: Title,
    #[serde(default)]
    pub xaxis: Axis,
    #[serde(default)]
    pub yaxis: Axis,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Axis {
    #[serde(default)]
    pub title: Title,
}

/// Plot titles are either plain strings or `{"text": ...}` objects
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(untagged)]
pub enum Title {
    Text(String),
    Rich {
        #[serde(default)]
        text: String,
    },
    #[default]
    Missing,
}

impl Title {
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::Text(text) | Self::Rich { text } => text,
            Self::Missing => "",
        }
    }
}

// === Extraction output ===

/// The line plots drawn from a count report
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CountPlot {
    BarcodeRank,
    MedianGenes,
    Saturation,
}

impl CountPlot {
    pub const ALL: [Self; 3] = [Self::BarcodeRank, Self::MedianGenes, Self::Saturation];

    #[must_use]
    pub fn section_name(self) -> &'static str {
        match self {
            Self::BarcodeRank => "Count - BC rank plot",
            Self::MedianGenes => "Count - Median genes",
            Self::Saturation => "Count - Saturation plot",
        }
    }

    #[must_use]
    pub fn anchor(self) -> &'static str {
        match self {
            Self::BarcodeRank => "cellranger-count-bcrank-plot",
            Self::MedianGenes => "cellranger-count-genes-plot",
            Self::Saturation => "cellranger-count-saturation-plot",
        }
    }
}

/// Column headers accumulated over all reports of a run
#[derive(Debug, Clone, Default)]
pub struct CountHeaders {
    pub general: HeaderRegistry,
    pub stats: HeaderRegistry,
    pub warnings: HeaderRegistry,
}

/// Everything extracted from one count report
#[derive(Debug, Clone, Serialize)]
pub struct CountExtraction {
    pub sample: String,
    pub general_stats: SampleStats,
    pub stats: SampleStats,
    /// Alarm id -> status; empty when the report raised no alarms
    pub warnings: BTreeMap<String, String>,
    /// Headers for this report's alarms; the run keeps them only if the report is accepted
    pub warning_headers: HeaderRegistry,
    pub plot_definitions: BTreeMap<CountPlot, PlotDefinition>,
    pub plot_series: BTreeMap<CountPlot, PlotSeries>,
}

/// Find the `const data` line and return the JSON text that follows the marker.
///
/// Scanning stops at the first matching line.
///
/// # Errors
///
/// Returns `ParseError::Io` if reading fails, or `ParseError::MissingMarker`
/// if no line starts with the marker.
pub fn find_embedded_json<R: BufRead>(reader: R) -> Result<String, ParseError> {
    for line in reader.lines() {
        let line = line?;
        let Some(rest) = line.trim().strip_prefix(DATA_MARKER) else {
            continue;
        };
        let rest = rest.trim_start();
        let rest = rest.strip_prefix('=').unwrap_or(rest).trim();
        let rest = rest.strip_suffix(';').unwrap_or(rest);
        return Ok(rest.to_string());
    }
    Err(ParseError::MissingMarker(DATA_MARKER))
}

/// Parse a count report from a reader.
///
/// `context` is the directory holding the report; it is handed to the sample
/// name cleaner together with the report's own sample id.
///
/// # Errors
///
/// Returns `ParseError::MissingMarker` if the report has no embedded data,
/// `ParseError::Json` if the JSON is malformed or lacks a required field, or
/// `ParseError::Io` if reading fails.
pub fn parse_count_report<R: BufRead>(
    reader: R,
    context: &Path,
    cleaner: &SampleNameCleaner,
    headers: &mut CountHeaders,
) -> Result<CountExtraction, ParseError> {
    let json = find_embedded_json(reader)?;
    let report: CountReport = serde_json::from_str(&json)?;
    Ok(extract_count(&report.summary, context, cleaner, headers))
}

/// Extract statistics, alarms and plots from a parsed report summary
pub fn extract_count(
    summary: &Summary,
    context: &Path,
    cleaner: &SampleNameCleaner,
    headers: &mut CountHeaders,
) -> CountExtraction {
    let sample = cleaner.clean(&summary.sample.id, context);
    let tab = &summary.summary_tab;

    let mut general_stats = SampleStats::new();
    merge_rows(
        &mut general_stats,
        &mut headers.general,
        &tab.cells.table.rows,
        GENERAL_CELL_COLUMNS,
        CATEGORY,
    );
    merge_rows(
        &mut general_stats,
        &mut headers.general,
        &tab.sequencing.table.rows,
        GENERAL_SEQUENCING_COLUMNS,
        CATEGORY,
    );

    let mut stats = general_stats.clone();
    let all_rows = tab
        .sequencing
        .table
        .rows
        .iter()
        .chain(&tab.cells.table.rows)
        .chain(&tab.mapping.table.rows);
    merge_rows(
        &mut stats,
        &mut headers.stats,
        all_rows,
        FULL_COLUMNS,
        CATEGORY,
    );

    let mut warnings = BTreeMap::new();
    let mut warning_headers = HeaderRegistry::new();
    for alarm in summary.alarms.iter().flat_map(|a| &a.alarms) {
        warnings.insert(alarm.id.clone(), FAIL_STATUS.to_string());

        let mut header = HeaderMeta::new(column_id("warning", &alarm.id), &alarm.id, &alarm.title);
        header
            .bgcols
            .insert(FAIL_STATUS.to_string(), FAIL_COLOUR.to_string());
        warning_headers.set(alarm.id.clone(), header);
    }

    let (plot_definitions, plot_series) = extract_plots(summary, &sample);

    CountExtraction {
        sample,
        general_stats,
        stats,
        warnings,
        warning_headers,
        plot_definitions,
        plot_series,
    }
}

fn extract_plots(
    summary: &Summary,
    sample: &str,
) -> (
    BTreeMap<CountPlot, PlotDefinition>,
    BTreeMap<CountPlot, PlotSeries>,
) {
    let mut definitions = BTreeMap::new();
    let mut series = BTreeMap::new();

    let cells = &summary.summary_tab.cells;
    if let Some(knee) = &cells.barcode_knee_plot {
        let helptext = cells
            .help
            .as_ref()
            .and_then(|h| h.entry(BARCODE_RANK_HELP))
            .unwrap_or_default();
        definitions.insert(
            CountPlot::BarcodeRank,
            PlotDefinition {
                config: PlotConfig {
                    id: "mqc_cellranger_count_bc_knee".to_string(),
                    title: format!("Cell Ranger count: {}", knee.layout.title.text()),
                    xlab: knee.layout.xaxis.title.text().to_string(),
                    ylab: knee.layout.yaxis.title.text().to_string(),
                    x_log: true,
                    y_log: true,
                    ymin: None,
                    ymax: None,
                },
                description: "Barcode knee plot".to_string(),
                helptext: helptext.to_string(),
            },
        );
        series.insert(CountPlot::BarcodeRank, knee_series(&knee.data, sample));
    }

    let analysis = summary.analysis_tab.as_ref();
    let helped = [
        (
            CountPlot::MedianGenes,
            analysis.and_then(|a| a.median_gene_plot.as_ref()),
            "mqc_cellranger_count_genesXcell",
            "Median gene counts per cell",
            None,
        ),
        (
            CountPlot::Saturation,
            analysis.and_then(|a| a.seq_saturation_plot.as_ref()),
            "mqc_cellranger_count_saturation",
            "Sequencing saturation",
            Some((0.0, 1.0)),
        ),
    ];

    for (kind, plot, id, description, bounds) in helped {
        let Some(plot) = plot else {
            continue;
        };
        definitions.insert(
            kind,
            PlotDefinition {
                config: PlotConfig {
                    id: id.to_string(),
                    title: format!("Cell Ranger count: {}", plot.help.title),
                    xlab: plot.plot.layout.xaxis.title.text().to_string(),
                    ylab: plot.plot.layout.yaxis.title.text().to_string(),
                    x_log: false,
                    y_log: false,
                    ymin: bounds.map(|(min, _)| min),
                    ymax: bounds.map(|(_, max)| max),
                },
                description: description.to_string(),
                helptext: plot.help.help_text.clone(),
            },
        );

        let mut points = PlotSeries::new();
        if let Some(curve) = plot.plot.data.first() {
            points.insert(sample.to_string(), xy_series(curve));
        }
        series.insert(kind, points);
    }

    (definitions, series)
}
