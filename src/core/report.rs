use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::types::{
    BarCategory, HeaderRegistry, PlotConfig, PlotSeries, QuantilePlot, StatsTable, WarningSet,
};
use crate::utils::validation::{sanitize_file_stem, ValidationError};

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Failed to write report: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to write data file: {0}")]
    Csv(#[from] csv::Error),

    #[error("Failed to serialize report: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid data file name: {0}")]
    InvalidName(#[from] ValidationError),
}

/// Report format version written into every run report
pub const REPORT_VERSION: &str = "1.0.0";

/// A single table cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Number(f64),
    Text(String),
}

impl From<f64> for Cell {
    fn from(v: f64) -> Self {
        Self::Number(v)
    }
}

impl From<i64> for Cell {
    fn from(v: i64) -> Self {
        #[allow(clippy::cast_precision_loss)] // read counts stay well below 2^53
        Self::Number(v as f64)
    }
}

impl From<String> for Cell {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl std::fmt::Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(v) => write!(f, "{v}"),
            Self::Text(s) => write!(f, "{s}"),
        }
    }
}

/// Rows of a table: sample -> column -> cell
pub type TableData = BTreeMap<String, BTreeMap<String, Cell>>;

/// Convert numeric per-sample statistics into table rows
#[must_use]
pub fn table_from_stats(stats: &StatsTable) -> TableData {
    stats
        .iter()
        .map(|(sample, row)| {
            let cells = row.iter().map(|(k, v)| (k.clone(), Cell::from(*v))).collect();
            (sample.clone(), cells)
        })
        .collect()
}

/// Convert per-sample alarm statuses into table rows
#[must_use]
pub fn table_from_warnings(warnings: &WarningSet) -> TableData {
    warnings
        .iter()
        .map(|(sample, row)| {
            let cells = row
                .iter()
                .map(|(k, v)| (k.clone(), Cell::from(v.clone())))
                .collect();
            (sample.clone(), cells)
        })
        .collect()
}

/// Stacked bar graph configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarGraphConfig {
    pub id: String,
    pub title: String,
    pub ylab: String,
    #[serde(default)]
    pub hide_zero_cats: bool,
}

/// Plot payload of a report section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Plot {
    Table {
        data: TableData,
        headers: HeaderRegistry,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        namespace: Option<String>,
    },
    LineGraph {
        series: PlotSeries,
        config: PlotConfig,
    },
    BarGraph {
        data: TableData,
        categories: Vec<BarCategory>,
        config: BarGraphConfig,
    },
    /// Value ranges by position, one box per position and series
    BoxPlot {
        data: QuantilePlot,
        config: PlotConfig,
    },
}

/// A titled block of a module's report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub name: String,
    pub anchor: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub helptext: String,
    pub plot: Plot,
}

/// Columns contributed to the cross-module general statistics table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneralStatsBlock {
    pub namespace: String,
    pub data: TableData,
    pub headers: HeaderRegistry,
}

/// Record of which file produced which sample
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSource {
    pub module: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    pub sample: String,
    pub path: PathBuf,
}

/// Output format of data files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DataFormat {
    #[default]
    Tsv,
    Json,
}

impl DataFormat {
    fn extension(self) -> &'static str {
        match self {
            Self::Tsv => "txt",
            Self::Json => "json",
        }
    }
}

/// Full per-sample statistics persisted next to the report, one record per sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataFile {
    pub name: String,
    pub rows: TableData,
}

impl DataFile {
    pub fn new(name: impl Into<String>, rows: TableData) -> Self {
        Self {
            name: name.into(),
            rows,
        }
    }

    /// Union of all column names, sorted
    #[must_use]
    pub fn columns(&self) -> Vec<&str> {
        let columns: BTreeSet<&str> = self
            .rows
            .values()
            .flat_map(|row| row.keys().map(String::as_str))
            .collect();
        columns.into_iter().collect()
    }

    /// Write the data file into `dir`, returning the path written
    ///
    /// # Errors
    ///
    /// Returns `ReportError::InvalidName` if the file name is unsafe, or an
    /// IO/serialization error if writing fails.
    pub fn write(&self, dir: &Path, format: DataFormat) -> Result<PathBuf, ReportError> {
        let stem = sanitize_file_stem(&self.name)?;
        let path = dir.join(format!("{stem}.{}", format.extension()));
        let file = std::fs::File::create(&path)?;
        match format {
            DataFormat::Tsv => self.write_tsv(file)?,
            DataFormat::Json => serde_json::to_writer_pretty(file, &self.rows)?,
        }
        Ok(path)
    }

    /// Write rows as tab-separated text; samples lacking a column get an empty cell
    ///
    /// # Errors
    ///
    /// Returns `ReportError::Csv` if writing fails.
    pub fn write_tsv<W: std::io::Write>(&self, writer: W) -> Result<(), ReportError> {
        let columns = self.columns();
        let mut out = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .from_writer(writer);

        let mut header = vec!["Sample"];
        header.extend(columns.iter().copied());
        out.write_record(&header)?;

        for (sample, row) in &self.rows {
            let mut record = vec![sample.clone()];
            record.extend(
                columns
                    .iter()
                    .map(|c| row.get(*c).map(ToString::to_string).unwrap_or_default()),
            );
            out.write_record(&record)?;
        }
        out.flush()?;
        Ok(())
    }
}

/// Everything one module extracted during a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleReport {
    pub name: String,
    pub anchor: String,
    #[serde(default)]
    pub href: String,
    #[serde(default)]
    pub info: String,
    pub samples: BTreeSet<String>,
    #[serde(default)]
    pub general_stats: Vec<GeneralStatsBlock>,
    #[serde(default)]
    pub sections: Vec<Section>,
    #[serde(default)]
    pub data_files: Vec<DataFile>,
    #[serde(default)]
    pub sources: Vec<DataSource>,
}

impl ModuleReport {
    pub fn new(name: impl Into<String>, anchor: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            anchor: anchor.into(),
            href: String::new(),
            info: String::new(),
            samples: BTreeSet::new(),
            general_stats: Vec::new(),
            sections: Vec::new(),
            data_files: Vec::new(),
            sources: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_info(mut self, href: impl Into<String>, info: impl Into<String>) -> Self {
        self.href = href.into();
        self.info = info.into();
        self
    }

    #[must_use]
    pub fn section(&self, anchor: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.anchor == anchor)
    }
}

/// The serialized result of one run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub version: String,
    pub created_at: String,
    pub modules: Vec<ModuleReport>,
}

impl RunReport {
    #[must_use]
    pub fn new(modules: Vec<ModuleReport>) -> Self {
        Self {
            version: REPORT_VERSION.to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
            modules,
        }
    }

    /// Export report to JSON
    ///
    /// # Errors
    ///
    /// Returns `ReportError::Json` if serialization fails.
    pub fn to_json(&self) -> Result<String, ReportError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_rows() -> TableData {
        let mut rows = TableData::new();
        rows.entry("s1".to_string())
            .or_default()
            .insert("reads".to_string(), Cell::from(100.0));
        rows.entry("s2".to_string())
            .or_default()
            .insert("genes".to_string(), Cell::from(7.5));
        rows
    }

    #[test]
    fn test_write_tsv_leaves_missing_cells_blank() {
        let data = DataFile::new("multiqc_test", sample_rows());
        let mut buf = Vec::new();
        data.write_tsv(&mut buf).unwrap();

        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Sample\tgenes\treads");
        assert_eq!(lines[1], "s1\t\t100");
        assert_eq!(lines[2], "s2\t7.5\t");
    }

    #[test]
    fn test_write_to_dir() {
        let dir = tempfile::tempdir().unwrap();
        let data = DataFile::new("multiqc_test", sample_rows());

        let path = data.write(dir.path(), DataFormat::Json).unwrap();
        assert!(path.ends_with("multiqc_test.json"));

        let parsed: TableData =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed, sample_rows());
    }

    #[test]
    fn test_write_rejects_unsafe_name() {
        let dir = tempfile::tempdir().unwrap();
        let data = DataFile::new("../escape", sample_rows());
        assert!(matches!(
            data.write(dir.path(), DataFormat::Tsv),
            Err(ReportError::InvalidName(_))
        ));
    }

    #[test]
    fn test_table_from_warnings() {
        let mut warnings = WarningSet::new();
        warnings
            .entry("s1".to_string())
            .or_default()
            .insert("low_cells".to_string(), "FAIL".to_string());

        let table = table_from_warnings(&warnings);
        assert_eq!(table["s1"]["low_cells"], Cell::Text("FAIL".to_string()));
    }

    #[test]
    fn test_box_plot_serializes_with_type_tag() {
        let plot = Plot::BoxPlot {
            data: QuantilePlot::from([(
                "s1_Read1".to_string(),
                vec![(1.0, BTreeMap::from([(50, 35)]))],
            )]),
            config: PlotConfig {
                id: "range".to_string(),
                title: "Range".to_string(),
                xlab: "Position (bp)".to_string(),
                ylab: "Phred Quality Score".to_string(),
                x_log: false,
                y_log: false,
                ymin: Some(0.0),
                ymax: Some(43.0),
            },
        };

        let json = serde_json::to_value(&plot).unwrap();
        assert_eq!(json["type"], "box_plot");
        assert_eq!(json["data"]["s1_Read1"][0][1]["50"], 35);

        let back: Plot = serde_json::from_value(json).unwrap();
        assert_eq!(back, plot);
    }

    #[test]
    fn test_run_report_to_json() {
        let report = RunReport::new(vec![ModuleReport::new("HUMID", "humid")]);
        let json = report.to_json().unwrap();
        assert!(json.contains("\"version\""));
        assert!(json.contains("\"humid\""));
    }
}
