use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Flat statistics for one sample: short key -> value
///
/// Keys are stable across samples. A sample missing a key simply has no entry.
pub type SampleStats = BTreeMap<String, f64>;

/// Per-sample statistics for a whole run: sample name -> stats
pub type StatsTable = BTreeMap<String, SampleStats>;

/// Per-sample alarm statuses: sample name -> (alarm id -> status)
pub type WarningSet = BTreeMap<String, BTreeMap<String, String>>;

/// Ordered (x, y) points for one sample
pub type Series = Vec<(f64, f64)>;

/// Line-plot data for a run: sample (or series) name -> points
pub type PlotSeries = BTreeMap<String, Series>;

/// Quality quantiles along a read: (position, quantile percent -> value)
pub type QuantileSeries = Vec<(f64, BTreeMap<u32, i64>)>;

/// Box-plot data for a run: series name -> quantiles by position
pub type QuantilePlot = BTreeMap<String, QuantileSeries>;

/// Status recorded for every alarm raised in a report
pub const FAIL_STATUS: &str = "FAIL";

/// How a column's values should be rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueFormat {
    /// Plain number
    #[default]
    Float,
    /// Whole counts (reads, cells, genes)
    Count,
    /// Fraction in 0..1, rendered as a percentage
    Percent,
}

/// Display metadata for one statistics column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeaderMeta {
    /// Machine id of the column
    pub rid: String,

    pub title: String,

    pub description: String,

    #[serde(default)]
    pub format: ValueFormat,

    /// Color scale name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<String>,

    #[serde(default)]
    pub hidden: bool,

    /// Columns sharing a key are grouped and share a color scale range
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shared_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    /// Multiplier applied to values before display
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multiplier: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,

    /// Number format string, e.g. `{:,.0f}`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number_format: Option<String>,

    /// Background colours by cell value (used by status tables)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub bgcols: BTreeMap<String, String>,
}

impl HeaderMeta {
    pub fn new(
        rid: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            rid: rid.into(),
            title: title.into(),
            description: description.into(),
            format: ValueFormat::default(),
            scale: None,
            hidden: false,
            shared_key: None,
            namespace: None,
            multiplier: None,
            min: None,
            max: None,
            suffix: None,
            number_format: None,
            bgcols: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_format(mut self, format: ValueFormat) -> Self {
        self.format = format;
        if format == ValueFormat::Percent {
            self.min = Some(0.0);
            self.max = Some(1.0);
            self.suffix = Some("%".to_string());
        }
        self
    }

    #[must_use]
    pub fn with_scale(mut self, scale: impl Into<String>) -> Self {
        self.scale = Some(scale.into());
        self
    }

    #[must_use]
    pub fn with_shared_key(mut self, key: impl Into<String>) -> Self {
        self.shared_key = Some(key.into());
        self
    }

    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    #[must_use]
    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = Some(multiplier);
        self
    }
}

/// Column metadata for one table, in registration order
///
/// Registration is idempotent: the first registration of a key wins, so the
/// rendered columns do not depend on which samples carry which statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HeaderRegistry {
    columns: Vec<(String, HeaderMeta)>,
}

impl HeaderRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.columns.iter().any(|(k, _)| k == key)
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&HeaderMeta> {
        self.columns.iter().find(|(k, _)| k == key).map(|(_, h)| h)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut HeaderMeta> {
        self.columns
            .iter_mut()
            .find(|(k, _)| k == key)
            .map(|(_, h)| h)
    }

    /// Insert a header only if the key is not registered yet.
    /// Returns `true` if the header was inserted.
    pub fn register(&mut self, key: impl Into<String>, header: HeaderMeta) -> bool {
        let key = key.into();
        if self.contains(&key) {
            return false;
        }
        self.columns.push((key, header));
        true
    }

    /// Insert or replace a header, keeping the column position of an existing key
    pub fn set(&mut self, key: impl Into<String>, header: HeaderMeta) {
        let key = key.into();
        match self.get_mut(&key) {
            Some(existing) => *existing = header,
            None => self.columns.push((key, header)),
        }
    }

    /// Mark the given columns hidden; keys that were never registered are ignored
    pub fn hide(&mut self, keys: &[&str]) {
        for key in keys {
            if let Some(header) = self.get_mut(key) {
                header.hidden = true;
            }
        }
    }

    /// Keep only the columns for which `keep` returns true
    pub fn retain(&mut self, mut keep: impl FnMut(&str) -> bool) {
        self.columns.retain(|(k, _)| keep(k));
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &HeaderMeta)> {
        self.columns.iter().map(|(k, h)| (k.as_str(), h))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Line-graph configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlotConfig {
    pub id: String,
    pub title: String,
    pub xlab: String,
    pub ylab: String,
    #[serde(default)]
    pub x_log: bool,
    #[serde(default)]
    pub y_log: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ymin: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ymax: Option<f64>,
}

/// A plot configuration together with its section texts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlotDefinition {
    pub config: PlotConfig,
    pub description: String,
    #[serde(default)]
    pub helptext: String,
}

/// One category of a stacked bar graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BarCategory {
    /// Field of the per-sample record holding this category's value
    pub key: String,
    /// Display name
    pub name: String,
}

impl BarCategory {
    pub fn new(key: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_is_idempotent() {
        let mut headers = HeaderRegistry::new();
        let first = HeaderMeta::new("count_reads", "Reads", "Number of Reads");
        let second = HeaderMeta::new("other", "Other", "Other");
        assert!(headers.register("reads", first));
        assert!(!headers.register("reads", second));

        assert_eq!(headers.len(), 1);
        assert_eq!(headers.get("reads").unwrap().rid, "count_reads");
    }

    #[test]
    fn test_set_keeps_position() {
        let mut headers = HeaderRegistry::new();
        headers.register("a", HeaderMeta::new("a", "A", ""));
        headers.register("b", HeaderMeta::new("b", "B", ""));
        headers.set("a", HeaderMeta::new("a2", "A2", ""));

        let keys: Vec<&str> = headers.keys().collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(headers.get("a").unwrap().title, "A2");
    }

    #[test]
    fn test_hide_ignores_unknown_keys() {
        let mut headers = HeaderRegistry::new();
        headers.register("Q30 bc", HeaderMeta::new("q30_bc", "Q30 bc", ""));
        headers.hide(&["Q30 bc", "saturation"]);

        assert!(headers.get("Q30 bc").unwrap().hidden);
        assert!(!headers.contains("saturation"));
    }

    #[test]
    fn test_retain_keeps_order() {
        let mut headers = HeaderRegistry::new();
        for key in ["a", "b", "c"] {
            headers.register(key, HeaderMeta::new(key, key, ""));
        }
        headers.retain(|k| k != "b");

        let keys: Vec<&str> = headers.keys().collect();
        assert_eq!(keys, vec!["a", "c"]);
    }

    #[test]
    fn test_percent_format_sets_bounds() {
        let header = HeaderMeta::new("x", "X", "").with_format(ValueFormat::Percent);
        assert_eq!(header.min, Some(0.0));
        assert_eq!(header.max, Some(1.0));
        assert_eq!(header.suffix.as_deref(), Some("%"));
    }
}
