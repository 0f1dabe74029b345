use std::collections::BTreeMap;
use std::path::Path;

use crate::config::{ConfigError, RunConfig};

/// Characters trimmed from both ends of a cleaned sample name
const TRIM_CHARS: &[char] = &[' ', '|', '-', '_', '.'];

/// Turns raw identifiers (sample ids, directory paths) into display sample names
#[derive(Debug, Clone)]
pub struct SampleNameCleaner {
    clean_exts: Vec<String>,
}

impl SampleNameCleaner {
    pub fn new(clean_exts: Vec<String>) -> Self {
        Self { clean_exts }
    }

    #[must_use]
    pub fn from_config(config: &RunConfig) -> Self {
        Self::new(config.fn_clean_exts.clone())
    }

    /// Clean a raw identifier.
    ///
    /// Path-like identifiers are reduced to their last component, configured
    /// suffixes are stripped repeatedly, and separator characters are trimmed.
    /// If nothing is left, the name of `context` (the directory holding the
    /// report) is used instead.
    #[must_use]
    pub fn clean(&self, raw: &str, context: &Path) -> String {
        let mut name = raw
            .trim()
            .trim_end_matches(['/', '\\'])
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or_default()
            .to_string();

        loop {
            let before = name.len();
            for ext in &self.clean_exts {
                if let Some(stripped) = name.strip_suffix(ext.as_str()) {
                    name = stripped.to_string();
                }
            }
            if name.len() == before {
                break;
            }
        }

        let name = name.trim_matches(TRIM_CHARS);
        if !name.is_empty() {
            return name.to_string();
        }

        context
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| raw.trim().to_string())
    }
}

impl Default for SampleNameCleaner {
    fn default() -> Self {
        Self::from_config(&RunConfig::default())
    }
}

/// Drops samples whose names match any of the configured ignore patterns
#[derive(Debug, Clone, Default)]
pub struct SampleFilter {
    patterns: Vec<glob::Pattern>,
}

impl SampleFilter {
    pub fn new(patterns: Vec<glob::Pattern>) -> Self {
        Self { patterns }
    }

    pub fn from_config(config: &RunConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(config.ignore_patterns()?))
    }

    #[must_use]
    pub fn is_ignored(&self, sample: &str) -> bool {
        self.patterns.iter().any(|p| p.matches(sample))
    }

    /// Remove ignored samples from a per-sample mapping
    pub fn retain<V>(&self, data: &mut BTreeMap<String, V>) {
        if self.patterns.is_empty() {
            return;
        }
        data.retain(|sample, _| !self.is_ignored(sample));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_plain_id() {
        let cleaner = SampleNameCleaner::default();
        assert_eq!(cleaner.clean("pbmc_1k", Path::new("/runs/x")), "pbmc_1k");
    }

    #[test]
    fn test_clean_strips_extensions_and_path() {
        let cleaner = SampleNameCleaner::default();
        assert_eq!(
            cleaner.clean("/data/run1/sampleA.fastq.gz", Path::new("/data/run1")),
            "sampleA"
        );
        assert_eq!(cleaner.clean("results/humid_out/", Path::new("x")), "humid_out");
    }

    #[test]
    fn test_clean_trims_separators() {
        let cleaner = SampleNameCleaner::new(vec!["_R1".to_string()]);
        assert_eq!(cleaner.clean(" sample_R1 ", Path::new(".")), "sample");
        assert_eq!(cleaner.clean("sample._R1", Path::new(".")), "sample");
    }

    #[test]
    fn test_clean_falls_back_to_context() {
        let cleaner = SampleNameCleaner::default();
        assert_eq!(cleaner.clean(".gz", Path::new("/data/lib7")), "lib7");
    }

    #[test]
    fn test_filter_retain() {
        let filter = SampleFilter::new(vec![glob::Pattern::new("neg_*").unwrap()]);
        let mut data: BTreeMap<String, u32> = BTreeMap::new();
        data.insert("neg_ctrl".to_string(), 1);
        data.insert("sample1".to_string(), 2);

        filter.retain(&mut data);
        assert_eq!(data.len(), 1);
        assert!(data.contains_key("sample1"));
    }
}
