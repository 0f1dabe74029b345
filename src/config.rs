//! Run configuration.
//!
//! Defaults are suitable for most runs; a JSON file can override any subset
//! of fields:
//!
//! ```json
//! {
//!   "read_count_multiplier": 0.001,
//!   "read_count_prefix": "K",
//!   "read_count_desc": "thousands",
//!   "ignore_samples": ["*_undetermined"]
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::utils::validation::DEFAULT_FILESIZE_LIMIT;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Invalid ignore pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Factor applied to read counts before display
    pub read_count_multiplier: f64,

    /// Prefix used in read-count column titles (e.g. "M")
    pub read_count_prefix: String,

    /// Unit description used in read-count column descriptions
    pub read_count_desc: String,

    /// Glob patterns; matching samples are dropped from every table
    pub ignore_samples: Vec<String>,

    /// Suffixes stripped from sample names
    pub fn_clean_exts: Vec<String>,

    /// Files larger than this are skipped during discovery
    pub filesize_limit: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            read_count_multiplier: 0.000_001,
            read_count_prefix: "M".to_string(),
            read_count_desc: "millions".to_string(),
            ignore_samples: Vec::new(),
            fn_clean_exts: [".gz", ".fastq", ".fq", ".bam", ".sam", ".csv", ".html", ".dat"]
                .iter()
                .map(ToString::to_string)
                .collect(),
            filesize_limit: DEFAULT_FILESIZE_LIMIT,
        }
    }
}

impl RunConfig {
    /// Load configuration from a JSON file; missing fields take their defaults
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Compile the ignore patterns
    pub fn ignore_patterns(&self) -> Result<Vec<glob::Pattern>, ConfigError> {
        self.ignore_samples
            .iter()
            .map(|p| {
                glob::Pattern::new(p).map_err(|source| ConfigError::InvalidPattern {
                    pattern: p.clone(),
                    source,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config = RunConfig::from_json(r#"{"read_count_prefix": "K"}"#).unwrap();
        assert_eq!(config.read_count_prefix, "K");
        assert_eq!(config.read_count_desc, "millions");
        assert!((config.read_count_multiplier - 0.000_001).abs() < f64::EPSILON);
        assert!(config.fn_clean_exts.contains(&".gz".to_string()));
    }

    #[test]
    fn test_invalid_json() {
        assert!(RunConfig::from_json("{not json").is_err());
    }

    #[test]
    fn test_ignore_patterns() {
        let config = RunConfig {
            ignore_samples: vec!["*_undetermined".to_string()],
            ..RunConfig::default()
        };
        let patterns = config.ignore_patterns().unwrap();
        assert!(patterns[0].matches("lane1_undetermined"));

        let bad = RunConfig {
            ignore_samples: vec!["[".to_string()],
            ..RunConfig::default()
        };
        assert!(matches!(
            bad.ignore_patterns(),
            Err(ConfigError::InvalidPattern { .. })
        ));
    }
}
