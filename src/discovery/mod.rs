//! Discovery of report files.
//!
//! Input paths are walked once; every regular file becomes a candidate. Each
//! module then selects its files with a [`SearchPattern`]: a file-name glob,
//! optionally combined with a marker string that must occur in the contents.
//!
//! ```rust,no_run
//! use qc_harvest::discovery::{collect_candidates, SearchPattern};
//! use qc_harvest::core::diagnostics::TracingDiagnostics;
//! use std::path::PathBuf;
//!
//! let candidates = collect_candidates(&[PathBuf::from("results")], 50_000_000, &TracingDiagnostics);
//! let pattern = SearchPattern::new("stats.dat").unwrap();
//! let files = pattern.find(&candidates, &TracingDiagnostics);
//! ```

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

use crate::core::diagnostics::Diagnostics;
use crate::utils::validation::check_filesize;

#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("Invalid file name pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },
}

/// A report file found during discovery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFile {
    /// Directory holding the file
    pub root: PathBuf,
    pub path: PathBuf,
    pub file_name: String,
}

impl LogFile {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let root = path.parent().map(Path::to_path_buf).unwrap_or_default();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        Self {
            root,
            path,
            file_name,
        }
    }

    /// Open the file for buffered reading
    ///
    /// # Errors
    ///
    /// Returns an IO error if the file cannot be opened.
    pub fn open(&self) -> std::io::Result<BufReader<File>> {
        File::open(&self.path).map(BufReader::new)
    }
}

/// Which files a module reads
#[derive(Debug, Clone)]
pub struct SearchPattern {
    file_name: glob::Pattern,
    contents: Option<&'static str>,
}

impl SearchPattern {
    /// Match files whose name matches the glob `file_name`
    ///
    /// # Errors
    ///
    /// Returns `DiscoveryError::InvalidPattern` if the glob does not compile.
    pub fn new(file_name: &str) -> Result<Self, DiscoveryError> {
        let file_name =
            glob::Pattern::new(file_name).map_err(|source| DiscoveryError::InvalidPattern {
                pattern: file_name.to_string(),
                source,
            })?;
        Ok(Self {
            file_name,
            contents: None,
        })
    }

    /// Additionally require `marker` to occur in the file contents
    #[must_use]
    pub fn with_contents(mut self, marker: &'static str) -> Self {
        self.contents = Some(marker);
        self
    }

    #[must_use]
    pub fn matches_name(&self, file_name: &str) -> bool {
        self.file_name.matches(file_name)
    }

    /// Check a file against the pattern; unreadable files do not match
    #[must_use]
    pub fn matches(&self, file: &LogFile) -> bool {
        if !self.matches_name(&file.file_name) {
            return false;
        }
        match self.contents {
            None => true,
            Some(marker) => std::fs::read(&file.path)
                .map(|bytes| String::from_utf8_lossy(&bytes).contains(marker))
                .unwrap_or(false),
        }
    }

    /// Select the candidates matching this pattern, in candidate order
    pub fn find(&self, candidates: &[LogFile], diagnostics: &dyn Diagnostics) -> Vec<LogFile> {
        let found: Vec<LogFile> = candidates
            .iter()
            .filter(|f| self.matches(f))
            .cloned()
            .collect();
        diagnostics.debug(&format!(
            "Pattern '{}' matched {} file(s)",
            self.file_name.as_str(),
            found.len()
        ));
        found
    }
}

/// Walk `paths` and collect every regular file no larger than `filesize_limit`.
///
/// Paths may be files or directories. Directory entries are visited in
/// file-name order so that runs are reproducible. Unreadable entries and
/// oversized files are reported and skipped.
pub fn collect_candidates(
    paths: &[PathBuf],
    filesize_limit: u64,
    diagnostics: &dyn Diagnostics,
) -> Vec<LogFile> {
    let mut files = Vec::new();
    for path in paths {
        for entry in WalkDir::new(path).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    diagnostics.warning(&format!("Skipping unreadable path: {e}"));
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
            if let Some(problem) = check_filesize(size, filesize_limit) {
                diagnostics.debug(&format!(
                    "Ignoring {}: {problem}",
                    entry.path().display()
                ));
                continue;
            }

            files.push(LogFile::new(entry.path()));
        }
    }
    files
}
