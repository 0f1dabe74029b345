//! Report modules: one per upstream tool.
//!
//! A module selects its files from the discovered candidates, runs its parser
//! over each file in order, and accumulates the results into the tables,
//! plots and data files of a [`ModuleReport`]. A file that fails to parse is
//! reported and skipped; it never aborts the run.
//!
//! | Module | Files | Parser |
//! |--------|-------|--------|
//! | [`cellranger_count`] | `*.html` containing `const data` | [`parsing::cellranger`](crate::parsing::cellranger) |
//! | [`dragen_fastqc`] | `*.fastqc_metrics.csv` | [`parsing::dragen_fastqc`](crate::parsing::dragen_fastqc) |
//! | [`humid`] | `stats.dat` | [`parsing::humid`](crate::parsing::humid) |

use crate::config::{ConfigError, RunConfig};
use crate::core::diagnostics::Diagnostics;
use crate::core::report::ModuleReport;
use crate::core::sample::{SampleFilter, SampleNameCleaner};
use crate::core::types::{HeaderMeta, ValueFormat};
use crate::discovery::{DiscoveryError, LogFile, SearchPattern};

pub mod cellranger_count;
pub mod dragen_fastqc;
pub mod humid;

/// Shared inputs of a run
pub struct RunContext<'a> {
    pub config: &'a RunConfig,
    pub cleaner: SampleNameCleaner,
    pub filter: SampleFilter,
    pub diagnostics: &'a dyn Diagnostics,
}

impl<'a> RunContext<'a> {
    /// Build a context from a run configuration
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidPattern` if an ignore pattern does not compile.
    pub fn new(
        config: &'a RunConfig,
        diagnostics: &'a dyn Diagnostics,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            config,
            cleaner: SampleNameCleaner::from_config(config),
            filter: SampleFilter::from_config(config)?,
            diagnostics,
        })
    }
}

/// A parser plugin for one upstream tool
pub trait ReportModule {
    /// Display name, e.g. "HUMID"
    fn name(&self) -> &'static str;

    /// Which discovered files this module reads
    ///
    /// # Errors
    ///
    /// Returns `DiscoveryError::InvalidPattern` if the module's glob is invalid.
    fn search_pattern(&self) -> Result<SearchPattern, DiscoveryError>;

    /// Process `files` in order. Returns `None` when no sample survived.
    fn run(&self, files: &[LogFile], ctx: &RunContext<'_>) -> Option<ModuleReport>;
}

/// All available modules, in report order
#[must_use]
pub fn all_modules() -> Vec<Box<dyn ReportModule>> {
    vec![
        Box::new(cellranger_count::CellRangerCount),
        Box::new(dragen_fastqc::DragenFastqc),
        Box::new(humid::Humid),
    ]
}

/// Run every module over the discovered candidates.
///
/// Modules that find no data are left out of the result.
///
/// # Errors
///
/// Returns `DiscoveryError` if a module's search pattern is invalid.
pub fn run_modules(
    modules: &[Box<dyn ReportModule>],
    candidates: &[LogFile],
    ctx: &RunContext<'_>,
) -> Result<Vec<ModuleReport>, DiscoveryError> {
    let mut reports = Vec::new();
    for module in modules {
        let files = module.search_pattern()?.find(candidates, ctx.diagnostics);
        if files.is_empty() {
            continue;
        }
        match module.run(&files, ctx) {
            Some(report) => {
                tracing::info!(
                    module = module.name(),
                    samples = report.samples.len(),
                    "Found reports"
                );
                reports.push(report);
            }
            None => ctx
                .diagnostics
                .debug(&format!("{}: no samples found", module.name())),
        }
    }
    Ok(reports)
}

/// Header for a read-count column, scaled by the configured multiplier
pub(crate) fn read_count_header(
    rid: &str,
    what: &str,
    description: &str,
    config: &RunConfig,
) -> HeaderMeta {
    HeaderMeta::new(
        rid,
        format!("{} {what}", config.read_count_prefix),
        format!("{description} ({})", config.read_count_desc),
    )
    .with_format(ValueFormat::Count)
    .with_multiplier(config.read_count_multiplier)
}
