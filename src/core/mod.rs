//! Core data types shared by every extractor.
//!
//! - [`SampleStats`], [`StatsTable`]: flat per-sample statistics
//! - [`HeaderRegistry`], [`HeaderMeta`]: column metadata, registered once per key
//! - [`WarningSet`]: per-sample alarm statuses
//! - [`PlotSeries`], [`PlotConfig`], [`PlotDefinition`]: line-graph data
//! - [`ModuleReport`](report::ModuleReport): what a module hands back after a run
//! - [`Diagnostics`](diagnostics::Diagnostics): where extractors send debug and warning messages
//! - [`SampleNameCleaner`](sample::SampleNameCleaner), [`SampleFilter`](sample::SampleFilter):
//!   sample naming and the ignore list
//!
//! All structures are rebuilt from scratch on every run; nothing persists
//! between runs except the data files written at the end.

pub mod diagnostics;
pub mod report;
pub mod sample;
pub mod types;

pub use types::*;
