//! End-to-end tests of discovery and the report modules over fixture directories.

use std::path::{Path, PathBuf};

use qc_harvest::config::RunConfig;
use qc_harvest::core::diagnostics::{Level, MemoryDiagnostics};
use qc_harvest::core::report::{Cell, Plot};
use qc_harvest::discovery::collect_candidates;
use qc_harvest::modules::{all_modules, run_modules, RunContext};
use qc_harvest::ModuleReport;

fn count_report(sample: &str, alarms: &str) -> String {
    let json = format!(
        r#"{{"summary": {{"sample": {{"id": "{sample}"}}, "summary_tab": {{"cells": {{"table": {{"rows": [["Estimated Number of Cells", "1,222"], ["Median Genes per Cell", "2,059"]]}}}}, "sequencing": {{"table": {{"rows": [["Number of Reads", "49,735,656"], ["Valid Barcodes", "97.4%"]]}}}}, "mapping": {{"table": {{"rows": [["Reads Mapped to Genome", "95.0%"]]}}}}}}, "alarms": {{"alarms": [{alarms}]}}}}}}"#
    );
    format!("<html>\n<script>\n    const data = {json};\n</script>\n</html>\n")
}

fn write(path: &Path, contents: &str) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, contents).unwrap();
}

fn harvest(root: &Path, config: &RunConfig, diag: &MemoryDiagnostics) -> Vec<ModuleReport> {
    let candidates = collect_candidates(&[root.to_path_buf()], config.filesize_limit, diag);
    let ctx = RunContext::new(config, diag).unwrap();
    run_modules(&all_modules(), &candidates, &ctx).unwrap()
}

fn module<'a>(reports: &'a [ModuleReport], anchor: &str) -> &'a ModuleReport {
    reports
        .iter()
        .find(|r| r.anchor == anchor)
        .unwrap_or_else(|| panic!("no {anchor} report"))
}

fn fixture_dir() -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().to_path_buf();

    write(
        &root.join("pbmc_1k/outs/web_summary.html"),
        &count_report("pbmc_1k", r#"{"id": "low_cells", "title": "Low cell count"}"#),
    );
    write(
        &root.join("pbmc_5k/outs/web_summary.html"),
        &count_report("pbmc_5k", ""),
    );
    write(
        &root.join("dragen/HG002.fastqc_metrics.csv"),
        "READ GC CONTENT,Read1,50% GC Reads,100\nREAD GC CONTENT,Read1,60% GC Reads,50\n",
    );
    write(
        &root.join("humid/lib1/stats.dat"),
        "total: 10\nusable: 8\nclusters: 7\n",
    );
    write(
        &root.join("humid/lib2/stats.dat"),
        "total: 10\nusable: 8\nclusters: 9\nfiltered: 2\nduplicates: 1\n",
    );
    (dir, root)
}

#[test]
fn test_all_modules_find_their_reports() {
    let (_dir, root) = fixture_dir();
    let diag = MemoryDiagnostics::new();
    let reports = harvest(&root, &RunConfig::default(), &diag);

    assert_eq!(reports.len(), 3);

    let count = module(&reports, "cellranger");
    assert_eq!(count.samples.len(), 2);
    let general = &count.general_stats[0];
    assert_eq!(general.data["pbmc_1k"]["estimated cells"], Cell::Number(1222.0));
    assert_eq!(general.data["pbmc_1k"]["reads"], Cell::Number(49_735_656.0));
    assert!(count.section("cellranger-count-warnings").is_some());
    assert!(count.section("cellranger-count-stats").is_some());

    let dragen = module(&reports, "dragen-fastqc");
    assert!(dragen.samples.contains("HG002"));

    // lib2 does not reconcile and is dropped with a warning
    let humid = module(&reports, "humid");
    assert_eq!(humid.samples.iter().collect::<Vec<_>>(), vec!["lib1"]);
    let warnings = diag.at(Level::Warning);
    assert!(warnings.iter().any(|w| w.contains("lib2")));
}

#[test]
fn test_warnings_only_for_alarmed_samples() {
    let (_dir, root) = fixture_dir();
    let diag = MemoryDiagnostics::new();
    let reports = harvest(&root, &RunConfig::default(), &diag);

    let count = module(&reports, "cellranger");
    let section = count.section("cellranger-count-warnings").unwrap();
    let Plot::Table { data, headers, .. } = &section.plot else {
        panic!("warnings section should be a table");
    };
    assert_eq!(data.len(), 1);
    assert_eq!(
        data["pbmc_1k"]["low_cells"],
        Cell::Text("FAIL".to_string())
    );
    let header = headers.get("low_cells").unwrap();
    assert_eq!(header.description, "Low cell count");
    assert_eq!(header.bgcols.get("FAIL").map(String::as_str), Some("#f06807"));
}

#[test]
fn test_ignore_samples() {
    let (_dir, root) = fixture_dir();
    let config = RunConfig {
        ignore_samples: vec!["pbmc_5*".to_string(), "lib*".to_string()],
        ..RunConfig::default()
    };
    let diag = MemoryDiagnostics::new();
    let reports = harvest(&root, &config, &diag);

    assert_eq!(reports.len(), 2);
    let count = module(&reports, "cellranger");
    assert_eq!(count.samples.iter().collect::<Vec<_>>(), vec!["pbmc_1k"]);
    assert!(reports.iter().all(|r| r.anchor != "humid"));
}

#[test]
fn test_duplicate_sample_across_files() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(
        &root.join("a/outs/web_summary.html"),
        &count_report("pbmc", r#"{"id": "low_cells", "title": "Low cell count"}"#),
    );
    write(
        &root.join("b/outs/web_summary.html"),
        &count_report("pbmc", "").replace("1,222", "3,000"),
    );

    let diag = MemoryDiagnostics::new();
    let reports = harvest(root, &RunConfig::default(), &diag);
    let count = module(&reports, "cellranger");

    assert_eq!(count.samples.len(), 1);
    assert_eq!(
        count.general_stats[0].data["pbmc"]["estimated cells"],
        Cell::Number(3000.0)
    );
    // The later file raised no alarms, so no warnings remain
    assert!(count.section("cellranger-count-warnings").is_none());
    assert!(diag
        .at(Level::Debug)
        .iter()
        .any(|m| m.contains("Duplicate sample name") && m.contains("pbmc")));
}

#[test]
fn test_malformed_report_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(
        &root.join("bad/web_summary.html"),
        "<script>\nconst data = {\"summary\": ;\n</script>\n",
    );
    write(
        &root.join("good/web_summary.html"),
        &count_report("good", ""),
    );

    let diag = MemoryDiagnostics::new();
    let reports = harvest(root, &RunConfig::default(), &diag);

    let count = module(&reports, "cellranger");
    assert_eq!(count.samples.iter().collect::<Vec<_>>(), vec!["good"]);
    assert_eq!(diag.at(Level::Warning).len(), 1);
}

#[test]
fn test_nothing_found() {
    let dir = tempfile::tempdir().unwrap();
    write(&dir.path().join("notes.txt"), "nothing here\n");

    let diag = MemoryDiagnostics::new();
    let reports = harvest(dir.path(), &RunConfig::default(), &diag);
    assert!(reports.is_empty());
}
