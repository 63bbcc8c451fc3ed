//! Sanity checker tests over a directory of result documents.

use std::path::Path;

use wfbench::sanity::{self, Dimension, Tally};

fn write_result(dir: &Path, name: &str, makespan: f64) {
    std::fs::write(
        dir.join(name),
        serde_json::json!({
            "name": "Benchmark",
            "workflow": { "execution": { "makespanInSeconds": makespan }, "tasks": [] }
        })
        .to_string(),
    )
    .unwrap();
}

/// Test: Full report
/// Given results for two workflows across every dimension
/// When all dimensions are checked
/// Then each workflow reports its own tallies
#[test]
fn test_report_over_results_directory() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path();

    // montage: more cpu work is slower (sane), more data is faster (insane)
    write_result(dir, "montage-50-100-0.6-10-haswell-1-0.json", 100.0);
    write_result(dir, "montage-50-100-0.6-10-haswell-1-1.json", 110.0);
    write_result(dir, "montage-50-200-0.6-10-haswell-1-0.json", 150.0);
    write_result(dir, "montage-50-100-0.6-20-haswell-1-0.json", 90.0);

    // chain: two nodes are faster than one (sane), four are slower (insane)
    write_result(dir, "chain-10-100-1.0-10-skylake-1-0.json", 60.0);
    write_result(dir, "chain-10-100-1.0-10-skylake-2-0.json", 40.0);
    write_result(dir, "chain-10-100-1.0-10-skylake-4-0.json", 45.0);

    // ignored
    write_result(dir, "summary.json", 1.0);
    std::fs::write(dir.join("chain-10-100-1.0-10-skylake-8-0.json"), "not json").unwrap();

    let results = sanity::load_results(dir).unwrap();
    assert_eq!(results.len(), 7);

    let reports = sanity::report(&results, &Dimension::ALL);
    let workflows: Vec<_> = reports.iter().map(|r| r.workflow.as_str()).collect();
    assert_eq!(workflows, vec!["chain", "montage"]);

    let chain = &reports[0];
    assert_eq!(chain.tallies[&Dimension::ComputeNodes], Tally { sane: 1, insane: 1 });
    assert_eq!(chain.tallies[&Dimension::CpuWork], Tally::default());

    let montage = &reports[1];
    assert_eq!(montage.tallies[&Dimension::CpuWork], Tally { sane: 1, insane: 0 });
    assert_eq!(montage.tallies[&Dimension::DataFootprint], Tally { sane: 0, insane: 1 });
}

#[test]
fn test_report_limited_to_requested_dimensions() {
    let tmp = tempfile::tempdir().unwrap();
    write_result(tmp.path(), "bwa-8-100-0.6-10-cascadelake-1-0.json", 10.0);
    write_result(tmp.path(), "bwa-8-300-0.6-10-cascadelake-1-0.json", 30.0);

    let results = sanity::load_results(tmp.path()).unwrap();
    let reports = sanity::report(&results, &[Dimension::CpuWork]);
    assert_eq!(reports.len(), 1);
    assert_eq!(
        reports[0].to_string(),
        "bwa:\n  CPU work sanity=1  insanity=0\n"
    );
}

#[test]
fn test_empty_directory() {
    let tmp = tempfile::tempdir().unwrap();
    let results = sanity::load_results(tmp.path()).unwrap();
    assert!(results.is_empty());
    assert!(sanity::report(&results, &Dimension::ALL).is_empty());
}

#[test]
fn test_missing_directory_is_an_error() {
    let tmp = tempfile::tempdir().unwrap();
    assert!(sanity::load_results(&tmp.path().join("absent")).is_err());
}
