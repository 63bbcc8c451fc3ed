//! Document rendering, parsing and validation tests.

use std::collections::BTreeSet;

use wfbench::benchmark::{self, LockFiles};
use wfbench::core::dag;
use wfbench::workflow::document;
use wfbench::{CommandFamily, Error, Topology};

use crate::fixtures::{fixed_stamps, generator, meta};

/// Test: Round-trip
/// Given generated chain and fork-join documents
/// When written to disk and read back
/// Then edges and files are unchanged
#[test]
fn test_written_documents_read_back() {
    let tmp = tempfile::tempdir().unwrap();
    for (topology, n) in [(Topology::Chain, 6), (Topology::ForkJoin, 7)] {
        let wf = topology
            .generate_at(&generator(n, CommandFamily::WfBench), &meta(), fixed_stamps())
            .unwrap();
        let path = tmp.path().join(topology.document_file_name(n));
        document::write(&wf, &path).unwrap();

        let back = document::read(&path).unwrap();
        let edges = |w: &wfbench::Workflow| w.edges().into_iter().collect::<BTreeSet<_>>();
        assert_eq!(edges(&back), edges(&wf));
        for (a, b) in wf.tasks().iter().zip(back.tasks()) {
            assert_eq!(a.files, b.files);
        }
        assert_eq!(back, wf);
    }
}

#[test]
fn test_executed_documents_parse_with_extra_fields() {
    let wf = Topology::Chain
        .generate_at(&generator(2, CommandFamily::WfBench), &meta(), fixed_stamps())
        .unwrap();
    let mut value: serde_json::Value =
        serde_json::from_str(&document::to_json(&wf).unwrap()).unwrap();
    value["workflow"]["execution"] = serde_json::json!({ "makespanInSeconds": 12.5 });
    value["workflow"]["makespan"] = serde_json::json!(12.5);

    let back = document::from_json(&value.to_string()).unwrap();
    assert_eq!(back.task_count(), 2);
    assert_eq!(back.body.makespan.as_f64(), Some(12.5));
    dag::validate(&back).unwrap();
}

#[test]
fn test_validate_rejects_broken_documents() {
    let wf = Topology::ForkJoin
        .generate_at(&generator(5, CommandFamily::WfBench), &meta(), fixed_stamps())
        .unwrap();

    let mut one_sided = wf.clone();
    one_sided.body.tasks[4].parents.pop();
    let err = dag::validate(&one_sided).unwrap_err();
    assert!(err.to_string().contains("does not list it as parent"), "{}", err);

    let mut cyclic = wf.clone();
    cyclic.body.tasks[4].children.push("fork_join_00000001".to_string());
    cyclic.body.tasks[0].parents.push("fork_join_00000005".to_string());
    let err = dag::validate(&cyclic).unwrap_err();
    assert!(err.to_string().contains("Cycle detected"), "{}", err);

    let mut orphan_input = wf;
    orphan_input.body.tasks[2].files[0].name = "nobody_output.txt".to_string();
    assert!(matches!(
        dag::validate(&orphan_input),
        Err(Error::Validation(_))
    ));
}

/// Test: Run mode
/// Given a writable save dir and lock dir
/// When a fork-join benchmark is materialized
/// Then document, lock files and a payload of the input size exist
#[test]
fn test_materialize_fork_join() {
    let tmp = tempfile::tempdir().unwrap();
    let mut config = generator(5, CommandFamily::WfBench);
    config.resources.data_mb = 1;
    config.resources.lock_dir = tmp.path().join("locks");
    let save_dir = tmp.path().join("bench");

    let bench = benchmark::materialize(Topology::ForkJoin, &config, &meta(), &save_dir).unwrap();

    assert_eq!(bench.document, save_dir.join("forkjoin-benchmark-5.json"));
    assert_eq!(document::read(&bench.document).unwrap(), bench.workflow);
    assert!(tmp.path().join("locks/cores.txt").is_file());
    assert!(tmp.path().join("locks/cores.txt.lock").is_file());
    assert!(matches!(bench.lock_files, LockFiles::Created { .. }));

    let payload = bench.payload.unwrap();
    assert_eq!(
        payload,
        save_dir.join(benchmark::DATA_DIR).join("fork_join_00000001_input.txt")
    );
    assert_eq!(std::fs::metadata(&payload).unwrap().len(), 200 * 1000);
}

#[test]
fn test_materialize_continues_without_lock_dir() {
    let tmp = tempfile::tempdir().unwrap();
    let blocker = tmp.path().join("not-a-dir");
    std::fs::write(&blocker, "file").unwrap();

    let mut config = generator(3, CommandFamily::Sleep { seconds: 1 });
    config.resources.lock_dir = blocker.join("locks");
    let bench = benchmark::materialize(Topology::Chain, &config, &meta(), tmp.path()).unwrap();

    assert!(bench.lock_files.is_degraded());
    assert!(bench.document.is_file());
    assert!(bench.payload.is_none());
}

#[test]
fn test_materialize_validates_before_writing() {
    let tmp = tempfile::tempdir().unwrap();
    let save_dir = tmp.path().join("never");
    let mut config = generator(3, CommandFamily::WfBench);
    config.resources.lock_dir = tmp.path().join("locks");

    let err = benchmark::materialize(Topology::ForkJoin, &config, &meta(), &save_dir).unwrap_err();
    assert!(matches!(err, Error::TooFewTasks { min: 4, got: 3, .. }));
    assert!(!save_dir.exists());
    assert!(!tmp.path().join("locks").exists());
}
