//! Structural tests for generated chain and fork-join instances.
//!
//! Every property is checked over a range of sizes through the graph view,
//! so the edge lists on both sides of each task are exercised together.

use wfbench::core::dag::{self, WorkflowGraph};
use wfbench::workflow::{document, Author, WorkflowMeta};
use wfbench::{CommandFamily, Error, Topology};

use crate::fixtures::{fixed_stamps, generator, meta};

const SLEEP: CommandFamily = CommandFamily::Sleep { seconds: 30 };

/// Test: Chain structure
/// Given chain sizes 1..=40
/// When generated with WfBench
/// Then the graph is one simple path with N-1 edges
#[test]
fn test_chain_is_a_single_path() {
    for n in 1..=40 {
        let wf = Topology::Chain
            .generate_at(&generator(n, CommandFamily::WfBench), &meta(), fixed_stamps())
            .unwrap();
        let graph = WorkflowGraph::build(&wf).unwrap();

        assert_eq!(graph.task_count(), n);
        assert_eq!(graph.edge_count(), n - 1, "chain of {} edges", n);
        assert_eq!(graph.roots().len(), 1);
        assert_eq!(graph.leaves().len(), 1);
        assert!(graph.is_simple_path());
        dag::validate(&wf).unwrap();
    }
}

/// Test: Fork-join structure
/// Given fork-join sizes 4..=40
/// When generated
/// Then the root fans out to N-2 middles which all fan in to the sink
#[test]
fn test_fork_join_fans_out_and_in() {
    for n in 4..=40 {
        let wf = Topology::ForkJoin
            .generate_at(&generator(n, CommandFamily::WfBench), &meta(), fixed_stamps())
            .unwrap();
        let graph = WorkflowGraph::build(&wf).unwrap();

        let root = graph.roots();
        let sink = graph.leaves();
        assert_eq!(root.len(), 1);
        assert_eq!(sink.len(), 1);
        assert_eq!(root[0].name, "fork_join_00000001");
        assert_eq!(sink[0].name, format!("fork_join_{:08}", n));
        assert_eq!(graph.children_of(&root[0].name).len(), n - 2);
        assert_eq!(graph.parents_of(&sink[0].name).len(), n - 2);
        assert_eq!(graph.edge_count(), 2 * (n - 2));

        for task in &wf.tasks()[1..n - 1] {
            assert_eq!(graph.parents_of(&task.name).len(), 1);
            assert_eq!(graph.children_of(&task.name).len(), 1);
            assert!(graph.has_edge(&root[0].name, &task.name));
            assert!(graph.has_edge(&task.name, &sink[0].name));
        }
        dag::validate(&wf).unwrap();
    }
}

#[test]
fn test_every_file_has_the_uniform_size() {
    for (n, data_mb) in [(1, 1), (3, 100), (7, 100), (10, 10_000), (13, 5)] {
        for topology in [Topology::Chain, Topology::ForkJoin] {
            if n < topology.min_tasks() {
                continue;
            }
            let mut config = generator(n, CommandFamily::WfBench);
            config.resources.data_mb = data_mb;
            let expected = (data_mb * 1000).div_ceil(n as u64);
            assert_eq!(config.file_size_kb(), expected);

            let wf = topology.generate_at(&config, &meta(), fixed_stamps()).unwrap();
            for task in wf.tasks() {
                assert_eq!(task.outputs().count(), 1);
                for file in &task.files {
                    assert_eq!(file.size, expected, "{} in {}", file.name, task.name);
                }
                let out = task.command.arguments[5].clone();
                assert!(out.ends_with(&format!(": {}}}", expected)), "{}", out);
            }
        }
    }
}

#[test]
fn test_sleep_tasks_declare_no_files() {
    for topology in [Topology::Chain, Topology::ForkJoin] {
        let wf = topology
            .generate_at(&generator(6, SLEEP), &meta(), fixed_stamps())
            .unwrap();
        for task in wf.tasks() {
            assert!(task.files.is_empty());
            assert_eq!(task.command.program, "/bin/sleep");
            assert_eq!(task.command.arguments, vec!["30"]);
        }
    }
}

#[test]
fn test_identical_inputs_render_identical_json() {
    for topology in [Topology::Chain, Topology::ForkJoin] {
        let config = generator(9, CommandFamily::WfBench);
        let a = topology.generate_at(&config, &meta(), fixed_stamps()).unwrap();
        let b = topology.generate_at(&config, &meta(), fixed_stamps()).unwrap();
        assert_eq!(document::to_json(&a).unwrap(), document::to_json(&b).unwrap());
    }
}

#[test]
fn test_size_boundaries() {
    assert!(matches!(
        Topology::Chain.generate(&generator(0, SLEEP), &meta()),
        Err(Error::TooFewTasks { min: 1, got: 0, .. })
    ));
    assert!(Topology::Chain.generate(&generator(1, SLEEP), &meta()).is_ok());

    for n in 0..=3 {
        assert!(matches!(
            Topology::ForkJoin.generate(&generator(n, CommandFamily::WfBench), &meta()),
            Err(Error::TooFewTasks { min: 4, .. })
        ));
    }
    let wf = Topology::ForkJoin
        .generate(&generator(4, CommandFamily::WfBench), &meta())
        .unwrap();
    assert_eq!(wf.task_count(), 4);
}

#[test]
fn test_single_task_chain_reads_its_own_input() {
    let wf = Topology::Chain
        .generate_at(&generator(1, CommandFamily::WfBench), &meta(), fixed_stamps())
        .unwrap();
    let task = &wf.tasks()[0];
    assert!(task.is_root() && task.is_leaf());
    let names: Vec<_> = task.files.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["chain_00000001_input.txt", "chain_00000001_output.txt"]);
}

/// Scenario: chain of 3 Sleep tasks, rendered in full.
#[test]
fn test_chain_three_sleep_document() {
    let meta = WorkflowMeta {
        author: Author {
            name: "tester".to_string(),
            email: "support@wfcommons.org".to_string(),
        },
        ..WorkflowMeta::default()
    };
    let wf = Topology::Chain
        .generate_at(&generator(3, SLEEP), &meta, fixed_stamps())
        .unwrap();
    let expected = r#"{
    "name": "Chain-Benchmark",
    "description": "Instance generated with WfCommons - https://wfcommons.org",
    "createdAt": "2024-03-01T12:30:45.000000",
    "schemaVersion": "1.3",
    "author": {
        "name": "tester",
        "email": "support@wfcommons.org"
    },
    "wms": {
        "name": "WfCommons",
        "version": "0.9-dev",
        "url": "https://docs.wfcommons.org/en/v0.9-dev/"
    },
    "workflow": {
        "executedAt": "20240301T123045+0000",
        "makespan": 0,
        "tasks": [
            {
                "name": "chain_00000001",
                "id": "00000001",
                "type": "compute",
                "command": {
                    "program": "/bin/sleep",
                    "arguments": [
                        "30"
                    ]
                },
                "parents": [],
                "children": [
                    "chain_00000002"
                ],
                "files": [],
                "cores": 1
            },
            {
                "name": "chain_00000002",
                "id": "00000002",
                "type": "compute",
                "command": {
                    "program": "/bin/sleep",
                    "arguments": [
                        "30"
                    ]
                },
                "parents": [
                    "chain_00000001"
                ],
                "children": [
                    "chain_00000003"
                ],
                "files": [],
                "cores": 1
            },
            {
                "name": "chain_00000003",
                "id": "00000003",
                "type": "compute",
                "command": {
                    "program": "/bin/sleep",
                    "arguments": [
                        "30"
                    ]
                },
                "parents": [
                    "chain_00000002"
                ],
                "children": [],
                "files": [],
                "cores": 1
            }
        ]
    }
}"#;
    assert_eq!(document::to_json(&wf).unwrap(), expected);
}

/// Scenario: fork-join of 5 WfBench tasks over 100 MB.
#[test]
fn test_fork_join_five_wfbench() {
    let wf = Topology::ForkJoin
        .generate_at(&generator(5, CommandFamily::WfBench), &meta(), fixed_stamps())
        .unwrap();
    assert_eq!(wf.name, "Fork-Join-Benchmark");

    let root = wf.task("fork_join_00000001").unwrap();
    assert_eq!(
        root.children,
        vec!["fork_join_00000002", "fork_join_00000003", "fork_join_00000004"]
    );
    assert_eq!(root.inputs().next().unwrap().name, "fork_join_00000001_input.txt");

    let middle = wf.task("fork_join_00000003").unwrap();
    assert_eq!(middle.parents, vec!["fork_join_00000001"]);
    assert_eq!(middle.children, vec!["fork_join_00000005"]);
    assert_eq!(
        middle.command.arguments,
        vec![
            "fork_join_00000003",
            "--percent-cpu 0.6",
            "--cpu-work 1000",
            "--path-lock /var/lib/condor/execute/cores.txt.lock",
            "--path-cores /var/lib/condor/execute/cores.txt",
            "--out {'fork_join_00000003_output.txt': 20000}",
            "fork_join_00000001_output.txt",
        ]
    );

    let sink = wf.task("fork_join_00000005").unwrap();
    let inputs: Vec<_> = sink.inputs().map(|f| f.name.as_str()).collect();
    assert_eq!(
        inputs,
        vec![
            "fork_join_00000002_output.txt",
            "fork_join_00000003_output.txt",
            "fork_join_00000004_output.txt",
        ]
    );
    assert!(sink.files.iter().all(|f| f.size == 20_000));
}
