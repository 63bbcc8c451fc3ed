//! Makespan sanity checks over experiment results.
//!
//! Result documents are named
//! `<workflow>-<tasks>-<cpu_work>-<fraction>-<data>-<arch>-<nodes>-<trial>.json`
//! and carry `workflow.execution.makespanInSeconds`. For each parameter
//! dimension, results that agree on every other parameter are ordered by that
//! dimension and adjacent mean makespans are compared: more CPU work or more
//! data should not run faster, and more compute nodes should not run slower.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::{wlog_debug, wlog_warn, Result};

/// `<workflow>-<tasks>-<cpu_work>-<fraction>-<data>-<arch>-<nodes>-<trial>.json`
static RESULT_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<workflow>[^-]+)-(?P<tasks>\d+)-(?P<cpu>\d+)-(?P<fraction>[0-9.]+)-(?P<data>\d+)-(?P<arch>[^-]+)-(?P<nodes>\d+)-(?P<trial>[^.]+)\.json$",
    )
    .unwrap()
});

/// Parameters encoded in a result file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultParams {
    pub workflow: String,
    pub num_tasks: usize,
    pub cpu_work: u64,
    pub cpu_fraction: String,
    pub data_footprint: u64,
    pub architecture: String,
    pub compute_nodes: u64,
}

impl ResultParams {
    pub fn parse(file_name: &str) -> Option<Self> {
        let caps = RESULT_NAME_RE.captures(file_name)?;
        Some(Self {
            workflow: caps["workflow"].to_string(),
            num_tasks: caps["tasks"].parse().ok()?,
            cpu_work: caps["cpu"].parse().ok()?,
            cpu_fraction: caps["fraction"].to_string(),
            data_footprint: caps["data"].parse().ok()?,
            architecture: caps["arch"].to_string(),
            compute_nodes: caps["nodes"].parse().ok()?,
        })
    }

    fn value(&self, dimension: Dimension) -> u64 {
        match dimension {
            Dimension::CpuWork => self.cpu_work,
            Dimension::DataFootprint => self.data_footprint,
            Dimension::ComputeNodes => self.compute_nodes,
        }
    }

    /// Every parameter except `dimension` (and the trial).
    fn group_key(&self, dimension: Dimension) -> GroupKey {
        let keep = |d: Dimension| if d == dimension { 0 } else { self.value(d) };
        (
            self.workflow.clone(),
            self.num_tasks,
            self.cpu_fraction.clone(),
            self.architecture.clone(),
            keep(Dimension::CpuWork),
            keep(Dimension::DataFootprint),
            keep(Dimension::ComputeNodes),
        )
    }
}

type GroupKey = (String, usize, String, String, u64, u64, u64);

#[derive(Debug, Clone, PartialEq)]
pub struct RunResult {
    pub params: ResultParams,
    pub makespan: f64,
}

/// Load every result document in `dir`. Files whose names or contents do not
/// match are skipped with a warning.
pub fn load_results(dir: &Path) -> Result<Vec<RunResult>> {
    let mut results = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let Some(name) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            continue;
        };
        if !name.ends_with(".json") {
            continue;
        }
        let Some(params) = ResultParams::parse(&name) else {
            wlog_warn!("Skipping result with unrecognized name: {}", name);
            continue;
        };
        match read_makespan(&path) {
            Ok(Some(makespan)) => results.push(RunResult { params, makespan }),
            Ok(None) => wlog_warn!("Skipping {}: no makespanInSeconds", name),
            Err(e) => wlog_warn!("Skipping {}: {}", name, e),
        }
    }
    wlog_debug!("Loaded {} results from {}", results.len(), dir.display());
    Ok(results)
}

fn read_makespan(path: &Path) -> Result<Option<f64>> {
    let value: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(path)?)?;
    Ok(value["workflow"]["execution"]["makespanInSeconds"].as_f64())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Dimension {
    CpuWork,
    DataFootprint,
    ComputeNodes,
}

impl Dimension {
    pub const ALL: [Dimension; 3] = [
        Dimension::CpuWork,
        Dimension::DataFootprint,
        Dimension::ComputeNodes,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Dimension::CpuWork => "CPU work",
            Dimension::DataFootprint => "Data footprint",
            Dimension::ComputeNodes => "Compute node",
        }
    }

    /// Whether going from `current` to the next larger value is sane.
    fn is_sane(&self, current: f64, next: f64) -> bool {
        match self {
            Dimension::CpuWork | Dimension::DataFootprint => current <= next,
            Dimension::ComputeNodes => current >= next,
        }
    }
}

impl std::str::FromStr for Dimension {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "cpu-work" => Ok(Dimension::CpuWork),
            "data-footprint" => Ok(Dimension::DataFootprint),
            "compute-nodes" => Ok(Dimension::ComputeNodes),
            other => Err(crate::Error::Validation(format!(
                "unknown sanity dimension '{}' (expected cpu-work|data-footprint|compute-nodes)",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    pub sane: usize,
    pub insane: usize,
}

/// Sanity tallies for one workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowReport {
    pub workflow: String,
    pub tallies: BTreeMap<Dimension, Tally>,
}

impl fmt::Display for WorkflowReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}:", self.workflow)?;
        for (dimension, tally) in &self.tallies {
            writeln!(
                f,
                "  {} sanity={}  insanity={}",
                dimension.label(),
                tally.sane,
                tally.insane
            )?;
        }
        Ok(())
    }
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Tally adjacent-value comparisons along `dimension`, per workflow.
pub fn check(results: &[RunResult], dimension: Dimension) -> BTreeMap<String, Tally> {
    let mut groups: BTreeMap<GroupKey, BTreeMap<u64, Vec<f64>>> = BTreeMap::new();
    for result in results {
        groups
            .entry(result.params.group_key(dimension))
            .or_default()
            .entry(result.params.value(dimension))
            .or_default()
            .push(result.makespan);
    }

    let mut tallies: BTreeMap<String, Tally> = BTreeMap::new();
    for (key, by_value) in groups {
        let tally = tallies.entry(key.0).or_default();
        let means: Vec<f64> = by_value.values().map(|m| mean(m)).collect();
        for pair in means.windows(2) {
            if dimension.is_sane(pair[0], pair[1]) {
                tally.sane += 1;
            } else {
                tally.insane += 1;
            }
        }
    }
    tallies
}

/// Per-workflow report over the requested dimensions, sorted by workflow.
pub fn report(results: &[RunResult], dimensions: &[Dimension]) -> Vec<WorkflowReport> {
    let mut reports: BTreeMap<String, WorkflowReport> = BTreeMap::new();
    for result in results {
        reports
            .entry(result.params.workflow.clone())
            .or_insert_with(|| WorkflowReport {
                workflow: result.params.workflow.clone(),
                tallies: BTreeMap::new(),
            });
    }
    for &dimension in dimensions {
        for (workflow, tally) in check(results, dimension) {
            if let Some(report) = reports.get_mut(&workflow) {
                report.tallies.insert(dimension, tally);
            }
        }
    }
    reports.into_values().collect()
}
