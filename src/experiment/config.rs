//! Validated parameters of an experiment batch.

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::recipe::{SizeRequest, WorkflowKind};
use crate::topology::MAX_DATA_MB;
use crate::util::format_fraction;
use crate::{Error, Result};

/// Compute-node CPU architecture, recorded in archive names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Architecture {
    Haswell,
    Skylake,
    Cascadelake,
}

impl Architecture {
    pub fn as_str(&self) -> &'static str {
        match self {
            Architecture::Haswell => "haswell",
            Architecture::Skylake => "skylake",
            Architecture::Cascadelake => "cascadelake",
        }
    }
}

impl std::fmt::Display for Architecture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Architecture {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "haswell" => Ok(Architecture::Haswell),
            "skylake" => Ok(Architecture::Skylake),
            "cascadelake" => Ok(Architecture::Cascadelake),
            other => Err(Error::Validation(format!(
                "unknown architecture '{}' (expected haswell|skylake|cascadelake)",
                other
            ))),
        }
    }
}

/// Batch parameters as given on the command line.
#[derive(Debug, Clone, PartialEq)]
pub struct ExperimentArgs {
    pub architecture: Architecture,
    pub workflow: WorkflowKind,
    pub num_compute_nodes: usize,
    pub num_trials: usize,
    pub cpu_work: Vec<u64>,
    pub cpu_fraction: Vec<f64>,
    /// Total data footprint in MB.
    pub data_footprint: Vec<u64>,
    pub output_dir: PathBuf,
    pub size_factors: Vec<f64>,
    pub sizes: Vec<usize>,
}

/// A batch whose parameters passed validation. Value lists are sorted and
/// free of duplicates.
#[derive(Debug, Clone, PartialEq)]
pub struct ExperimentConfig {
    pub architecture: Architecture,
    pub workflow: WorkflowKind,
    pub num_compute_nodes: usize,
    pub num_trials: usize,
    pub cpu_work: Vec<u64>,
    pub cpu_fraction: Vec<f64>,
    pub data_footprint: Vec<u64>,
    pub output_dir: PathBuf,
    pub size_request: SizeRequest,
}

impl ExperimentArgs {
    /// Check every parameter before any trial touches the filesystem.
    pub fn validate(self) -> Result<ExperimentConfig> {
        if self.num_compute_nodes < 1 {
            return Err(Error::Validation(
                "invalid -n/--num-compute-nodes value".to_string(),
            ));
        }
        if self.num_trials < 1 {
            return Err(Error::Validation("invalid -t/--num-trials value".to_string()));
        }
        if !self.output_dir.is_dir() {
            return Err(Error::MissingOutputDir(
                self.output_dir.display().to_string(),
            ));
        }
        if self.cpu_work.is_empty() || self.cpu_fraction.is_empty() || self.data_footprint.is_empty()
        {
            return Err(Error::Validation(
                "at least one CPU work, CPU fraction and data footprint value is required"
                    .to_string(),
            ));
        }
        if let Some(bad) = self
            .cpu_fraction
            .iter()
            .find(|f| !(0.0..=1.0).contains(*f))
        {
            return Err(Error::Validation(format!(
                "invalid CPU fraction value '{}'",
                bad
            )));
        }
        if let Some(bad) = self.data_footprint.iter().find(|&&d| d > MAX_DATA_MB) {
            return Err(Error::Validation(format!(
                "invalid data footprint value '{}' (must be at most {} MB)",
                bad, MAX_DATA_MB
            )));
        }

        let size_request = match (self.size_factors.is_empty(), self.sizes.is_empty()) {
            (false, true) => {
                if !self.workflow.is_recipe() {
                    return Err(Error::Validation(format!(
                        "cannot use -s/--workflow-size-factor with the synthetic {} workflow",
                        self.workflow
                    )));
                }
                if let Some(bad) = self
                    .size_factors
                    .iter()
                    .find(|f| !(f.is_finite() && **f > 0.0))
                {
                    return Err(Error::Validation(format!(
                        "invalid workflow size factor '{}' (must be positive)",
                        bad
                    )));
                }
                SizeRequest::Factors(sorted_floats(self.size_factors))
            }
            (true, false) => {
                let topology = self.workflow.topology().ok_or_else(|| {
                    Error::Validation(format!(
                        "cannot use -S/--workflow-size with the recipe workflow {}",
                        self.workflow
                    ))
                })?;
                let sizes = sorted(self.sizes);
                if let Some(&smallest) = sizes.first() {
                    if smallest < topology.min_tasks() {
                        return Err(Error::TooFewTasks {
                            topology: topology.label(),
                            min: topology.min_tasks(),
                            got: smallest,
                        });
                    }
                }
                SizeRequest::Sizes(sizes)
            }
            _ => {
                return Err(Error::Validation(
                    "exactly one of -s/--workflow-size-factor or -S/--workflow-size is required"
                        .to_string(),
                ))
            }
        };

        Ok(ExperimentConfig {
            architecture: self.architecture,
            workflow: self.workflow,
            num_compute_nodes: self.num_compute_nodes,
            num_trials: self.num_trials,
            cpu_work: sorted(self.cpu_work),
            cpu_fraction: sorted_floats(self.cpu_fraction),
            data_footprint: sorted(self.data_footprint),
            output_dir: self.output_dir,
            size_request,
        })
    }
}

fn sorted<T: Ord>(mut values: Vec<T>) -> Vec<T> {
    values.sort();
    values.dedup();
    values
}

fn sorted_floats(mut values: Vec<f64>) -> Vec<f64> {
    values.sort_by(f64::total_cmp);
    values.dedup();
    values
}

/// One parameter point of a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct TrialPoint {
    pub desired_tasks: usize,
    pub cpu_fraction: f64,
    pub cpu_work: u64,
    pub data_footprint: u64,
    pub trial: usize,
}

impl ExperimentConfig {
    /// Every trial of the batch, in execution order.
    pub fn trials(&self, sizes: &BTreeMap<usize, usize>) -> Vec<TrialPoint> {
        let mut points = Vec::new();
        for &desired_tasks in sizes.keys() {
            for &cpu_fraction in &self.cpu_fraction {
                for &cpu_work in &self.cpu_work {
                    for &data_footprint in &self.data_footprint {
                        for trial in 0..self.num_trials {
                            points.push(TrialPoint {
                                desired_tasks,
                                cpu_fraction,
                                cpu_work,
                                data_footprint,
                                trial,
                            });
                        }
                    }
                }
            }
        }
        points
    }

    /// `<workflow>-<tasks>-<cpu_work>-<fraction>-<data>-<arch>-<nodes>-<trial>.tar.gz`
    pub fn archive_name(&self, point: &TrialPoint) -> String {
        format!(
            "{}-{}-{}-{}-{}-{}-{}-{}.tar.gz",
            self.workflow,
            point.desired_tasks,
            point.cpu_work,
            format_fraction(point.cpu_fraction),
            point.data_footprint,
            self.architecture,
            self.num_compute_nodes,
            point.trial
        )
    }
}
