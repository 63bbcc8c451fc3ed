//! Synthetic workflow topologies.
//!
//! A [`Topology`] turns a [`GeneratorConfig`] into a [`Workflow`]. Each
//! topology only decides, per task index, which tasks it waits on, which it
//! feeds and which files it consumes. Arguments, file sizes and the document
//! envelope are shared.
//!
//! File sizes divide the total data footprint evenly over the tasks:
//! every file of an instance is `ceil(data_mb * 1000 / num_tasks)` KB, and the
//! `--out` argument carries the same KB value.

pub mod chain;
pub mod fork_join;

use std::path::PathBuf;

use crate::config::Config;
use crate::core::task::{FileDependency, Invocation, Task};
use crate::util::{ceil_div, format_fraction, padded_id};
use crate::workflow::{Timestamps, Workflow, WorkflowMeta};
use crate::{wlog_debug, Error, Result};

/// Largest data footprint in MB whose byte count still fits in a `u64`.
pub const MAX_DATA_MB: u64 = u64::MAX / 1_000_000;

/// Which benchmark program every task runs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CommandFamily {
    /// Sleep for a fixed number of seconds. Declares no files.
    Sleep { seconds: u64 },
    /// Parametrized CPU/IO benchmark reading and writing files.
    WfBench,
}

impl CommandFamily {
    pub fn name(&self) -> &'static str {
        match self {
            CommandFamily::Sleep { .. } => "Sleep",
            CommandFamily::WfBench => "WfBench",
        }
    }
}

/// Per-task resource parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceConfig {
    pub cpu_work: u64,
    /// Fraction of CPU threads in `[0, 1]`.
    pub percent_cpu: f64,
    /// Total data footprint of the workflow in MB.
    pub data_mb: u64,
    /// Holds `cores.txt` and `cores.txt.lock` for CPU-affinity coordination.
    pub lock_dir: PathBuf,
}

impl ResourceConfig {
    pub fn lock_file(&self) -> PathBuf {
        self.lock_dir.join("cores.txt.lock")
    }

    pub fn cores_file(&self) -> PathBuf {
        self.lock_dir.join("cores.txt")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Programs {
    pub sleep: String,
    pub wfbench: String,
}

impl Programs {
    pub fn from_config(config: &Config) -> Self {
        Self {
            sleep: config.sleep_program().to_string(),
            wfbench: config.wfbench_program().to_string(),
        }
    }

    pub fn for_command(&self, command: &CommandFamily) -> &str {
        match command {
            CommandFamily::Sleep { .. } => &self.sleep,
            CommandFamily::WfBench => &self.wfbench,
        }
    }
}

impl Default for Programs {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Everything a topology needs to generate one workflow instance.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorConfig {
    pub num_tasks: usize,
    pub command: CommandFamily,
    pub resources: ResourceConfig,
    pub programs: Programs,
}

impl GeneratorConfig {
    /// Size in KB of every file in the instance.
    pub fn file_size_kb(&self) -> u64 {
        ceil_div(
            self.resources.data_mb.saturating_mul(1000),
            self.num_tasks.max(1) as u64,
        )
    }
}

/// Edges and consumed files of one task, by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Shape {
    pub parents: Vec<String>,
    pub children: Vec<String>,
    pub inputs: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topology {
    Chain,
    ForkJoin,
}

impl Topology {
    /// Human-readable label used in messages.
    pub fn label(&self) -> &'static str {
        match self {
            Topology::Chain => "chain",
            Topology::ForkJoin => "fork-join",
        }
    }

    /// Prefix of task and file names.
    pub fn prefix(&self) -> &'static str {
        match self {
            Topology::Chain => chain::PREFIX,
            Topology::ForkJoin => fork_join::PREFIX,
        }
    }

    /// Stem of saved documents and archives, e.g. `forkjoin-benchmark-10.json`.
    pub fn file_stem(&self) -> &'static str {
        match self {
            Topology::Chain => "chain",
            Topology::ForkJoin => "forkjoin",
        }
    }

    pub fn workflow_name(&self) -> &'static str {
        match self {
            Topology::Chain => "Chain-Benchmark",
            Topology::ForkJoin => "Fork-Join-Benchmark",
        }
    }

    pub fn min_tasks(&self) -> usize {
        match self {
            Topology::Chain => chain::MIN_TASKS,
            Topology::ForkJoin => fork_join::MIN_TASKS,
        }
    }

    pub fn document_file_name(&self, num_tasks: usize) -> String {
        format!("{}-benchmark-{}.json", self.file_stem(), num_tasks)
    }

    /// Reject configurations this topology cannot generate.
    pub fn validate(&self, config: &GeneratorConfig) -> Result<()> {
        if config.num_tasks < self.min_tasks() {
            return Err(Error::TooFewTasks {
                topology: self.label(),
                min: self.min_tasks(),
                got: config.num_tasks,
            });
        }
        let fraction = config.resources.percent_cpu;
        if !(0.0..=1.0).contains(&fraction) {
            return Err(Error::Validation(format!(
                "invalid CPU fraction {} (must be within 0.0 - 1.0)",
                fraction
            )));
        }
        if config.resources.data_mb > MAX_DATA_MB {
            return Err(Error::Validation(format!(
                "data footprint {} MB exceeds the {} MB limit",
                config.resources.data_mb, MAX_DATA_MB
            )));
        }
        Ok(())
    }

    pub fn generate(&self, config: &GeneratorConfig, meta: &WorkflowMeta) -> Result<Workflow> {
        self.generate_at(config, meta, Timestamps::now())
    }

    /// Generate with explicit timestamps; output is otherwise a pure function
    /// of the inputs.
    pub fn generate_at(
        &self,
        config: &GeneratorConfig,
        meta: &WorkflowMeta,
        stamps: Timestamps,
    ) -> Result<Workflow> {
        self.validate(config)?;
        wlog_debug!(
            "Generating {} workflow: tasks={} command={} file_size_kb={}",
            self.label(),
            config.num_tasks,
            config.command.name(),
            config.file_size_kb()
        );

        let tasks = (1..=config.num_tasks)
            .map(|i| self.build_task(i, config))
            .collect();
        Ok(Workflow::new(self.workflow_name(), tasks, meta, stamps))
    }

    fn shape(&self, i: usize, n: usize) -> Shape {
        match self {
            Topology::Chain => chain::shape(i, n),
            Topology::ForkJoin => fork_join::shape(i, n),
        }
    }

    fn build_task(&self, i: usize, config: &GeneratorConfig) -> Task {
        let prefix = self.prefix();
        let name = task_name(prefix, i);
        let shape = self.shape(i, config.num_tasks);

        let (arguments, files) = match config.command {
            CommandFamily::Sleep { seconds } => (vec![seconds.to_string()], Vec::new()),
            CommandFamily::WfBench => {
                let size_kb = config.file_size_kb();
                let output = output_file(prefix, i);
                let arguments =
                    wfbench_arguments(&name, &output, size_kb, &shape.inputs, &config.resources);
                let files = shape
                    .inputs
                    .iter()
                    .map(|f| FileDependency::input(f.clone(), size_kb))
                    .chain(std::iter::once(FileDependency::output(output, size_kb)))
                    .collect();
                (arguments, files)
            }
        };

        let command = Invocation {
            program: config.programs.for_command(&config.command).to_string(),
            arguments,
        };
        Task::compute(name, padded_id(i), command)
            .with_parents(shape.parents)
            .with_children(shape.children)
            .with_files(files)
    }
}

impl std::fmt::Display for Topology {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

fn wfbench_arguments(
    name: &str,
    output: &str,
    size_kb: u64,
    inputs: &[String],
    resources: &ResourceConfig,
) -> Vec<String> {
    let mut arguments = vec![
        name.to_string(),
        format!("--percent-cpu {}", format_fraction(resources.percent_cpu)),
        format!("--cpu-work {}", resources.cpu_work),
        format!("--path-lock {}", resources.lock_file().display()),
        format!("--path-cores {}", resources.cores_file().display()),
        format!("--out {{'{}': {}}}", output, size_kb),
    ];
    arguments.extend(inputs.iter().cloned());
    arguments
}

pub(crate) fn task_name(prefix: &str, i: usize) -> String {
    format!("{}_{}", prefix, padded_id(i))
}

pub(crate) fn output_file(prefix: &str, i: usize) -> String {
    format!("{}_output.txt", task_name(prefix, i))
}

pub(crate) fn input_file(prefix: &str, i: usize) -> String {
    format!("{}_input.txt", task_name(prefix, i))
}
