//! Workflow kinds and size resolution for recipe-backed benchmarks.
//!
//! Real-application recipes (seismology, montage, ...) are produced by an
//! external generator. The requested task count is only a target for them, so
//! the achievable sizes are discovered by probing the generator and reading
//! the task count back from the document it writes.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::topology::Topology;
use crate::util::format_fraction;
use crate::{wlog_debug, wlog_trace, Error, Result};

/// Default number of sizes tried when looking for a recipe's minimum.
pub const MAX_PROBE: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum WorkflowKind {
    Seismology,
    Montage,
    Genome,
    Soykb,
    Cycles,
    Epigenomics,
    Bwa,
    Chain,
    ForkJoin,
}

impl WorkflowKind {
    pub const ALL: [WorkflowKind; 9] = [
        WorkflowKind::Seismology,
        WorkflowKind::Montage,
        WorkflowKind::Genome,
        WorkflowKind::Soykb,
        WorkflowKind::Cycles,
        WorkflowKind::Epigenomics,
        WorkflowKind::Bwa,
        WorkflowKind::Chain,
        WorkflowKind::ForkJoin,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowKind::Seismology => "seismology",
            WorkflowKind::Montage => "montage",
            WorkflowKind::Genome => "genome",
            WorkflowKind::Soykb => "soykb",
            WorkflowKind::Cycles => "cycles",
            WorkflowKind::Epigenomics => "epigenomics",
            WorkflowKind::Bwa => "bwa",
            WorkflowKind::Chain => "chain",
            WorkflowKind::ForkJoin => "forkjoin",
        }
    }

    /// The synthetic topology, or `None` for recipe-backed kinds.
    pub fn topology(&self) -> Option<Topology> {
        match self {
            WorkflowKind::Chain => Some(Topology::Chain),
            WorkflowKind::ForkJoin => Some(Topology::ForkJoin),
            _ => None,
        }
    }

    pub fn is_recipe(&self) -> bool {
        self.topology().is_none()
    }
}

impl std::fmt::Display for WorkflowKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for WorkflowKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        WorkflowKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| Error::UnknownWorkflow(s.to_string()))
    }
}

/// Benchmark parameters forwarded to the recipe generator.
#[derive(Debug, Clone, PartialEq)]
pub struct RecipeParams {
    pub cpu_work: u64,
    pub data: u64,
    pub percent_cpu: f64,
    pub lock_dir: Option<PathBuf>,
}

impl RecipeParams {
    /// Parameters used when only the shape of a recipe matters.
    pub fn probe() -> Self {
        Self {
            cpu_work: 0,
            data: 0,
            percent_cpu: 1.0,
            lock_dir: None,
        }
    }
}

/// Produces benchmark documents for real-application recipes.
pub trait RecipeGenerator {
    /// Generate a benchmark of roughly `num_tasks` tasks into `save_dir` and
    /// return the path of its JSON document.
    fn create_benchmark(
        &self,
        recipe: WorkflowKind,
        num_tasks: usize,
        save_dir: &Path,
        params: &RecipeParams,
    ) -> Result<PathBuf>;
}

/// Recipe generator run as a subprocess.
///
/// Invoked as `<command> <recipe> <num_tasks> <save_dir> <cpu_work> <data>
/// <percent_cpu> [lock_dir]`; prints the generated document path on stdout.
#[derive(Debug, Clone)]
pub struct ExternalRecipe {
    command: String,
}

impl ExternalRecipe {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

impl RecipeGenerator for ExternalRecipe {
    fn create_benchmark(
        &self,
        recipe: WorkflowKind,
        num_tasks: usize,
        save_dir: &Path,
        params: &RecipeParams,
    ) -> Result<PathBuf> {
        let mut parts = self.command.split_whitespace();
        let program = parts
            .next()
            .ok_or_else(|| Error::Validation("Recipe command cannot be empty".to_string()))?;

        let mut cmd = Command::new(program);
        cmd.args(parts)
            .arg(recipe.as_str())
            .arg(num_tasks.to_string())
            .arg(save_dir)
            .arg(params.cpu_work.to_string())
            .arg(params.data.to_string())
            .arg(format_fraction(params.percent_cpu));
        if let Some(lock_dir) = &params.lock_dir {
            cmd.arg(lock_dir);
        }

        wlog_trace!("Recipe command: {:?}", cmd);
        let output = cmd.output()?;
        if !output.status.success() {
            return Err(Error::Subprocess(format!(
                "recipe generator failed for {} ({} tasks): {}",
                recipe,
                num_tasks,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        let path = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if path.is_empty() {
            return Err(Error::Subprocess(format!(
                "recipe generator printed no document path for {}",
                recipe
            )));
        }
        Ok(PathBuf::from(path))
    }
}

/// Number of tasks in a generated document.
pub fn count_tasks(document: &Path) -> Result<usize> {
    let value: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(document)?)?;
    value["workflow"]["tasks"]
        .as_array()
        .map(|tasks| tasks.len())
        .ok_or_else(|| {
            Error::Validation(format!(
                "{} has no workflow.tasks array",
                document.display()
            ))
        })
}

/// Smallest size parameter for which the recipe generator succeeds.
///
/// Tries `0, 1, 2, ...` up to `max_probe` and stops at the first success.
pub fn min_workflow_size<G: RecipeGenerator + ?Sized>(
    generator: &G,
    recipe: WorkflowKind,
    scratch: &Path,
    max_probe: usize,
) -> Result<usize> {
    let params = RecipeParams::probe();
    for size in 0..max_probe {
        match generator
            .create_benchmark(recipe, size, scratch, &params)
            .and_then(|path| count_tasks(&path))
        {
            Ok(_) => {
                wlog_debug!("Minimum size for {} is {}", recipe, size);
                return Ok(size);
            }
            Err(e) => wlog_trace!("Probe {} size {} failed: {}", recipe, size, e),
        }
    }
    Err(Error::RecipeProbe {
        recipe: recipe.to_string(),
        reason: format!("no size below {} produced a workflow", max_probe),
    })
}

/// Requested workflow sizes for a batch.
#[derive(Debug, Clone, PartialEq)]
pub enum SizeRequest {
    /// Multiples of a recipe's minimum size.
    Factors(Vec<f64>),
    /// Exact task counts (synthetic topologies only).
    Sizes(Vec<usize>),
}

/// Map each desired task count to the count actually generated.
///
/// Exact sizes map to themselves and leave `scratch` untouched. Factors are
/// applied to the recipe's probed minimum and the actual count is read back
/// from a document generated under `scratch`, which is created on demand.
pub fn resolve_sizes<G: RecipeGenerator + ?Sized>(
    generator: &G,
    kind: WorkflowKind,
    request: &SizeRequest,
    scratch: &Path,
) -> Result<BTreeMap<usize, usize>> {
    match request {
        SizeRequest::Sizes(sizes) => Ok(sizes.iter().map(|&s| (s, s)).collect()),
        SizeRequest::Factors(factors) => {
            if !kind.is_recipe() {
                return Err(Error::Validation(format!(
                    "size factors only apply to recipe workflows, not {}",
                    kind
                )));
            }
            std::fs::create_dir_all(scratch)?;
            let min = min_workflow_size(generator, kind, scratch, MAX_PROBE)?;
            let params = RecipeParams::probe();
            let mut sizes = BTreeMap::new();
            for factor in factors {
                let desired = (min as f64 * factor) as usize;
                let path = generator.create_benchmark(kind, desired, scratch, &params)?;
                let actual = count_tasks(&path)?;
                wlog_debug!("{} factor {}: desired={} actual={}", kind, factor, desired, actual);
                sizes.insert(desired, actual);
            }
            Ok(sizes)
        }
    }
}
