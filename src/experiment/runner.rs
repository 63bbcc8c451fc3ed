//! Trial execution against the external workflow management system.
//!
//! Each trial gets a fresh work directory, a generated benchmark, a
//! translated and executed workflow, and finally a tarball of the run
//! directory the executor leaves behind. A failing trial is recorded in the
//! [`BatchReport`] and the batch moves on.

use std::collections::BTreeMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::process::Command;
use walkdir::WalkDir;

use super::config::{ExperimentConfig, TrialPoint};
use crate::benchmark;
use crate::config::Config;
use crate::recipe::{RecipeGenerator, RecipeParams, WorkflowKind};
use crate::topology::{CommandFamily, GeneratorConfig, Programs, ResourceConfig};
use crate::util::{self, fresh_dir, with_optional_timeout};
use crate::workflow::WorkflowMeta;
use crate::{wlog, wlog_debug, wlog_error, wlog_warn, Error, Result};

const TRANSLATED_SCRIPT: &str = "pegasus-workflow.py";
const RUN_MARKER_SUFFIX: &str = ".dag.dagman.out";

/// The external translator and executor.
pub trait WorkflowExecutor {
    /// Turn a workflow document into an executor script inside `work_dir`.
    fn translate(&self, document: &Path, work_dir: &Path)
        -> impl Future<Output = Result<()>> + Send;

    /// Submit the translated workflow and wait for it to finish. Dropping
    /// the future must stop the run, so a timed-out trial cannot write into
    /// the next trial's work directory.
    fn execute(&self, work_dir: &Path) -> impl Future<Output = Result<()>> + Send;
}

/// Translator command plus `bash <script> <work_dir> <bin_dir>` executor.
#[derive(Debug, Clone)]
pub struct ExternalExecutor {
    translator: Vec<String>,
    script: PathBuf,
    bin_dir: PathBuf,
}

impl ExternalExecutor {
    pub fn new(translator: &str, script: PathBuf, bin_dir: PathBuf) -> Result<Self> {
        let translator: Vec<String> = translator.split_whitespace().map(String::from).collect();
        let program = translator
            .first()
            .ok_or_else(|| Error::Validation("Translator command cannot be empty".to_string()))?;
        which::which(program).map_err(|_| Error::ExecutorNotAvailable(program.clone()))?;
        which::which("bash").map_err(|_| Error::ExecutorNotAvailable("bash".to_string()))?;
        Ok(Self {
            translator,
            script,
            bin_dir,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            config.translator_command(),
            config.executor_script(),
            config.benchmark_bin_dir(),
        )
    }

    /// Translate `document` into the executor script at `script`.
    pub async fn translate_to(&self, document: &Path, script: &Path) -> Result<()> {
        let output = Command::new(&self.translator[0])
            .args(&self.translator[1..])
            .arg(document)
            .arg(script)
            .kill_on_drop(true)
            .output()
            .await?;
        if !output.status.success() {
            return Err(Error::Subprocess(format!(
                "translator failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        wlog_debug!("Translated {} into {}", document.display(), script.display());
        Ok(())
    }
}

impl WorkflowExecutor for ExternalExecutor {
    async fn translate(&self, document: &Path, work_dir: &Path) -> Result<()> {
        self.translate_to(document, &work_dir.join(TRANSLATED_SCRIPT)).await
    }

    async fn execute(&self, work_dir: &Path) -> Result<()> {
        let work_dir = std::fs::canonicalize(work_dir)?;
        let status = Command::new("bash")
            .arg(&self.script)
            .arg(&work_dir)
            .arg(&self.bin_dir)
            .kill_on_drop(true)
            .status()
            .await?;
        // Completion is judged by the run marker, not the exit status.
        if !status.success() {
            wlog_warn!("Executor exited with {} for {}", status, work_dir.display());
        }
        Ok(())
    }
}

/// Run directory of a completed execution: the parent of the first
/// `*.dag.dagman.out` file under `work_dir/work/**/pegasus/`.
pub fn find_run_dir(work_dir: &Path) -> Result<PathBuf> {
    let root = work_dir.join("work");
    WalkDir::new(&root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .find(|entry| {
            entry.file_name().to_string_lossy().ends_with(RUN_MARKER_SUFFIX)
                && entry
                    .path()
                    .strip_prefix(&root)
                    .map(|rel| rel.components().any(|c| c.as_os_str() == "pegasus"))
                    .unwrap_or(false)
        })
        .and_then(|entry| entry.path().parent().map(Path::to_path_buf))
        .ok_or_else(|| Error::MissingRunMarker(root.display().to_string()))
}

/// Compress `run_dir` into `tar_file`, storing it under its own name.
pub async fn archive_run_dir(run_dir: &Path, tar_file: &Path) -> Result<()> {
    let parent = run_dir
        .parent()
        .ok_or_else(|| Error::Validation(format!("{} has no parent", run_dir.display())))?;
    let name = run_dir
        .file_name()
        .ok_or_else(|| Error::Validation(format!("{} has no name", run_dir.display())))?;
    let output = Command::new("tar")
        .arg("-czf")
        .arg(tar_file)
        .arg("-C")
        .arg(parent)
        .arg(name)
        .output()
        .await?;
    if !output.status.success() {
        return Err(Error::Subprocess(format!(
            "tar failed for {}: {}",
            run_dir.display(),
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct TrialFailure {
    pub point: TrialPoint,
    pub error: String,
}

/// Outcome of a batch.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub archives: Vec<PathBuf>,
    pub failures: Vec<TrialFailure>,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn summary(&self) -> String {
        format!(
            "{} trials archived, {} failed",
            self.archives.len(),
            self.failures.len()
        )
    }
}

/// Settings shared by every trial of a batch.
#[derive(Debug, Clone)]
pub struct RunnerSettings {
    pub work_dir: PathBuf,
    pub lock_dir: PathBuf,
    pub programs: Programs,
    pub meta: WorkflowMeta,
    pub trial_timeout: Option<Duration>,
}

impl RunnerSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            work_dir: config.work_dir(),
            lock_dir: config.lock_dir(),
            programs: Programs::from_config(config),
            meta: WorkflowMeta::from_config(config),
            trial_timeout: config.trial_timeout(),
        }
    }
}

pub struct ExperimentRunner<E, R> {
    executor: E,
    recipes: Arc<R>,
    settings: RunnerSettings,
}

impl<E, R> ExperimentRunner<E, R>
where
    E: WorkflowExecutor,
    R: RecipeGenerator + Send + Sync + 'static,
{
    pub fn new(executor: E, recipes: R, settings: RunnerSettings) -> Self {
        Self {
            executor,
            recipes: Arc::new(recipes),
            settings,
        }
    }

    /// Run every trial of the batch. Trial failures are collected, not
    /// propagated.
    pub async fn run_batch(
        &self,
        config: &ExperimentConfig,
        sizes: &BTreeMap<usize, usize>,
    ) -> BatchReport {
        let mut report = BatchReport::default();
        let trials = config.trials(sizes);
        wlog!("Starting batch of {} trials for {}", trials.len(), config.workflow);

        for point in trials {
            match self.run_trial(config, &point).await {
                Ok(archive) => report.archives.push(archive),
                Err(e) => {
                    let name = config.archive_name(&point);
                    wlog_error!("Trial {} failed: {}", name, e);
                    eprintln!("Trial {} failed: {}", name, e);
                    report.failures.push(TrialFailure {
                        point,
                        error: e.to_string(),
                    });
                }
            }
        }

        wlog!("Batch finished: {}", report.summary());
        report
    }

    /// Generate, execute and archive one trial. Returns the archive path.
    pub async fn run_trial(&self, config: &ExperimentConfig, point: &TrialPoint) -> Result<PathBuf> {
        let work_dir = self.settings.work_dir.clone();
        {
            let work_dir = work_dir.clone();
            util::blocking(move || fresh_dir(&work_dir)).await?;
        }

        let document = self.create_benchmark(config.workflow, point).await?;

        with_optional_timeout(self.settings.trial_timeout, async {
            self.executor.translate(&document, &work_dir).await?;
            self.executor.execute(&work_dir).await
        })
        .await?;

        let run_dir = {
            let work_dir = work_dir.clone();
            util::blocking(move || find_run_dir(&work_dir)).await?
        };

        let tar_file = config.output_dir.join(config.archive_name(point));
        archive_run_dir(&run_dir, &tar_file).await?;
        wlog!("Archived {} to {}", run_dir.display(), tar_file.display());
        Ok(tar_file)
    }

    async fn create_benchmark(&self, kind: WorkflowKind, point: &TrialPoint) -> Result<PathBuf> {
        let work_dir = self.settings.work_dir.clone();
        let lock_dir = self.settings.lock_dir.clone();

        match kind.topology() {
            Some(topology) => {
                let config = GeneratorConfig {
                    num_tasks: point.desired_tasks,
                    command: CommandFamily::WfBench,
                    resources: ResourceConfig {
                        cpu_work: point.cpu_work,
                        percent_cpu: point.cpu_fraction,
                        data_mb: point.data_footprint,
                        lock_dir,
                    },
                    programs: self.settings.programs.clone(),
                };
                let meta = self.settings.meta.clone();
                util::blocking(move || {
                    benchmark::materialize(topology, &config, &meta, &work_dir).map(|b| b.document)
                })
                .await
            }
            None => {
                let recipes = Arc::clone(&self.recipes);
                let params = RecipeParams {
                    cpu_work: point.cpu_work,
                    data: point.data_footprint,
                    percent_cpu: point.cpu_fraction,
                    lock_dir: Some(lock_dir),
                };
                let num_tasks = point.desired_tasks;
                util::blocking(move || {
                    recipes.create_benchmark(kind, num_tasks, &work_dir, &params)
                })
                .await
            }
        }
    }
}
