//! Test fixtures for integration tests.
//!
//! Provides helpers for:
//! - Fixed timestamps and generator configurations
//! - Mock executors that fake a completed run directory
//! - A recipe generator that writes documents of a chosen size

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use chrono::{FixedOffset, TimeZone, Utc};

use wfbench::config::Config;
use wfbench::experiment::{RunnerSettings, WorkflowExecutor};
use wfbench::recipe::{RecipeGenerator, RecipeParams, WorkflowKind};
use wfbench::{
    CommandFamily, Error, GeneratorConfig, Programs, ResourceConfig, Result, Timestamps,
    WorkflowMeta,
};

pub const LOCK_DIR: &str = "/var/lib/condor/execute";

/// Timestamps frozen at 2024-03-01 12:30:45 UTC.
pub fn fixed_stamps() -> Timestamps {
    Timestamps {
        created_at: Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 45).unwrap(),
        executed_at: FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2024, 3, 1, 12, 30, 45)
            .unwrap(),
    }
}

/// Generator config with 1000 CPU work, 0.6 CPU fraction and 100 MB of data.
pub fn generator(num_tasks: usize, command: CommandFamily) -> GeneratorConfig {
    GeneratorConfig {
        num_tasks,
        command,
        resources: ResourceConfig {
            cpu_work: 1000,
            percent_cpu: 0.6,
            data_mb: 100,
            lock_dir: PathBuf::from(LOCK_DIR),
        },
        programs: Programs::default(),
    }
}

pub fn meta() -> WorkflowMeta {
    WorkflowMeta::default()
}

/// Runner settings rooted in a temporary directory.
pub fn settings(root: &Path) -> RunnerSettings {
    RunnerSettings {
        work_dir: root.join("work-dir"),
        lock_dir: root.join("locks"),
        programs: Programs::from_config(&Config::default()),
        meta: WorkflowMeta::default(),
        trial_timeout: None,
    }
}

/// Pretends to translate and run a workflow.
///
/// `translate` writes the script file; `execute` lays out
/// `work/cc/pegasus/<name>/run0001/<name>-0.dag.dagman.out` unless the
/// execution number (1-based) is listed in `skip_marker`.
#[derive(Default)]
pub struct MockExecutor {
    pub skip_marker: HashSet<usize>,
    pub fail_translate: bool,
    pub delay: Option<Duration>,
    pub executions: AtomicUsize,
    pub documents: Mutex<Vec<PathBuf>>,
}

impl MockExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn skipping(executions: &[usize]) -> Self {
        Self {
            skip_marker: executions.iter().copied().collect(),
            ..Self::default()
        }
    }

    pub fn execution_count(&self) -> usize {
        self.executions.load(Ordering::SeqCst)
    }
}

impl WorkflowExecutor for MockExecutor {
    async fn translate(&self, document: &Path, work_dir: &Path) -> Result<()> {
        if self.fail_translate {
            return Err(Error::Subprocess("translator failed: mock".to_string()));
        }
        if !document.is_file() {
            return Err(Error::Validation(format!(
                "{} does not exist",
                document.display()
            )));
        }
        self.documents.lock().unwrap().push(document.to_path_buf());
        std::fs::write(
            work_dir.join("pegasus-workflow.py"),
            document.display().to_string(),
        )?;
        Ok(())
    }

    async fn execute(&self, work_dir: &Path) -> Result<()> {
        let n = self.executions.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.skip_marker.contains(&n) {
            return Ok(());
        }
        let run = work_dir.join("work/cc/pegasus/benchmark/run0001");
        std::fs::create_dir_all(&run)?;
        std::fs::write(run.join("benchmark-0.dag.dagman.out"), format!("run {}", n))?;
        std::fs::write(run.join("stats.json"), "{}")?;
        Ok(())
    }
}

/// Recipe generator that succeeds from `min` upward and writes a document
/// with `num_tasks + extra` tasks.
pub struct FakeRecipe {
    pub min: usize,
    pub extra: usize,
    pub calls: AtomicUsize,
}

impl FakeRecipe {
    pub fn new(min: usize, extra: usize) -> Self {
        Self {
            min,
            extra,
            calls: AtomicUsize::new(0),
        }
    }
}

impl RecipeGenerator for FakeRecipe {
    fn create_benchmark(
        &self,
        recipe: WorkflowKind,
        num_tasks: usize,
        save_dir: &Path,
        _params: &RecipeParams,
    ) -> Result<PathBuf> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if num_tasks < self.min {
            return Err(Error::Subprocess(format!("{} too small", recipe)));
        }
        std::fs::create_dir_all(save_dir)?;
        let tasks: Vec<_> = (0..num_tasks + self.extra)
            .map(|i| serde_json::json!({ "name": format!("task_{}", i) }))
            .collect();
        let path = save_dir.join(format!("{}-{}.json", recipe, num_tasks));
        std::fs::write(
            &path,
            serde_json::json!({ "workflow": { "tasks": tasks } }).to_string(),
        )?;
        Ok(path)
    }
}
