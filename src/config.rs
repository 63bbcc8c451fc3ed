use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::{wlog_debug, Error, Result};

pub const DEFAULT_SLEEP_PROGRAM: &str = "/bin/sleep";
pub const DEFAULT_WFBENCH_PROGRAM: &str = "/home/cc/wfcommons/wfcommons/wfbench/wfbench.py";
pub const DEFAULT_LOCK_DIR: &str = "/var/lib/condor/execute";
pub const DEFAULT_WORK_DIR: &str = "/tmp/wfbench-workflow";

/// User settings read from `~/.wfbench/wfbench.toml`.
///
/// Every field is optional; the accessors supply the defaults used on the
/// benchmark cluster.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub sleep_program: Option<String>,
    pub wfbench_program: Option<String>,
    pub lock_dir: Option<String>,
    pub author_email: Option<String>,
    pub wms_name: Option<String>,
    pub wms_version: Option<String>,
    pub wms_url: Option<String>,
    /// Translates a workflow document into an executor script.
    pub translator_command: Option<String>,
    /// Script submitted with `bash` to run a translated workflow.
    pub executor_script: Option<String>,
    /// Directory holding the benchmark binaries, passed to the executor.
    pub benchmark_bin_dir: Option<String>,
    /// Generates recipe-backed benchmarks (seismology, montage, ...).
    pub recipe_command: Option<String>,
    pub work_dir: Option<String>,
    pub trial_timeout_secs: Option<u64>,
}

impl Config {
    pub fn wfbench_dir() -> Result<PathBuf> {
        Ok(dirs::home_dir().ok_or(Error::NoHomeDir)?.join(".wfbench"))
    }

    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::wfbench_dir()?.join("wfbench.toml"))
    }

    /// Every field set to the value its accessor would fall back to.
    pub fn with_defaults() -> Self {
        let base = Self::default();
        Self {
            sleep_program: Some(base.sleep_program().to_string()),
            wfbench_program: Some(base.wfbench_program().to_string()),
            lock_dir: Some(DEFAULT_LOCK_DIR.to_string()),
            author_email: Some(base.author_email().to_string()),
            wms_name: Some(base.wms_name().to_string()),
            wms_version: Some(base.wms_version().to_string()),
            wms_url: Some(base.wms_url().to_string()),
            translator_command: Some(base.translator_command().to_string()),
            executor_script: Some(base.executor_script().display().to_string()),
            benchmark_bin_dir: Some(base.benchmark_bin_dir().display().to_string()),
            recipe_command: Some(base.recipe_command().to_string()),
            work_dir: Some(DEFAULT_WORK_DIR.to_string()),
            trial_timeout_secs: None,
        }
    }

    pub fn sleep_program(&self) -> &str {
        self.sleep_program.as_deref().unwrap_or(DEFAULT_SLEEP_PROGRAM)
    }

    pub fn wfbench_program(&self) -> &str {
        self.wfbench_program
            .as_deref()
            .unwrap_or(DEFAULT_WFBENCH_PROGRAM)
    }

    pub fn lock_dir(&self) -> PathBuf {
        expand_tilde(self.lock_dir.as_deref().unwrap_or(DEFAULT_LOCK_DIR))
    }

    pub fn author_email(&self) -> &str {
        self.author_email
            .as_deref()
            .unwrap_or("support@wfcommons.org")
    }

    pub fn wms_name(&self) -> &str {
        self.wms_name.as_deref().unwrap_or("WfCommons")
    }

    pub fn wms_version(&self) -> &str {
        self.wms_version.as_deref().unwrap_or("0.9-dev")
    }

    pub fn wms_url(&self) -> &str {
        self.wms_url
            .as_deref()
            .unwrap_or("https://docs.wfcommons.org/en/v0.9-dev/")
    }

    pub fn translator_command(&self) -> &str {
        self.translator_command
            .as_deref()
            .unwrap_or("wfbench-translate")
    }

    pub fn executor_script(&self) -> PathBuf {
        expand_tilde(self.executor_script.as_deref().unwrap_or("run-workflow.sh"))
    }

    pub fn benchmark_bin_dir(&self) -> PathBuf {
        expand_tilde(self.benchmark_bin_dir.as_deref().unwrap_or("/home/cc"))
    }

    pub fn recipe_command(&self) -> &str {
        self.recipe_command.as_deref().unwrap_or("wfbench-recipe")
    }

    pub fn work_dir(&self) -> PathBuf {
        expand_tilde(self.work_dir.as_deref().unwrap_or(DEFAULT_WORK_DIR))
    }

    pub fn trial_timeout(&self) -> Option<Duration> {
        self.trial_timeout_secs.map(Duration::from_secs)
    }

    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        wlog_debug!("Config::load path={}", path.display());
        if !path.exists() {
            wlog_debug!("Config file not found, using defaults");
            return Ok(Self::default());
        }
        let config: Self = toml::from_str(&fs::read_to_string(&path)?)?;
        wlog_debug!("Config loaded: {:?}", config);
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let dir = Self::wfbench_dir()?;
        if !dir.exists() {
            fs::create_dir_all(&dir)?;
        }
        let path = Self::config_path()?;
        fs::write(&path, toml::to_string_pretty(self)?)?;
        wlog_debug!("Config saved to {}", path.display());
        Ok(())
    }
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}
