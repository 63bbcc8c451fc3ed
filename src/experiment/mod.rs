//! Experiment batches: parameter grids run trial by trial through the
//! external workflow management system.

pub mod config;
pub mod runner;

pub use config::{Architecture, ExperimentArgs, ExperimentConfig, TrialPoint};
pub use runner::{
    archive_run_dir, find_run_dir, BatchReport, ExperimentRunner, ExternalExecutor,
    RunnerSettings, TrialFailure, WorkflowExecutor,
};
