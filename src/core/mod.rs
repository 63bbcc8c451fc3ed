//! Core domain models for benchmark workflows.
//!
//! This module contains the task model and the graph view used to check
//! that a workflow is a well-formed DAG.

pub mod dag;
pub mod task;

pub use dag::WorkflowGraph;
pub use task::{FileDependency, FileLink, Invocation, Task, TaskType};
