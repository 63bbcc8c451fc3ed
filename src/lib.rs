pub mod benchmark;
pub mod config;
pub mod core;
pub mod error;
pub mod experiment;
pub mod log;
pub mod recipe;
pub mod sanity;
pub mod topology;
pub mod util;
pub mod workflow;

pub use error::{Error, Result};
pub use topology::{CommandFamily, GeneratorConfig, Programs, ResourceConfig, Topology};
pub use workflow::{Timestamps, Workflow, WorkflowMeta};
