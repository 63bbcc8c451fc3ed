//! Workflow documents: the envelope types and their JSON rendering.

pub mod document;
mod types;

pub use types::{
    Author, Timestamps, Wms, Workflow, WorkflowBody, WorkflowMeta, DESCRIPTION, SCHEMA_VERSION,
};
