//! Rendering and parsing of workflow JSON documents.
//!
//! Documents are written with four-space indentation and schema field order
//! so that output matches what the downstream translator already consumes.

use std::fs;
use std::path::Path;

use serde::Serialize;
use serde_json::ser::PrettyFormatter;

use super::types::Workflow;
use crate::{wlog_debug, Result};

const INDENT: &[u8] = b"    ";

/// Render a workflow as a JSON document.
pub fn to_json(workflow: &Workflow) -> Result<String> {
    let mut buf = Vec::new();
    let formatter = PrettyFormatter::with_indent(INDENT);
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    workflow.serialize(&mut ser)?;
    // serde_json only emits valid UTF-8
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Parse a JSON document. Fields the executor adds after a run are ignored.
pub fn from_json(json: &str) -> Result<Workflow> {
    Ok(serde_json::from_str(json)?)
}

pub fn write(workflow: &Workflow, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, to_json(workflow)?)?;
    wlog_debug!(
        "Wrote workflow {} ({} tasks) to {}",
        workflow.name,
        workflow.task_count(),
        path.display()
    );
    Ok(())
}

pub fn read(path: &Path) -> Result<Workflow> {
    from_json(&fs::read_to_string(path)?)
}
