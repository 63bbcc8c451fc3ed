//! Workflow document envelope.

use chrono::{DateTime, FixedOffset, Local, Utc};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::core::task::Task;

pub const SCHEMA_VERSION: &str = "1.3";
pub const DESCRIPTION: &str = "Instance generated with WfCommons - https://wfcommons.org";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub name: String,
    pub email: String,
}

/// The workflow management system credited with the instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wms {
    pub name: String,
    pub version: String,
    pub url: String,
}

/// Authorship and WMS information stamped on every generated document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowMeta {
    pub author: Author,
    pub wms: Wms,
}

impl WorkflowMeta {
    pub fn from_config(config: &Config) -> Self {
        Self {
            author: Author {
                name: current_user(),
                email: config.author_email().to_string(),
            },
            wms: Wms {
                name: config.wms_name().to_string(),
                version: config.wms_version().to_string(),
                url: config.wms_url().to_string(),
            },
        }
    }
}

impl Default for WorkflowMeta {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

fn current_user() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string())
}

/// Wall-clock stamps written into `createdAt` and `workflow.executedAt`.
///
/// These are the only non-deterministic fields of a document, so generation
/// takes them as a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timestamps {
    pub created_at: DateTime<Utc>,
    pub executed_at: DateTime<FixedOffset>,
}

impl Timestamps {
    pub fn now() -> Self {
        Self {
            created_at: Utc::now(),
            executed_at: Local::now().fixed_offset(),
        }
    }

    /// ISO-8601 UTC with microseconds and no offset suffix.
    pub fn created_at_string(&self) -> String {
        self.created_at.format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
    }

    pub fn executed_at_string(&self) -> String {
        self.executed_at.format("%Y%m%dT%H%M%S%z").to_string()
    }
}

/// The `workflow` object of a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowBody {
    pub executed_at: String,
    /// Filled in by the executor after a run; zero when generated.
    pub makespan: serde_json::Number,
    pub tasks: Vec<Task>,
}

/// A complete workflow document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workflow {
    pub name: String,
    pub description: String,
    pub created_at: String,
    pub schema_version: String,
    pub author: Author,
    pub wms: Wms,
    #[serde(rename = "workflow")]
    pub body: WorkflowBody,
}

impl Workflow {
    /// Wrap generated tasks in the standard document envelope.
    pub fn new(name: &str, tasks: Vec<Task>, meta: &WorkflowMeta, stamps: Timestamps) -> Self {
        Self {
            name: name.to_string(),
            description: DESCRIPTION.to_string(),
            created_at: stamps.created_at_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            author: meta.author.clone(),
            wms: meta.wms.clone(),
            body: WorkflowBody {
                executed_at: stamps.executed_at_string(),
                makespan: serde_json::Number::from(0u64),
                tasks,
            },
        }
    }

    pub fn tasks(&self) -> &[Task] {
        &self.body.tasks
    }

    pub fn task_count(&self) -> usize {
        self.body.tasks.len()
    }

    pub fn task(&self, name: &str) -> Option<&Task> {
        self.body.tasks.iter().find(|t| t.name == name)
    }

    /// All (parent, child) edges as declared on the child side.
    pub fn edges(&self) -> Vec<(String, String)> {
        self.body
            .tasks
            .iter()
            .flat_map(|t| {
                t.parents
                    .iter()
                    .map(move |p| (p.clone(), t.name.clone()))
            })
            .collect()
    }
}
