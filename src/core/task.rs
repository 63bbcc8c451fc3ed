//! Task data model for benchmark workflows.
//!
//! Tasks are the compute nodes of a workflow document. Each task names the
//! program it invokes, the tasks it waits on and feeds, and the files it
//! reads and writes. Field names and order follow the v1.3 document schema.

use serde::{Deserialize, Serialize};

/// Direction of a file dependency relative to the task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileLink {
    Input,
    Output,
}

impl std::fmt::Display for FileLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FileLink::Input => write!(f, "input"),
            FileLink::Output => write!(f, "output"),
        }
    }
}

/// A file read or written by a task.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileDependency {
    pub link: FileLink,
    pub name: String,
    /// Size in kilobytes.
    pub size: u64,
}

impl FileDependency {
    pub fn input(name: impl Into<String>, size_kb: u64) -> Self {
        Self {
            link: FileLink::Input,
            name: name.into(),
            size: size_kb,
        }
    }

    pub fn output(name: impl Into<String>, size_kb: u64) -> Self {
        Self {
            link: FileLink::Output,
            name: name.into(),
            size: size_kb,
        }
    }

    pub fn is_input(&self) -> bool {
        self.link == FileLink::Input
    }
}

/// Program path plus ordered argument list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invocation {
    pub program: String,
    pub arguments: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskType {
    #[default]
    Compute,
}

/// A single task in a workflow document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub name: String,
    /// Zero-padded 8-digit index, e.g. `00000001`.
    pub id: String,
    #[serde(rename = "type", default)]
    pub task_type: TaskType,
    pub command: Invocation,
    #[serde(default)]
    pub parents: Vec<String>,
    #[serde(default)]
    pub children: Vec<String>,
    #[serde(default)]
    pub files: Vec<FileDependency>,
    #[serde(default = "default_cores")]
    pub cores: u32,
}

fn default_cores() -> u32 {
    1
}

impl Task {
    /// Create a single-core compute task.
    pub fn compute(name: String, id: String, command: Invocation) -> Self {
        Self {
            name,
            id,
            task_type: TaskType::Compute,
            command,
            parents: Vec::new(),
            children: Vec::new(),
            files: Vec::new(),
            cores: default_cores(),
        }
    }

    pub fn with_parents(mut self, parents: Vec<String>) -> Self {
        self.parents = parents;
        self
    }

    pub fn with_children(mut self, children: Vec<String>) -> Self {
        self.children = children;
        self
    }

    pub fn with_files(mut self, files: Vec<FileDependency>) -> Self {
        self.files = files;
        self
    }

    pub fn inputs(&self) -> impl Iterator<Item = &FileDependency> {
        self.files.iter().filter(|f| f.is_input())
    }

    pub fn outputs(&self) -> impl Iterator<Item = &FileDependency> {
        self.files.iter().filter(|f| !f.is_input())
    }

    pub fn is_root(&self) -> bool {
        self.parents.is_empty()
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}
