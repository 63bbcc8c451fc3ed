//! Graph view over a workflow document.
//!
//! Documents store edges as name lists on both ends. `WorkflowGraph` loads
//! them into a petgraph `DiGraph` and checks the invariants a document must
//! satisfy before it is handed to the executor: unique task names, symmetric
//! parent/child lists, no cycles, and input files produced by a parent.

use std::collections::{HashMap, HashSet};

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;

use crate::core::task::Task;
use crate::error::{Error, Result};
use crate::workflow::Workflow;

/// Parent/child structure of a workflow, borrowed from its tasks.
pub struct WorkflowGraph<'a> {
    graph: DiGraph<&'a Task, ()>,
    index: HashMap<&'a str, NodeIndex>,
}

impl<'a> WorkflowGraph<'a> {
    /// Build the graph, rejecting duplicate names, dangling or one-sided
    /// edges, and cycles.
    pub fn build(workflow: &'a Workflow) -> Result<Self> {
        let mut graph = DiGraph::new();
        let mut index = HashMap::new();

        for task in workflow.tasks() {
            if index.contains_key(task.name.as_str()) {
                return Err(Error::Validation(format!(
                    "Duplicate task name: {}",
                    task.name
                )));
            }
            let node = graph.add_node(task);
            index.insert(task.name.as_str(), node);
        }

        for task in workflow.tasks() {
            let from = index[task.name.as_str()];
            for child in &task.children {
                let to = *index.get(child.as_str()).ok_or_else(|| {
                    Error::Validation(format!("Task {} lists unknown child {}", task.name, child))
                })?;
                if !graph[to].parents.iter().any(|p| p == &task.name) {
                    return Err(Error::Validation(format!(
                        "Task {} lists child {} which does not list it as parent",
                        task.name, child
                    )));
                }
                graph.update_edge(from, to, ());
            }
            for parent in &task.parents {
                let parent_task = index
                    .get(parent.as_str())
                    .map(|&i| graph[i])
                    .ok_or_else(|| {
                        Error::Validation(format!(
                            "Task {} lists unknown parent {}",
                            task.name, parent
                        ))
                    })?;
                if !parent_task.children.iter().any(|c| c == &task.name) {
                    return Err(Error::Validation(format!(
                        "Task {} lists parent {} which does not list it as child",
                        task.name, parent
                    )));
                }
            }
        }

        let dag = Self { graph, index };
        dag.topological_order()?;
        Ok(dag)
    }

    /// Check that every input of a non-root task is an output of one of its
    /// parents.
    pub fn validate_files(&self) -> Result<()> {
        for task in self.graph.node_weights() {
            if task.is_root() {
                continue;
            }
            let produced: HashSet<&str> = self
                .parents_of(&task.name)
                .into_iter()
                .flat_map(|p| p.outputs().map(|f| f.name.as_str()))
                .collect();
            if let Some(missing) = task.inputs().find(|f| !produced.contains(f.name.as_str())) {
                return Err(Error::Validation(format!(
                    "Task {} reads {} which no parent produces",
                    task.name, missing.name
                )));
            }
        }
        Ok(())
    }

    pub fn task_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn roots(&self) -> Vec<&'a Task> {
        self.tasks_without(Direction::Incoming)
    }

    pub fn leaves(&self) -> Vec<&'a Task> {
        self.tasks_without(Direction::Outgoing)
    }

    fn tasks_without(&self, direction: Direction) -> Vec<&'a Task> {
        self.graph
            .node_indices()
            .filter(|&i| self.graph.neighbors_directed(i, direction).next().is_none())
            .map(|i| self.graph[i])
            .collect()
    }

    pub fn parents_of(&self, name: &str) -> Vec<&'a Task> {
        self.neighbors(name, Direction::Incoming)
    }

    pub fn children_of(&self, name: &str) -> Vec<&'a Task> {
        self.neighbors(name, Direction::Outgoing)
    }

    fn neighbors(&self, name: &str, direction: Direction) -> Vec<&'a Task> {
        match self.index.get(name) {
            Some(&i) => self
                .graph
                .neighbors_directed(i, direction)
                .map(|n| self.graph[n])
                .collect(),
            None => Vec::new(),
        }
    }

    pub fn has_edge(&self, parent: &str, child: &str) -> bool {
        match (self.index.get(parent), self.index.get(child)) {
            (Some(&a), Some(&b)) => self.graph.find_edge(a, b).is_some(),
            _ => false,
        }
    }

    /// Tasks ordered so that every task follows all of its parents.
    pub fn topological_order(&self) -> Result<Vec<&'a Task>> {
        let sorted = toposort(&self.graph, None).map_err(|cycle| {
            Error::Validation(format!(
                "Cycle detected at task: {}",
                self.graph[cycle.node_id()].name
            ))
        })?;
        Ok(sorted.into_iter().map(|i| self.graph[i]).collect())
    }

    /// True when the tasks form one path with no branching.
    pub fn is_simple_path(&self) -> bool {
        let n = self.task_count();
        if n == 0 {
            return false;
        }
        self.edge_count() == n - 1
            && self.roots().len() == 1
            && self.leaves().len() == 1
            && self.graph.node_indices().all(|i| {
                self.graph.neighbors_directed(i, Direction::Incoming).count() <= 1
                    && self.graph.neighbors_directed(i, Direction::Outgoing).count() <= 1
            })
    }
}

impl std::fmt::Debug for WorkflowGraph<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowGraph")
            .field("tasks", &self.task_count())
            .field("edges", &self.edge_count())
            .finish()
    }
}

/// Build the graph and check file dependencies in one step.
pub fn validate(workflow: &Workflow) -> Result<()> {
    WorkflowGraph::build(workflow)?.validate_files()
}
