//! Fork-join topology: root `1` fans out to `2..N-1`, which fan in to `N`.

use super::{input_file, output_file, task_name, Shape};

pub const PREFIX: &str = "fork_join";
/// Root, two parallel tasks, sink.
pub const MIN_TASKS: usize = 4;

fn middle(n: usize) -> std::ops::Range<usize> {
    2..n
}

/// Edges and consumed files of task `i` (1-based) in a fork-join of `n`.
pub(super) fn shape(i: usize, n: usize) -> Shape {
    let root = task_name(PREFIX, 1);
    let sink = task_name(PREFIX, n);

    if i == 1 {
        Shape {
            parents: Vec::new(),
            children: middle(n).map(|j| task_name(PREFIX, j)).collect(),
            inputs: vec![input_file(PREFIX, 1)],
        }
    } else if i == n {
        Shape {
            parents: middle(n).map(|j| task_name(PREFIX, j)).collect(),
            children: Vec::new(),
            inputs: middle(n).map(|j| output_file(PREFIX, j)).collect(),
        }
    } else {
        Shape {
            parents: vec![root],
            children: vec![sink],
            inputs: vec![output_file(PREFIX, 1)],
        }
    }
}
