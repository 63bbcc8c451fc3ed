//! Chain topology: `1 -> 2 -> ... -> N`.

use super::{input_file, output_file, task_name, Shape};

pub const PREFIX: &str = "chain";
pub const MIN_TASKS: usize = 1;

/// Edges and consumed files of task `i` (1-based) in a chain of `n`.
pub(super) fn shape(i: usize, n: usize) -> Shape {
    let parents = if i > 1 {
        vec![task_name(PREFIX, i - 1)]
    } else {
        Vec::new()
    };
    let children = if i < n {
        vec![task_name(PREFIX, i + 1)]
    } else {
        Vec::new()
    };
    let inputs = if i == 1 {
        vec![input_file(PREFIX, 1)]
    } else {
        vec![output_file(PREFIX, i - 1)]
    };
    Shape {
        parents,
        children,
        inputs,
    }
}
