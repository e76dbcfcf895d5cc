//! Merging task lists from several sources
//!
//! Tasks are joined on `(group key, keyboard)`. Scalar fields follow the
//! later source, keymaps are unioned whatever the order.

use std::collections::HashMap;

use crate::task::{BuildTarget, ForkFamily, GroupKey, KeyboardTask};

/// Merge two tasks sharing an identity; `right` comes from the later source
pub fn merge_tasks(left: KeyboardTask, right: KeyboardTask) -> KeyboardTask {
    let target = match right.target {
        BuildTarget::Fork(fork) => BuildTarget::Fork(fork),
        BuildTarget::Upstream => left.target,
    };

    let mut merged = KeyboardTask {
        keyboard: right.keyboard,
        keymaps: left.keymaps,
        target,
        auto_detected: left.auto_detected || right.auto_detected,
    };
    merged.add_keymaps(right.keymaps);
    merged
}

/// Full outer join of `acc` with `next`.
///
/// Tasks of `next` whose identity already exists are merged into that
/// position; the rest are appended in their own order. Duplicates inside
/// `next` collapse the same way.
pub fn full_outer_join(
    acc: Vec<KeyboardTask>,
    next: Vec<KeyboardTask>,
    family: ForkFamily,
) -> Vec<KeyboardTask> {
    let mut out: Vec<KeyboardTask> = Vec::with_capacity(acc.len() + next.len());
    let mut index: HashMap<(GroupKey, String), usize> = HashMap::new();

    for task in acc.into_iter().chain(next) {
        let identity = task.identity(family);
        match index.get(&identity) {
            Some(&pos) => {
                let existing = std::mem::replace(&mut out[pos], placeholder());
                out[pos] = merge_tasks(existing, task);
            }
            None => {
                index.insert(identity, out.len());
                out.push(task);
            }
        }
    }

    out
}

/// Fold all sources left to right
pub fn merge_sources(sources: Vec<Vec<KeyboardTask>>, family: ForkFamily) -> Vec<KeyboardTask> {
    sources
        .into_iter()
        .fold(Vec::new(), |acc, next| full_outer_join(acc, next, family))
}

fn placeholder() -> KeyboardTask {
    KeyboardTask {
        keyboard: String::new(),
        keymaps: Vec::new(),
        target: BuildTarget::Upstream,
        auto_detected: false,
    }
}
