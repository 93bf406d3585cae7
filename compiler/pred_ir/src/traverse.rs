//! Breadth-first walks over the node arena.
//!
//! All walks visit each live node once, however many paths lead to it, and
//! are iterative so deep expressions cannot overflow the stack.

use std::collections::VecDeque;

use rustc_hash::FxHashSet;

use crate::{NodeArena, NodeId};

/// `starts` and everything below them, each once, nearest first.
pub fn bfs_down(arena: &NodeArena, starts: impl IntoIterator<Item = NodeId>) -> Vec<NodeId> {
    walk(arena, starts, NodeArena::children)
}

/// `start` and every ancestor of it, each once, nearest first.
pub fn bfs_up(arena: &NodeArena, start: NodeId) -> Vec<NodeId> {
    walk(arena, [start], NodeArena::parents)
}

/// `start` and everything below it.
pub fn descendants(arena: &NodeArena, start: NodeId) -> FxHashSet<NodeId> {
    bfs_down(arena, [start]).into_iter().collect()
}

fn walk<'a>(
    arena: &'a NodeArena,
    starts: impl IntoIterator<Item = NodeId>,
    next: impl Fn(&'a NodeArena, NodeId) -> &'a [NodeId],
) -> Vec<NodeId> {
    let mut seen = FxHashSet::default();
    let mut queue: VecDeque<NodeId> = VecDeque::new();
    let mut order = Vec::new();

    for start in starts {
        if arena.is_live(start) && seen.insert(start) {
            queue.push_back(start);
        }
    }
    while let Some(id) = queue.pop_front() {
        order.push(id);
        for &n in next(arena, id) {
            if arena.is_live(n) && seen.insert(n) {
                queue.push_back(n);
            }
        }
    }
    order
}
