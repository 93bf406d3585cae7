//! Consistency and debug reports for the Merge Graph.

use std::fmt::Write as _;

use rustc_hash::FxHashMap;

use super::MergeGraph;
use crate::traverse::bfs_down;
use crate::{to_dot, NodeId};

impl MergeGraph {
    /// Check the graph's internal invariants.
    ///
    /// Returns one line per violation; an empty report means the graph is
    /// consistent. Meant for tests and for a self-check after transforms.
    pub fn validation_report(&self) -> Vec<String> {
        let mut problems = Vec::new();
        self.check_edges(&mut problems);
        self.check_tables(&mut problems);
        self.check_roots(&mut problems);
        self.check_acyclic(&mut problems);
        problems
    }

    fn check_edges(&self, problems: &mut Vec<String>) {
        let arena = &self.arena;
        for id in arena.ids() {
            for &child in arena.children(id) {
                if !arena.is_live(child) {
                    problems.push(format!("{id:?} has released child {child:?}"));
                    continue;
                }
                let down = arena.children(id).iter().filter(|c| **c == child).count();
                let up = arena.parents(child).iter().filter(|p| **p == id).count();
                if down != up {
                    problems.push(format!(
                        "{id:?} lists {child:?} {down} times but is its parent {up} times"
                    ));
                }
            }
            for &parent in arena.parents(id) {
                if !arena.children(parent).contains(&id) {
                    problems.push(format!(
                        "{id:?} names {parent:?} as parent without a matching child edge"
                    ));
                }
            }
            if self.is_known(id) {
                for &child in arena.children(id) {
                    if !self.is_known(child) {
                        problems.push(format!("known {id:?} has unmerged child {child:?}"));
                    }
                }
            }
        }
    }

    fn check_tables(&self, problems: &mut Vec<String>) {
        for (key, &id) in &self.known {
            if !self.arena.is_live(id) {
                problems.push(format!("known node {id:?} for {key} is released"));
                continue;
            }
            if self.keys.get(&id) != Some(key) {
                problems.push(format!("known node {id:?} for {key} has no matching key"));
            }
            let actual = self.arena.sexpr(id);
            if &actual != key {
                problems.push(format!("known node {id:?} is {actual} but is filed as {key}"));
            }
        }
        for (&id, key) in &self.keys {
            if self.known.get(key) != Some(&id) {
                problems.push(format!("key {key} of {id:?} does not map back to it"));
            }
        }
    }

    fn check_roots(&self, problems: &mut Vec<String>) {
        for (index, &root) in self.roots.iter().enumerate() {
            if !self.is_known(root) {
                problems.push(format!("root {index} ({root:?}) is not a merged node"));
            }
            match self.root_indices.get(&root) {
                Some(&first) if first <= index && self.roots.get(first) == Some(&root) => {}
                _ => problems.push(format!("root {index} ({root:?}) has no matching index")),
            }
        }
        for (&root, &index) in &self.root_indices {
            if self.roots.get(index) != Some(&root) {
                problems.push(format!("index {index} recorded for {root:?} holds another root"));
            }
        }
    }

    fn check_acyclic(&self, problems: &mut Vec<String>) {
        #[derive(Copy, Clone, PartialEq)]
        enum Mark {
            Open,
            Done,
        }

        let mut marks: FxHashMap<NodeId, Mark> = FxHashMap::default();
        for &root in &self.roots {
            let mut stack = vec![(root, false)];
            while let Some((id, leaving)) = stack.pop() {
                if leaving {
                    marks.insert(id, Mark::Done);
                    continue;
                }
                match marks.get(&id) {
                    Some(Mark::Done) => continue,
                    Some(Mark::Open) => {
                        problems.push(format!("cycle through {id:?}"));
                        return;
                    }
                    None => {}
                }
                marks.insert(id, Mark::Open);
                stack.push((id, true));
                for &child in self.arena.children(id) {
                    match marks.get(&child) {
                        Some(Mark::Open) => {
                            problems.push(format!("cycle through {child:?}"));
                            return;
                        }
                        Some(Mark::Done) => {}
                        None => stack.push((child, false)),
                    }
                }
            }
        }
    }

    /// Human-readable dump: dedup table, roots, and a Graphviz rendering of
    /// everything reachable from the roots.
    pub fn debug_report(&self) -> String {
        let mut out = String::new();
        let mut known: Vec<_> = self.known.iter().collect();
        known.sort_by_key(|(_, id)| **id);

        let _ = writeln!(out, "Known:");
        for (key, id) in known {
            let _ = writeln!(out, "  {id:?} = {key}");
        }
        let _ = writeln!(out, "Roots:");
        for (index, root) in self.roots.iter().enumerate() {
            let _ = writeln!(out, "  {index}: {root:?} = {}", self.canonical(*root));
        }
        let reachable = bfs_down(&self.arena, self.roots.iter().copied()).len();
        let _ = writeln!(out, "Reachable: {reachable}");
        out.push_str(&to_dot(self));
        out
    }
}
