//! The Merge Graph: every rule expression merged into one DAG.
//!
//! Two subexpressions with the same canonical form are represented by a
//! single node. The graph keeps a dedup table from canonical form to node
//! (`known`) and the reverse (`keys`), and an ordered list of roots whose
//! indices never change.
//!
//! Nodes are *loose* until merged: trees are built with [`MergeGraph::literal`]
//! and [`MergeGraph::call`], then handed over with [`MergeGraph::add_root`],
//! [`MergeGraph::replace`] or [`MergeGraph::add`]. Merging works bottom-up,
//! so every node that gets learned already has merged children and its
//! canonical form can be built from theirs.
//!
//! Every mutation of a merged node's children first unlearns the node and
//! all of its ancestors, edits the edge, then relearns them bottom-up. A
//! relearned node whose new canonical form is already known collapses into
//! the known node.

mod report;

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, trace};

use pred_stack::with_stack_headroom;

use crate::traverse::{bfs_up, descendants};
use crate::{CallKind, GraphError, Literal, Node, NodeArena, NodeId};

#[derive(Clone, Debug, Default)]
pub struct MergeGraph {
    arena: NodeArena,
    /// Canonical form to its single representative.
    known: FxHashMap<String, NodeId>,
    /// Representative to its canonical form.
    keys: FxHashMap<NodeId, String>,
    roots: Vec<NodeId>,
    /// First root index of each root node.
    root_indices: FxHashMap<NodeId, usize>,
}

impl MergeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// The underlying storage, for read-only inspection.
    pub fn arena(&self) -> &NodeArena {
        &self.arena
    }

    /// Create a loose literal node.
    pub fn literal(&mut self, literal: Literal) -> Result<NodeId, GraphError> {
        self.arena.literal(literal)
    }

    /// Create a loose call node. Children may be loose or merged.
    pub fn call(&mut self, kind: CallKind, children: &[NodeId]) -> Result<NodeId, GraphError> {
        self.arena.call(kind, children)
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// Number of roots, including roots that merged into an earlier one.
    pub fn len(&self) -> usize {
        self.roots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Number of distinct merged subexpressions.
    pub fn known_count(&self) -> usize {
        self.known.len()
    }

    /// Is `id` itself a merged node?
    pub fn is_known(&self, id: NodeId) -> bool {
        self.keys.contains_key(&id)
    }

    /// Canonical form of `id`.
    pub fn canonical(&self, id: NodeId) -> String {
        if let Some(key) = self.keys.get(&id) {
            return key.clone();
        }
        let mut out = String::new();
        self.arena.write_sexpr(id, &mut out, &self.keys);
        out
    }

    /// The merged node equivalent to `id`, if any.
    pub fn known(&self, id: NodeId) -> Option<NodeId> {
        if self.is_known(id) {
            return Some(id);
        }
        if !self.arena.is_live(id) {
            return None;
        }
        self.known.get(&self.canonical(id)).copied()
    }

    /// Merge the tree at `id` into the graph and append it as a root.
    ///
    /// Returns the root index. Adding an expression that is already a root
    /// returns that root's index. `id` must not have parents unless it is
    /// already merged.
    pub fn add_root(&mut self, id: NodeId) -> Result<usize, GraphError> {
        if !self.arena.is_live(id) {
            return Err(GraphError::NotFound(format!("root {id:?}")));
        }
        if !self.is_known(id) && !self.arena.parents(id).is_empty() {
            return Err(GraphError::InvalidArgument(format!(
                "new root {} already has parents",
                self.canonical(id)
            )));
        }

        let merged = self.adopt(id)?;
        if let Some(&index) = self.root_indices.get(&merged) {
            debug!(index, root = %self.canonical(merged), "root already present");
            return Ok(index);
        }
        let index = self.roots.len();
        self.roots.push(merged);
        self.root_indices.insert(merged, index);
        debug!(index, root = %self.canonical(merged), "added root");
        Ok(index)
    }

    /// Root at `index`.
    pub fn root(&self, index: usize) -> Result<NodeId, GraphError> {
        self.roots
            .get(index)
            .copied()
            .ok_or_else(|| GraphError::NotFound(format!("root index {index}")))
    }

    /// Index of the root equivalent to `id`.
    pub fn root_index(&self, id: NodeId) -> Result<usize, GraphError> {
        self.known(id)
            .and_then(|k| self.root_indices.get(&k).copied())
            .ok_or_else(|| GraphError::NotFound(format!("root {}", self.canonical(id))))
    }

    /// Point every parent of the node equivalent to `which` at `with`
    /// instead.
    ///
    /// `with` is merged first; its merged representative is returned. If
    /// `which` is a root, the root slot moves to `with` and keeps its index.
    /// Parents that are themselves below `with` keep their edge, so the
    /// replacement never creates a cycle.
    pub fn replace(&mut self, which: NodeId, with: NodeId) -> Result<NodeId, GraphError> {
        let target = self.known(which).ok_or_else(|| {
            GraphError::NotFound(format!("replace target {}", self.canonical(which)))
        })?;
        let with = self.adopt(with)?;
        if with == target {
            return Ok(with);
        }
        debug!(
            from = %self.canonical(target),
            to = %self.canonical(with),
            "replace"
        );

        let below_with = descendants(&self.arena, with);
        let mut rewired: Vec<NodeId> = self
            .arena
            .parents(target)
            .iter()
            .copied()
            .filter(|p| self.is_known(*p) && !below_with.contains(p))
            .collect();
        rewired.sort_unstable();
        rewired.dedup();

        let stale = self.unlearn_ancestors(&rewired);
        for &parent in &rewired {
            while self.arena.children(parent).contains(&target) {
                self.arena.replace_child(parent, target, with)?;
            }
        }
        self.move_root(target, with);
        self.release(target);
        self.relearn(&stale)?;
        Ok(with)
    }

    /// Append `child` (merged first) to the children of the node equivalent
    /// to `parent`. Returns the merged child.
    pub fn add(&mut self, parent: NodeId, child: NodeId) -> Result<NodeId, GraphError> {
        let parent = self.known(parent).ok_or_else(|| {
            GraphError::NotFound(format!("parent {}", self.canonical(parent)))
        })?;
        if self.arena.get(parent).is_some_and(Node::is_literal) {
            return Err(GraphError::InvalidArgument(format!(
                "literal {} cannot have children",
                self.canonical(parent)
            )));
        }
        let child = self.adopt(child)?;
        if descendants(&self.arena, child).contains(&parent) {
            self.release(child);
            return Err(GraphError::InvalidArgument(format!(
                "adding {} under {} would create a cycle",
                self.canonical(child),
                self.canonical(parent)
            )));
        }
        debug!(parent = %self.canonical(parent), child = %self.canonical(child), "add child");

        let stale = self.unlearn_ancestors(&[parent]);
        self.arena.add_child(parent, child)?;
        self.relearn(&stale)?;
        Ok(child)
    }

    /// Remove one edge from the node equivalent to `parent` to the node
    /// equivalent to `child`.
    pub fn remove(&mut self, parent: NodeId, child: NodeId) -> Result<(), GraphError> {
        let parent = self.known(parent).ok_or_else(|| {
            GraphError::NotFound(format!("parent {}", self.canonical(parent)))
        })?;
        let child = self
            .known(child)
            .ok_or_else(|| GraphError::NotFound(format!("child {}", self.canonical(child))))?;
        if !self.arena.children(parent).contains(&child) {
            return Err(GraphError::InvalidArgument(format!(
                "{} is not a child of {}",
                self.canonical(child),
                self.canonical(parent)
            )));
        }
        debug!(parent = %self.canonical(parent), child = %self.canonical(child), "remove child");

        let stale = self.unlearn_ancestors(&[parent]);
        self.arena.remove_child(parent, child)?;
        self.relearn(&stale)?;
        self.release(child);
        Ok(())
    }

    /// Merge the loose tree at `id`, discarding it if an equivalent node is
    /// already known.
    fn adopt(&mut self, id: NodeId) -> Result<NodeId, GraphError> {
        let merged = self.merge_tree(id)?;
        if merged != id {
            self.release(id);
        }
        Ok(merged)
    }

    fn merge_tree(&mut self, id: NodeId) -> Result<NodeId, GraphError> {
        if self.is_known(id) {
            return Ok(id);
        }
        if !self.arena.is_live(id) {
            return Err(GraphError::NotFound(format!("node {id:?}")));
        }
        let children = self.arena.children(id).to_vec();
        for child in children {
            let merged = with_stack_headroom(|| self.merge_tree(child))?;
            if merged != child {
                self.arena.replace_child(id, child, merged)?;
                self.release(child);
            }
        }
        let key = self.canonical(id);
        if let Some(&existing) = self.known.get(&key) {
            return Ok(existing);
        }
        self.learn(id, key);
        Ok(id)
    }

    fn learn(&mut self, id: NodeId, key: String) {
        trace!(node = ?id, key = %key, "learn");
        self.known.insert(key.clone(), id);
        self.keys.insert(id, key);
    }

    fn unlearn(&mut self, id: NodeId) {
        if let Some(key) = self.keys.remove(&id) {
            if self.known.get(&key) == Some(&id) {
                self.known.remove(&key);
            }
            trace!(node = ?id, key = %key, "unlearn");
        }
    }

    /// Unlearn `starts` and every merged ancestor of them. Returns the
    /// unlearned nodes.
    fn unlearn_ancestors(&mut self, starts: &[NodeId]) -> Vec<NodeId> {
        let mut seen = FxHashSet::default();
        let mut stale = Vec::new();
        for &start in starts {
            for id in bfs_up(&self.arena, start) {
                if self.is_known(id) && seen.insert(id) {
                    stale.push(id);
                }
            }
        }
        for &id in &stale {
            self.unlearn(id);
        }
        stale
    }

    /// Relearn unlearned nodes, children before parents, collapsing any
    /// node whose canonical form is now taken into the existing node.
    fn relearn(&mut self, stale: &[NodeId]) -> Result<(), GraphError> {
        for id in self.post_order_within(stale) {
            if !self.arena.is_live(id) || self.is_known(id) {
                continue;
            }
            let key = self.canonical(id);
            match self.known.get(&key) {
                Some(&existing) => self.collapse(id, existing)?,
                None => self.learn(id, key),
            }
        }
        Ok(())
    }

    /// `set` ordered so that each node comes after its children in `set`.
    fn post_order_within(&self, set: &[NodeId]) -> Vec<NodeId> {
        let members: FxHashSet<NodeId> = set.iter().copied().collect();
        let mut done = FxHashSet::default();
        let mut order = Vec::with_capacity(set.len());
        let mut stack: Vec<(NodeId, bool)> = Vec::new();

        for &start in set {
            stack.push((start, false));
            while let Some((id, expanded)) = stack.pop() {
                if expanded {
                    order.push(id);
                    continue;
                }
                if !done.insert(id) {
                    continue;
                }
                stack.push((id, true));
                for &child in self.arena.children(id) {
                    if members.contains(&child) && !done.contains(&child) {
                        stack.push((child, false));
                    }
                }
            }
        }
        order
    }

    /// Redirect every edge into `dup` to `canon`, then drop `dup`.
    fn collapse(&mut self, dup: NodeId, canon: NodeId) -> Result<(), GraphError> {
        trace!(dup = ?dup, canon = ?canon, "collapse");
        let parents = self.arena.parents(dup).to_vec();
        for parent in parents {
            self.arena.replace_child(parent, dup, canon)?;
        }
        self.move_root(dup, canon);
        self.release(dup);
        Ok(())
    }

    /// Move every root slot holding `from` to `to`.
    fn move_root(&mut self, from: NodeId, to: NodeId) {
        let Some(index) = self.root_indices.remove(&from) else {
            return;
        };
        for slot in &mut self.roots[index..] {
            if *slot == from {
                *slot = to;
            }
        }
        let first = self.root_indices.entry(to).or_insert(index);
        *first = (*first).min(index);
    }

    /// Free `id` and anything below it that is left without parents.
    ///
    /// Roots and nodes that still have parents are kept.
    fn release(&mut self, id: NodeId) {
        let mut stack = vec![id];
        while let Some(id) = stack.pop() {
            if !self.arena.is_live(id)
                || !self.arena.parents(id).is_empty()
                || self.root_indices.contains_key(&id)
            {
                continue;
            }
            self.unlearn(id);
            if let Some(node) = self.arena.free(id) {
                trace!(node = ?id, "release");
                stack.extend(node.children);
            }
        }
    }
}
