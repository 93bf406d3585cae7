//! Flat storage for expression nodes.
//!
//! Nodes are allocated into a single `Vec` and addressed by [`NodeId`].
//! Freed slots become tombstones and are never handed out again, so a stale
//! `NodeId` can be detected instead of silently aliasing a new node.
//!
//! The arena maintains edge symmetry: every child edge `p -> c` is mirrored
//! by exactly one entry `p` in `c`'s parent list.

use rustc_hash::FxHashMap;

use pred_stack::with_stack_headroom;

use crate::{CallKind, GraphError, Literal, Node, NodeId, NodeKind};

#[derive(Clone, Debug, Default)]
pub struct NodeArena {
    nodes: Vec<Option<Node>>,
    live: usize,
}

impl NodeArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a literal node.
    pub fn literal(&mut self, literal: Literal) -> Result<NodeId, GraphError> {
        self.alloc(Node::new(NodeKind::Literal(literal)))
    }

    /// Allocate a call node over existing children.
    pub fn call(&mut self, kind: CallKind, children: &[NodeId]) -> Result<NodeId, GraphError> {
        if let Some(missing) = children.iter().find(|c| !self.is_live(**c)) {
            return Err(GraphError::NotFound(format!(
                "child {missing:?} of new {kind} node"
            )));
        }
        let id = self.alloc(Node::new(NodeKind::Call(kind)))?;
        for &child in children {
            self.link(id, child);
        }
        Ok(id)
    }

    fn alloc(&mut self, node: Node) -> Result<NodeId, GraphError> {
        let raw = u32::try_from(self.nodes.len())
            .map_err(|_| GraphError::InvalidArgument("node arena is full".to_owned()))?;
        self.nodes.push(Some(node));
        self.live += 1;
        Ok(NodeId::new(raw))
    }

    /// Live node by id; `None` for released or unknown ids.
    #[inline]
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index()).and_then(Option::as_ref)
    }

    #[inline]
    fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.index()).and_then(Option::as_mut)
    }

    #[inline]
    pub fn is_live(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Ids of all live nodes, in allocation order.
    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.iter().enumerate().filter_map(|(i, slot)| {
            let raw = u32::try_from(i).ok()?;
            slot.as_ref().map(|_| NodeId::new(raw))
        })
    }

    pub fn kind(&self, id: NodeId) -> Option<&NodeKind> {
        self.get(id).map(Node::kind)
    }

    /// Children of `id`; empty for released ids.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map_or(&[], Node::children)
    }

    /// Parents of `id`, one entry per edge; empty for released ids.
    pub fn parents(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map_or(&[], Node::parents)
    }

    fn link(&mut self, parent: NodeId, child: NodeId) {
        if let Some(node) = self.get_mut(parent) {
            node.children.push(child);
        }
        if let Some(node) = self.get_mut(child) {
            node.parents.push(parent);
        }
    }

    /// Drop one `parent` entry from `child`'s parent list.
    fn unlink_parent(&mut self, parent: NodeId, child: NodeId) {
        if let Some(node) = self.get_mut(child) {
            if let Some(pos) = node.parents.iter().position(|p| *p == parent) {
                node.parents.remove(pos);
            }
        }
    }

    fn check_edge_ends(&self, parent: NodeId, child: NodeId) -> Result<(), GraphError> {
        match self.get(parent) {
            None => return Err(GraphError::NotFound(format!("parent {parent:?}"))),
            Some(node) if node.is_literal() => {
                return Err(GraphError::InvalidArgument(format!(
                    "literal {parent:?} cannot have children"
                )))
            }
            Some(_) => {}
        }
        if self.is_live(child) {
            Ok(())
        } else {
            Err(GraphError::NotFound(format!("child {child:?}")))
        }
    }

    /// Append `child` to `parent`'s children.
    pub(crate) fn add_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), GraphError> {
        self.check_edge_ends(parent, child)?;
        self.link(parent, child);
        Ok(())
    }

    /// Remove the first occurrence of `child` from `parent`'s children.
    pub(crate) fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), GraphError> {
        self.check_edge_ends(parent, child)?;
        let pos = self
            .children(parent)
            .iter()
            .position(|c| *c == child)
            .ok_or_else(|| {
                GraphError::InvalidArgument(format!("{child:?} is not a child of {parent:?}"))
            })?;
        if let Some(node) = self.get_mut(parent) {
            node.children.remove(pos);
        }
        self.unlink_parent(parent, child);
        Ok(())
    }

    /// Replace the first occurrence of `old` among `parent`'s children with
    /// `new`, keeping its position.
    pub(crate) fn replace_child(
        &mut self,
        parent: NodeId,
        old: NodeId,
        new: NodeId,
    ) -> Result<(), GraphError> {
        self.check_edge_ends(parent, new)?;
        let pos = self
            .children(parent)
            .iter()
            .position(|c| *c == old)
            .ok_or_else(|| {
                GraphError::InvalidArgument(format!("{old:?} is not a child of {parent:?}"))
            })?;
        if let Some(node) = self.get_mut(parent) {
            node.children[pos] = new;
        }
        self.unlink_parent(parent, old);
        if let Some(node) = self.get_mut(new) {
            node.parents.push(parent);
        }
        Ok(())
    }

    /// Release a node, detaching it from its children.
    ///
    /// Parents are not touched; callers only free parentless nodes.
    pub(crate) fn free(&mut self, id: NodeId) -> Option<Node> {
        let node = self.nodes.get_mut(id.index())?.take()?;
        self.live -= 1;
        for &child in &node.children {
            self.unlink_parent(id, child);
        }
        Some(node)
    }

    /// Canonical form of the expression rooted at `id`.
    pub fn sexpr(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_sexpr(id, &mut out, &FxHashMap::default());
        out
    }

    /// Write the canonical form of `id`, reusing `cached` renderings of
    /// subexpressions where present.
    pub(crate) fn write_sexpr(
        &self,
        id: NodeId,
        out: &mut String,
        cached: &FxHashMap<NodeId, String>,
    ) {
        if let Some(text) = cached.get(&id) {
            out.push_str(text);
            return;
        }
        let Some(node) = self.get(id) else {
            out.push('?');
            return;
        };
        match &node.kind {
            NodeKind::Literal(literal) => literal.write_canonical(out),
            NodeKind::Call(kind) => {
                out.push('(');
                out.push_str(kind.name());
                for &child in &node.children {
                    out.push(' ');
                    with_stack_headroom(|| self.write_sexpr(child, out, cached));
                }
                out.push(')');
            }
        }
    }
}
