//! Graphviz rendering of a [`MergeGraph`].
//!
//! Roots are drawn as diamonds and literals as boxes. Only nodes reachable
//! from a root are drawn.

use std::fmt::{self, Write as _};

use crate::traverse::bfs_down;
use crate::{MergeGraph, NodeId, NodeKind};

/// Render `graph` in dot format.
pub fn to_dot(graph: &MergeGraph) -> String {
    to_dot_with(graph, |_| None)
}

/// Render `graph` in dot format, appending `decorate(node)` to the label of
/// each node it returns text for.
pub fn to_dot_with(graph: &MergeGraph, decorate: impl Fn(NodeId) -> Option<String>) -> String {
    let mut out = String::new();
    // Writing into a `String` cannot fail.
    let _ = write_dot(&mut out, graph, &decorate);
    out
}

fn write_dot(
    out: &mut String,
    graph: &MergeGraph,
    decorate: &dyn Fn(NodeId) -> Option<String>,
) -> fmt::Result {
    let arena = graph.arena();
    writeln!(out, "digraph G {{")?;
    writeln!(out, "  ordering = out;")?;
    for id in bfs_down(arena, graph.roots().iter().copied()) {
        let Some(node) = arena.get(id) else {
            continue;
        };
        let (text, shape) = match node.kind() {
            NodeKind::Literal(literal) => (literal.canonical(), "box"),
            NodeKind::Call(kind) => (kind.name().to_owned(), "ellipse"),
        };
        let mut label = escape(&text);
        if let Some(extra) = decorate(id) {
            label.push_str("\\n");
            label.push_str(&escape(&extra));
        }
        let shape = if graph.roots().contains(&id) {
            "diamond"
        } else {
            shape
        };
        writeln!(out, "  n{} [label=\"{label}\", shape={shape}];", id.raw())?;
        for child in node.children() {
            writeln!(out, "  n{} -> n{};", id.raw(), child.raw())?;
        }
    }
    writeln!(out, "}}")
}

fn escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}
