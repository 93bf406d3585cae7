//! Structural validation of expression nodes.
//!
//! Each call kind has a fixed shape:
//!
//! | kind | children |
//! |---|---|
//! | `true`, `false` | none |
//! | `and`, `or` | two or more |
//! | `not` | one |
//! | `field` | name literal |
//! | `ask` | name literal, collection |
//! | `operator` | name literal, parameter literal, input |
//! | `transformation` | name literal, input |
//! | `waitPhase`, `finishPhase` | phase name literal, input |
//!
//! Literals are always valid except for non-finite floats, which have no
//! canonical form that reads back as the same value.

use tracing::debug;

use pred_diagnostic::{NodeReporter, Reporter};
use pred_ir::traverse::bfs_down;
use pred_ir::{CallKind, Literal, MergeGraph, NodeId, NodeKind, Phase};

/// Validate every node reachable from the graph's roots.
///
/// Returns `true` if no node reported an error.
pub fn validate_graph(graph: &MergeGraph, reporter: &mut Reporter) -> bool {
    let nodes = bfs_down(graph.arena(), graph.roots().iter().copied());
    let mut ok = true;
    for &id in &nodes {
        let mut scoped = reporter.for_node(id, graph.canonical(id));
        ok &= validate_node(graph, id, &mut scoped);
    }
    debug!(nodes = nodes.len(), ok, "validated graph");
    ok
}

/// Validate one node against the shape of its kind.
///
/// Returns `true` if nothing was reported as an error.
pub fn validate_node(graph: &MergeGraph, id: NodeId, reporter: &mut NodeReporter<'_>) -> bool {
    let arena = graph.arena();
    let Some(node) = arena.get(id) else {
        reporter.error("node has been released");
        return false;
    };
    let children = node.children();
    let kind = match node.kind() {
        NodeKind::Literal(literal) => return validate_literal(literal, reporter),
        NodeKind::Call(kind) => *kind,
    };
    let check = Check {
        graph,
        children,
        kind,
    };

    match kind {
        CallKind::True | CallKind::False => check.exactly(0, reporter),
        CallKind::And | CallKind::Or => check.at_least(2, reporter),
        CallKind::Not => check.exactly(1, reporter),
        CallKind::Field => check.exactly(1, reporter) && check.string(0, "field name", reporter),
        CallKind::Ask => check.exactly(2, reporter) && check.string(0, "member name", reporter),
        CallKind::Operator => {
            check.exactly(3, reporter)
                && check.string(0, "operator name", reporter)
                && check.string(1, "operator parameters", reporter)
        }
        CallKind::Transformation => {
            check.exactly(2, reporter) && check.string(0, "transformation name", reporter)
        }
        CallKind::WaitPhase | CallKind::FinishPhase => {
            check.exactly(2, reporter) && check.phase(0, reporter)
        }
    }
}

fn validate_literal(literal: &Literal, reporter: &mut NodeReporter<'_>) -> bool {
    match literal {
        Literal::Float(f) if !f.is_finite() => {
            reporter.error("float literal must be finite");
            false
        }
        Literal::Null | Literal::String(_) | Literal::Integer(_) | Literal::Float(_) => true,
    }
}

struct Check<'a> {
    graph: &'a MergeGraph,
    children: &'a [NodeId],
    kind: CallKind,
}

impl<'a> Check<'a> {
    fn exactly(&self, n: usize, reporter: &mut NodeReporter<'_>) -> bool {
        if self.children.len() == n {
            return true;
        }
        let plural = if n == 1 { "child" } else { "children" };
        reporter.error(format!(
            "{} expects exactly {n} {plural}, got {}",
            self.kind,
            self.children.len()
        ));
        false
    }

    fn at_least(&self, n: usize, reporter: &mut NodeReporter<'_>) -> bool {
        if self.children.len() >= n {
            return true;
        }
        reporter.error(format!(
            "{} expects at least {n} children, got {}",
            self.kind,
            self.children.len()
        ));
        false
    }

    fn literal(&self, index: usize) -> Option<&'a Literal> {
        let graph: &'a MergeGraph = self.graph;
        let child = *self.children.get(index)?;
        graph.arena().get(child)?.literal()
    }

    /// Child `index` must be a string literal.
    fn string(&self, index: usize, what: &str, reporter: &mut NodeReporter<'_>) -> bool {
        if self.literal(index).and_then(Literal::as_str).is_some() {
            return true;
        }
        reporter.error(format!(
            "{} expects its {} as a string literal in position {}",
            self.kind,
            what,
            index + 1
        ));
        false
    }

    /// Child `index` must be a string literal naming a phase.
    fn phase(&self, index: usize, reporter: &mut NodeReporter<'_>) -> bool {
        if !self.string(index, "phase name", reporter) {
            return false;
        }
        let name = self.literal(index).and_then(Literal::as_str).unwrap_or_default();
        if Phase::lookup(name).is_some() {
            return true;
        }
        reporter.error(format!("{} names unknown phase {name}", self.kind));
        false
    }
}
