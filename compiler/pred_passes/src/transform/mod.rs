//! Rewrites applied to the merged graph before evaluation.
//!
//! Every rewrite goes through [`MergeGraph::replace`], so the result stays
//! merged. Passes are repeated by the caller until nothing changes.
//!
//! # Rewrites
//!
//! - `(true)` becomes `''` and `(false)` becomes `:`
//! - `(not L)` of a literal becomes the negated literal
//! - `and`/`or` with a literal child that decides the result becomes that
//!   result; literal children that cannot decide it are dropped; a single
//!   remaining child replaces the call; no remaining children gives the
//!   identity (`''` for `and`, `:` for `or`)
//! - `and`/`or` children are sorted by canonical form so that commutative
//!   variants of the same condition merge

use tracing::debug;

use pred_diagnostic::Reporter;
use pred_ir::traverse::bfs_down;
use pred_ir::{CallFactory, CallKind, GraphError, Literal, MergeGraph, NodeId, NodeKind};

/// Run one pass over every node reachable from the roots.
///
/// Returns `true` if anything changed. Graph failures are reported against
/// the node being rewritten.
pub fn transform_graph(
    graph: &mut MergeGraph,
    factory: &CallFactory,
    reporter: &mut Reporter,
) -> bool {
    let nodes = bfs_down(graph.arena(), graph.roots().iter().copied());
    let mut changed = 0_usize;
    for id in nodes {
        // Earlier rewrites in this pass may have released or merged it away.
        if !graph.is_known(id) {
            continue;
        }
        match transform_node(graph, factory, id) {
            Ok(true) => changed += 1,
            Ok(false) => {}
            Err(err) => {
                reporter.error(id, graph.canonical(id), format!("transform failed: {err}"));
            }
        }
    }
    debug!(changed, "transform pass");
    changed > 0
}

/// Apply the rewrite for `id`'s kind, if any applies.
pub fn transform_node(
    graph: &mut MergeGraph,
    factory: &CallFactory,
    id: NodeId,
) -> Result<bool, GraphError> {
    let kind = match graph.arena().kind(id) {
        Some(NodeKind::Call(kind)) => *kind,
        Some(NodeKind::Literal(_)) => return Ok(false),
        None => return Err(GraphError::NotFound(format!("node {id:?}"))),
    };
    match kind {
        CallKind::True => replace_with_literal(graph, id, truth(true)),
        CallKind::False => replace_with_literal(graph, id, truth(false)),
        CallKind::Not => transform_not(graph, id),
        CallKind::And | CallKind::Or => transform_connective(graph, factory, id, kind),
        CallKind::Field
        | CallKind::Ask
        | CallKind::Operator
        | CallKind::Transformation
        | CallKind::WaitPhase
        | CallKind::FinishPhase => Ok(false),
    }
}

/// The literal standing for a boolean.
fn truth(value: bool) -> Literal {
    if value {
        Literal::string("")
    } else {
        Literal::Null
    }
}

fn replace_with_literal(
    graph: &mut MergeGraph,
    id: NodeId,
    literal: Literal,
) -> Result<bool, GraphError> {
    debug!(node = %graph.canonical(id), to = %literal, "fold to literal");
    let with = graph.literal(literal)?;
    graph.replace(id, with)?;
    Ok(true)
}

fn literal_of(graph: &MergeGraph, id: NodeId) -> Option<&Literal> {
    graph.arena().get(id)?.literal()
}

fn transform_not(graph: &mut MergeGraph, id: NodeId) -> Result<bool, GraphError> {
    let &[child] = graph.arena().children(id) else {
        return Ok(false);
    };
    let negated = match literal_of(graph, child) {
        Some(literal) => truth(!literal.is_truthy()),
        None => return Ok(false),
    };
    replace_with_literal(graph, id, negated)
}

fn transform_connective(
    graph: &mut MergeGraph,
    factory: &CallFactory,
    id: NodeId,
    kind: CallKind,
) -> Result<bool, GraphError> {
    // `and` is decided by a falsy literal, `or` by a truthy one.
    let deciding = kind == CallKind::Or;
    let children = graph.arena().children(id).to_vec();

    let decided = children
        .iter()
        .any(|&child| literal_of(graph, child).is_some_and(|lit| lit.is_truthy() == deciding));
    if decided {
        return replace_with_literal(graph, id, truth(deciding));
    }
    let remaining: Vec<NodeId> = children
        .iter()
        .copied()
        .filter(|&child| literal_of(graph, child).is_none())
        .collect();

    match remaining.as_slice() {
        [] => replace_with_literal(graph, id, truth(!deciding)),
        [only] => {
            debug!(node = %graph.canonical(id), "single operand");
            graph.replace(id, *only)?;
            Ok(true)
        }
        _ => {
            let mut keyed: Vec<(String, NodeId)> = remaining
                .iter()
                .map(|&child| (graph.canonical(child), child))
                .collect();
            keyed.sort_by(|a, b| a.0.cmp(&b.0));
            let sorted: Vec<NodeId> = keyed.into_iter().map(|(_, child)| child).collect();
            if sorted == children {
                return Ok(false);
            }
            let with = factory.create(graph, kind.name(), &sorted)?;
            debug!(node = %graph.canonical(id), to = %graph.canonical(with), "normalize operands");
            graph.replace(id, with)?;
            Ok(true)
        }
    }
}
