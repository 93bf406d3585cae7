//! Finalized, immutable form of a merged graph.
//!
//! Finalization walks everything reachable from the roots, gives each node a
//! dense [`NodeIndex`] in `[0, N)`, copies its shape, and pre-evaluates it
//! against an [`Environment`]: names become operator instances,
//! transformations, field slots and phases.
//!
//! A [`Program`] never changes afterwards and is `Send + Sync`, so one
//! program serves any number of concurrent contexts, each with its own
//! [`EvalState`](crate::EvalState).

use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use tracing::debug;

use pred_diagnostic::{NodeReporter, Reporter};
use pred_ir::traverse::bfs_down;
use pred_ir::{CallKind, Literal, MergeGraph, NodeId, NodeKind, Phase, Value};

use crate::{Environment, FieldSlot, OperatorInstance, Transformation};

/// Dense position of a node in a [`Program`].
#[derive(Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
#[repr(transparent)]
pub struct NodeIndex(u32);

impl NodeIndex {
    #[inline]
    pub const fn new(raw: u32) -> Self {
        NodeIndex(raw)
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for NodeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeIndex({})", self.0)
    }
}

/// What pre-evaluation resolved for a node.
#[derive(Clone, Debug)]
pub(crate) enum Binding {
    /// Needs nothing beyond its children.
    Structural,
    /// Literal value; `None` for null.
    Value(Option<Value>),
    Field {
        name: Arc<str>,
        slot: Option<FieldSlot>,
    },
    Ask {
        name: Arc<str>,
    },
    Operator {
        name: Arc<str>,
        instance: Arc<dyn OperatorInstance>,
    },
    Transformation {
        name: Arc<str>,
        transformation: Arc<dyn Transformation>,
    },
    Phase(Phase),
    /// Pre-evaluation failed.
    Unbound,
}

#[derive(Clone, Debug)]
pub(crate) struct ProgramNode {
    pub(crate) kind: NodeKind,
    pub(crate) children: SmallVec<[NodeIndex; 4]>,
    pub(crate) expression: String,
    pub(crate) binding: Binding,
}

#[derive(Debug)]
pub struct Program {
    nodes: Vec<ProgramNode>,
    node_ids: Vec<NodeId>,
    index_of: FxHashMap<NodeId, NodeIndex>,
    roots: Vec<NodeIndex>,
}

impl Program {
    /// Index and pre-evaluate everything reachable from `graph`'s roots.
    ///
    /// Resolution problems are reported to `reporter` and leave the node
    /// unbound; evaluating an unbound node is an error.
    pub fn finalize(graph: &MergeGraph, env: &dyn Environment, reporter: &mut Reporter) -> Program {
        let node_ids = bfs_down(graph.arena(), graph.roots().iter().copied());
        let index_of: FxHashMap<NodeId, NodeIndex> = node_ids
            .iter()
            .enumerate()
            .filter_map(|(i, id)| Some((*id, NodeIndex::new(u32::try_from(i).ok()?))))
            .collect();

        let mut nodes = Vec::with_capacity(node_ids.len());
        for &id in &node_ids {
            let Some(node) = graph.arena().get(id) else {
                continue;
            };
            let expression = graph.canonical(id);
            let children = node
                .children()
                .iter()
                .filter_map(|c| index_of.get(c).copied())
                .collect();
            let binding = {
                let mut scoped = reporter.for_node(id, expression.clone());
                pre_eval(graph, node.kind(), node.children(), env, &mut scoped)
            };
            nodes.push(ProgramNode {
                kind: node.kind().clone(),
                children,
                expression,
                binding,
            });
        }

        let roots = graph
            .roots()
            .iter()
            .filter_map(|r| index_of.get(r).copied())
            .collect::<Vec<_>>();
        debug!(nodes = nodes.len(), roots = roots.len(), "finalized program");
        Program {
            nodes,
            node_ids,
            index_of,
            roots,
        }
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Root nodes, by root index.
    pub fn roots(&self) -> &[NodeIndex] {
        &self.roots
    }

    pub fn root(&self, index: usize) -> Option<NodeIndex> {
        self.roots.get(index).copied()
    }

    /// Index of a graph node, if it was reachable when finalizing.
    pub fn index_of(&self, id: NodeId) -> Option<NodeIndex> {
        self.index_of.get(&id).copied()
    }

    /// Graph node a program node was built from.
    pub fn node_id(&self, node: NodeIndex) -> Option<NodeId> {
        self.node_ids.get(node.index()).copied()
    }

    /// Canonical form of a node.
    pub fn expression(&self, node: NodeIndex) -> Option<&str> {
        self.nodes.get(node.index()).map(|n| n.expression.as_str())
    }

    pub fn kind(&self, node: NodeIndex) -> Option<&NodeKind> {
        self.nodes.get(node.index()).map(|n| &n.kind)
    }

    pub(crate) fn node(&self, node: NodeIndex) -> Option<&ProgramNode> {
        self.nodes.get(node.index())
    }
}

fn string_child<'g>(graph: &'g MergeGraph, children: &[NodeId], index: usize) -> Option<&'g str> {
    let child = *children.get(index)?;
    graph.arena().get(child)?.literal().and_then(Literal::as_str)
}

fn pre_eval(
    graph: &MergeGraph,
    kind: &NodeKind,
    children: &[NodeId],
    env: &dyn Environment,
    reporter: &mut NodeReporter<'_>,
) -> Binding {
    let kind = match kind {
        NodeKind::Literal(literal) => return Binding::Value(literal.to_value()),
        NodeKind::Call(kind) => *kind,
    };
    let arg = |index: usize, reporter: &mut NodeReporter<'_>| {
        let found = string_child(graph, children, index);
        if found.is_none() {
            reporter.error(format!("{kind} is missing its string argument {}", index + 1));
        }
        found
    };

    match kind {
        CallKind::True | CallKind::False | CallKind::And | CallKind::Or | CallKind::Not => {
            Binding::Structural
        }
        CallKind::Field => match arg(0, reporter) {
            Some(name) => Binding::Field {
                name: name.into(),
                slot: env.field_slot(name),
            },
            None => Binding::Unbound,
        },
        CallKind::Ask => match arg(0, reporter) {
            Some(name) => Binding::Ask { name: name.into() },
            None => Binding::Unbound,
        },
        CallKind::Operator => {
            let (Some(name), Some(params)) = (arg(0, reporter), arg(1, reporter)) else {
                return Binding::Unbound;
            };
            let instance = env.operator(name).and_then(|factory| {
                factory
                    .create(params)
                    .map_err(|message| crate::ResolutionError::Construction {
                        name: name.to_owned(),
                        message,
                    })
            });
            match instance {
                Ok(instance) => Binding::Operator {
                    name: name.into(),
                    instance,
                },
                Err(err) => {
                    reporter.error(err.to_string());
                    Binding::Unbound
                }
            }
        }
        CallKind::Transformation => {
            let Some(name) = arg(0, reporter) else {
                return Binding::Unbound;
            };
            match env.transformation(name) {
                Ok(transformation) => Binding::Transformation {
                    name: name.into(),
                    transformation,
                },
                Err(err) => {
                    reporter.error(err.to_string());
                    Binding::Unbound
                }
            }
        }
        CallKind::WaitPhase | CallKind::FinishPhase => {
            let Some(name) = arg(0, reporter) else {
                return Binding::Unbound;
            };
            match env.phase(name) {
                Ok(phase) => Binding::Phase(phase),
                Err(err) => {
                    reporter.error(err.to_string());
                    Binding::Unbound
                }
            }
        }
    }
}
