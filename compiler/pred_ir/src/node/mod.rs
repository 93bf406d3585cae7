//! Expression nodes.
//!
//! A node is either a [`Literal`] constant or a call of one of the closed set
//! of [`CallKind`]s over an ordered list of children. Nodes live in a
//! [`NodeArena`](crate::NodeArena) and refer to each other by [`NodeId`]:
//!
//! - child edges are owning in the graph sense: a child stays in the graph
//!   for as long as some parent lists it;
//! - parent edges are plain back-references used to rewrite a node in place
//!   and never keep anything alive.
//!
//! Literal nodes never have children.

use std::fmt;
use std::sync::Arc;

use smallvec::SmallVec;

use crate::Value;

/// Handle of a node in a [`NodeArena`](crate::NodeArena).
///
/// Handles stay valid until the node is released; released handles are never
/// reused.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
#[repr(transparent)]
pub struct NodeId(u32);

impl NodeId {
    #[inline]
    pub const fn new(raw: u32) -> Self {
        NodeId(raw)
    }

    /// Position in the arena.
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A constant.
#[derive(Clone, Debug, PartialEq)]
pub enum Literal {
    /// Absence of a value; falsy.
    Null,
    String(Arc<str>),
    Integer(i64),
    Float(f64),
}

impl Literal {
    pub fn string(s: impl Into<Arc<str>>) -> Self {
        Literal::String(s.into())
    }

    /// Null is the only falsy literal.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Literal::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Literal::String(s) => Some(s),
            _ => None,
        }
    }

    /// The value this literal evaluates to; `None` for null.
    pub fn to_value(&self) -> Option<Value> {
        match self {
            Literal::Null => None,
            Literal::String(s) => Some(Value::string(s)),
            Literal::Integer(n) => Some(Value::number(*n)),
            Literal::Float(f) => Some(Value::float(*f)),
        }
    }

    /// Canonical text of this literal.
    ///
    /// - null: `:`
    /// - string: single quoted, with `\` and `'` escaped by a backslash
    /// - integer: decimal
    /// - float: shortest round-trip form, always with a `.` or exponent so it
    ///   never collides with an integer
    pub fn write_canonical(&self, out: &mut String) {
        match self {
            Literal::Null => out.push(':'),
            Literal::String(s) => {
                out.push('\'');
                for c in s.chars() {
                    if c == '\'' || c == '\\' {
                        out.push('\\');
                    }
                    out.push(c);
                }
                out.push('\'');
            }
            Literal::Integer(n) => out.push_str(&n.to_string()),
            Literal::Float(f) => out.push_str(&format!("{f:?}")),
        }
    }

    pub fn canonical(&self) -> String {
        let mut out = String::new();
        self.write_canonical(&mut out);
        out
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical())
    }
}

/// The closed set of call kinds.
///
/// Adding a kind is a compile-time decision: every pass matches on this enum
/// exhaustively.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CallKind {
    True,
    False,
    And,
    Or,
    Not,
    /// `(field 'NAME')`: transaction data by name.
    Field,
    /// `(ask 'NAME' collection)`: members of a collection by name.
    Ask,
    /// `(operator 'OP' 'PARAMS' input)`.
    Operator,
    /// `(transformation 'NAME' input)`.
    Transformation,
    /// `(waitPhase 'PHASE' input)`: nothing until the phase, then input.
    WaitPhase,
    /// `(finishPhase 'PHASE' input)`: input, finished at the phase.
    FinishPhase,
}

impl CallKind {
    pub const ALL: [CallKind; 11] = [
        CallKind::True,
        CallKind::False,
        CallKind::And,
        CallKind::Or,
        CallKind::Not,
        CallKind::Field,
        CallKind::Ask,
        CallKind::Operator,
        CallKind::Transformation,
        CallKind::WaitPhase,
        CallKind::FinishPhase,
    ];

    /// Name used in canonical form.
    pub const fn name(self) -> &'static str {
        match self {
            CallKind::True => "true",
            CallKind::False => "false",
            CallKind::And => "and",
            CallKind::Or => "or",
            CallKind::Not => "not",
            CallKind::Field => "field",
            CallKind::Ask => "ask",
            CallKind::Operator => "operator",
            CallKind::Transformation => "transformation",
            CallKind::WaitPhase => "waitPhase",
            CallKind::FinishPhase => "finishPhase",
        }
    }

    pub fn from_name(name: &str) -> Option<CallKind> {
        CallKind::ALL.into_iter().find(|kind| kind.name() == name)
    }

    /// Child order carries no meaning.
    pub const fn is_commutative(self) -> bool {
        matches!(self, CallKind::And | CallKind::Or)
    }
}

impl fmt::Display for CallKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What a node is.
#[derive(Clone, Debug, PartialEq)]
pub enum NodeKind {
    Literal(Literal),
    Call(CallKind),
}

/// A node and its edges.
#[derive(Clone, Debug)]
pub struct Node {
    pub(crate) kind: NodeKind,
    pub(crate) children: SmallVec<[NodeId; 4]>,
    /// One entry per child edge pointing here, so a parent listing this node
    /// twice appears twice.
    pub(crate) parents: SmallVec<[NodeId; 2]>,
}

impl Node {
    pub(crate) fn new(kind: NodeKind) -> Self {
        Node {
            kind,
            children: SmallVec::new(),
            parents: SmallVec::new(),
        }
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn parents(&self) -> &[NodeId] {
        &self.parents
    }

    pub fn is_literal(&self) -> bool {
        matches!(self.kind, NodeKind::Literal(_))
    }

    pub fn literal(&self) -> Option<&Literal> {
        match &self.kind {
            NodeKind::Literal(lit) => Some(lit),
            NodeKind::Call(_) => None,
        }
    }

    pub fn call_kind(&self) -> Option<CallKind> {
        match self.kind {
            NodeKind::Call(kind) => Some(kind),
            NodeKind::Literal(_) => None,
        }
    }

    /// Call name; `None` for literals.
    pub fn name(&self) -> Option<&'static str> {
        self.call_kind().map(CallKind::name)
    }
}
