//! Predicate IR: values, expression nodes and the Merge Graph.
//!
//! # Architecture
//!
//! - [`Value`] / [`ValueList`]: runtime data flowing through expressions
//! - [`Node`] in a [`NodeArena`], addressed by [`NodeId`]: literal or call
//! - [`MergeGraph`]: all rule expressions merged by canonical form
//! - [`Phase`]: host lifecycle points used by phase gates
//!
//! The graph is mutable only while a configuration is being built. Once it is
//! finalized for evaluation (see `pred_eval`) nothing here changes again.

mod arena;
mod call_factory;
mod dot;
mod error;
mod merge;
mod node;
mod phase;
pub mod traverse;
mod value;

pub use arena::NodeArena;
pub use call_factory::CallFactory;
pub use dot::{to_dot, to_dot_with};
pub use error::GraphError;
pub use merge::MergeGraph;
pub use node::{CallKind, Literal, Node, NodeId, NodeKind};
pub use phase::Phase;
pub use value::{DynamicList, Value, ValueData, ValueError, ValueList};
