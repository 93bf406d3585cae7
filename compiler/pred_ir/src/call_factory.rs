//! Creation of call nodes by name.

use rustc_hash::FxHashMap;

use crate::{CallKind, GraphError, MergeGraph, NodeId};

/// Maps call names to kinds.
///
/// Transforms build replacement nodes through a factory so they can be
/// restricted to a subset of kinds.
#[derive(Clone, Debug)]
pub struct CallFactory {
    by_name: FxHashMap<&'static str, CallKind>,
}

impl CallFactory {
    /// A factory that knows no calls.
    pub fn empty() -> Self {
        CallFactory {
            by_name: FxHashMap::default(),
        }
    }

    /// A factory for every standard call kind.
    pub fn standard() -> Self {
        CallKind::ALL
            .into_iter()
            .fold(Self::empty(), CallFactory::with)
    }

    #[must_use]
    pub fn with(mut self, kind: CallKind) -> Self {
        self.by_name.insert(kind.name(), kind);
        self
    }

    pub fn kind(&self, name: &str) -> Result<CallKind, GraphError> {
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| GraphError::NotFound(format!("no call named {name}")))
    }

    /// Create a loose call node named `name` in `graph`.
    pub fn create(
        &self,
        graph: &mut MergeGraph,
        name: &str,
        children: &[NodeId],
    ) -> Result<NodeId, GraphError> {
        let kind = self.kind(name)?;
        graph.call(kind, children)
    }
}

impl Default for CallFactory {
    fn default() -> Self {
        Self::standard()
    }
}
