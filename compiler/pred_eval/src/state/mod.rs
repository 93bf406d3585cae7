//! Per-context evaluation state.
//!
//! An [`EvalState`] is the table of value streams for one context: one slot
//! per [`NodeIndex`], each holding the values the node has produced so far
//! and a one-way finished flag. The [`Program`] above it is never touched.
//!
//! A slot's stream is one of:
//! - local values pushed by the node itself;
//! - an alias of a [`ValueList`] owned elsewhere (usually by the host), read
//!   through without copying, including its finished flag;
//! - a forward to another node's slot, followed on every read.

mod calculate;

pub use calculate::CAPTURE_NAME;

use std::ops::Deref;

use parking_lot::MappedRwLockReadGuard;
use smallvec::SmallVec;
use tracing::trace;

use pred_ir::{Value, ValueList};

use crate::{Context, EvalError, NodeIndex, Program};

#[derive(Clone, Debug)]
enum Stream {
    Local(Vec<Value>),
    Alias(ValueList),
    Forward(NodeIndex),
}

#[derive(Clone, Debug)]
struct Slot {
    stream: Stream,
    finished: bool,
    /// Input values already consumed by `map_calculate`.
    cursor: usize,
    /// Last round in which the driver visited this node.
    visited: u64,
}

impl Slot {
    /// Open, empty, and holding its own values.
    fn is_untouched(&self) -> bool {
        !self.finished && matches!(&self.stream, Stream::Local(values) if values.is_empty())
    }
}

/// A node being evaluated: the children it pulls and how many it has
/// pulled so far.
struct Frame {
    node: NodeIndex,
    demanded: SmallVec<[NodeIndex; 4]>,
    next: usize,
}

impl Default for Slot {
    fn default() -> Self {
        Slot {
            stream: Stream::Local(Vec::new()),
            finished: false,
            cursor: 0,
            visited: 0,
        }
    }
}

/// Borrowed view of a node's current values.
pub enum Values<'a> {
    Local(&'a [Value]),
    /// Values of an aliased list; holds its read lock.
    Shared(MappedRwLockReadGuard<'a, [Value]>),
}

impl Deref for Values<'_> {
    type Target = [Value];

    fn deref(&self) -> &[Value] {
        match self {
            Values::Local(values) => values,
            Values::Shared(guard) => &**guard,
        }
    }
}

/// Evaluation state of one context against one [`Program`].
pub struct EvalState<'p> {
    program: &'p Program,
    slots: Vec<Slot>,
    round: u64,
}

impl<'p> EvalState<'p> {
    pub fn new(program: &'p Program) -> Self {
        EvalState {
            program,
            slots: vec![Slot::default(); program.len()],
            round: 0,
        }
    }

    pub fn program(&self) -> &'p Program {
        self.program
    }

    fn check(&self, node: NodeIndex) -> Result<(), EvalError> {
        if node.index() < self.slots.len() {
            Ok(())
        } else {
            Err(EvalError::UnknownNode(node.raw()))
        }
    }

    /// Follow forwards to the slot that actually holds `node`'s values.
    fn resolve(&self, mut node: NodeIndex) -> NodeIndex {
        while let Some(Slot {
            stream: Stream::Forward(target),
            ..
        }) = self.slots.get(node.index())
        {
            node = *target;
        }
        node
    }

    /// Will `node` never produce another value in this context?
    pub fn is_finished(&self, node: NodeIndex) -> bool {
        match self.slots.get(self.resolve(node).index()) {
            Some(Slot {
                stream: Stream::Alias(list),
                ..
            }) => list.is_finished(),
            Some(slot) => slot.finished,
            None => false,
        }
    }

    /// Values `node` has produced so far.
    ///
    /// For an aliased list this holds the list's read lock; drop it before
    /// the host appends to that list.
    pub fn values(&self, node: NodeIndex) -> Values<'_> {
        match self.slots.get(self.resolve(node).index()).map(|s| &s.stream) {
            Some(Stream::Local(values)) => Values::Local(values),
            Some(Stream::Alias(list)) => Values::Shared(list.read()),
            Some(Stream::Forward(_)) | None => Values::Local(&[]),
        }
    }

    /// Number of values produced so far.
    pub fn len(&self, node: NodeIndex) -> usize {
        match self.slots.get(self.resolve(node).index()).map(|s| &s.stream) {
            Some(Stream::Local(values)) => values.len(),
            Some(Stream::Alias(list)) => list.len(),
            Some(Stream::Forward(_)) | None => 0,
        }
    }

    /// Copy of the values from position `from` on.
    fn values_from(&self, node: NodeIndex, from: usize) -> Vec<Value> {
        match self.slots.get(self.resolve(node).index()).map(|s| &s.stream) {
            Some(Stream::Local(values)) => values
                .get(from..)
                .map(<[Value]>::to_vec)
                .unwrap_or_default(),
            Some(Stream::Alias(list)) => list.snapshot_from(from),
            Some(Stream::Forward(_)) | None => Vec::new(),
        }
    }

    /// Boolean reading of `node`: `Some(true)` once it has a value,
    /// `Some(false)` once it finished without one, `None` while open and
    /// empty.
    pub fn decision(&self, node: NodeIndex) -> Option<bool> {
        if self.len(node) > 0 {
            Some(true)
        } else if self.is_finished(node) {
            Some(false)
        } else {
            None
        }
    }

    /// Evaluate the subgraph under `node`, then require it to be finished.
    ///
    /// Fails with [`EvalError::Pending`] if `node` is still waiting, e.g. on
    /// a phase the context has not reached.
    pub fn final_values(
        &mut self,
        node: NodeIndex,
        context: &dyn Context,
    ) -> Result<Values<'_>, EvalError> {
        self.eval(node, context)?;
        if !self.is_finished(node) {
            return Err(EvalError::Pending {
                expression: self.expression(node),
            });
        }
        Ok(self.values(node))
    }

    /// Run one evaluation round for the subgraph under `node`.
    ///
    /// Children are calculated before their parents, in order, each node at
    /// most once per round. Finished nodes and aliases are skipped; forwards
    /// are followed. A node only pulls the children its kind needs right now,
    /// and `and`/`or` stop pulling once a child decides them.
    #[tracing::instrument(level = "trace", skip(self, context))]
    pub fn eval(&mut self, node: NodeIndex, context: &dyn Context) -> Result<(), EvalError> {
        self.check(node)?;
        self.round += 1;
        trace!(round = self.round, "eval round");

        let mut stack: Vec<Frame> = self.enter(node, context).into_iter().collect();
        while let Some(top) = stack.last_mut() {
            let current = top.node;
            let decided = top
                .next
                .checked_sub(1)
                .and_then(|last| top.demanded.get(last))
                .is_some_and(|&last| self.decides(current, last));
            let child = top.demanded.get(top.next).copied().filter(|_| !decided);
            match child {
                Some(child) => {
                    top.next += 1;
                    if let Some(frame) = self.enter(child, context) {
                        stack.push(frame);
                    }
                }
                None => {
                    stack.pop();
                    self.calculate(current, context)?;
                }
            }
        }
        Ok(())
    }

    /// Mark `node` visited for this round and open a frame for it, unless
    /// it needs no calculation. Forwards are followed to their target.
    fn enter(&mut self, mut node: NodeIndex, context: &dyn Context) -> Option<Frame> {
        let round = self.round;
        loop {
            let slot = &mut self.slots[node.index()];
            if slot.visited == round {
                return None;
            }
            slot.visited = round;
            match &slot.stream {
                Stream::Forward(target) => node = *target,
                Stream::Alias(_) => return None,
                Stream::Local(_) if slot.finished => return None,
                Stream::Local(_) => break,
            }
        }
        Some(Frame {
            node,
            demanded: self.demanded(node, context),
            next: 0,
        })
    }

    fn expression(&self, node: NodeIndex) -> String {
        self.program
            .expression(node)
            .map_or_else(|| format!("{node:?}"), str::to_owned)
    }

    fn push(&mut self, node: NodeIndex, value: Value) -> Result<(), EvalError> {
        let expression = self.expression(node);
        match self.slots.get_mut(node.index()) {
            Some(Slot {
                stream: Stream::Local(values),
                finished: false,
                ..
            }) => {
                values.push(value);
                Ok(())
            }
            _ => Err(EvalError::AlreadyFinished { expression }),
        }
    }

    fn finish(&mut self, node: NodeIndex) {
        if let Some(slot) = self.slots.get_mut(node.index()) {
            slot.finished = true;
        }
    }

    /// Make `node` a view of `list`. Only an untouched node can alias.
    fn alias(&mut self, node: NodeIndex, list: ValueList) -> Result<(), EvalError> {
        let expression = self.expression(node);
        match self.slots.get_mut(node.index()) {
            Some(slot) if slot.is_untouched() => {
                slot.stream = Stream::Alias(list);
                Ok(())
            }
            _ => Err(EvalError::AlreadyFinished { expression }),
        }
    }

    /// Make `node` read through to `target` from now on.
    fn forward(&mut self, node: NodeIndex, target: NodeIndex) -> Result<(), EvalError> {
        let expression = self.expression(node);
        match self.slots.get_mut(node.index()) {
            Some(slot) if slot.is_untouched() => {
                slot.stream = Stream::Forward(target);
                Ok(())
            }
            _ => Err(EvalError::AlreadyFinished { expression }),
        }
    }
}
