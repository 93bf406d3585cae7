//! Per-kind calculation.
//!
//! `calculate` runs after the driver has brought every demanded child up to
//! date for the current round. It only reads children's streams and writes
//! the node's own slot; it never recurses.

use smallvec::SmallVec;

use pred_ir::{CallKind, NodeKind, Value, ValueData, ValueList};

use super::EvalState;
use crate::program::{Binding, ProgramNode};
use crate::{Context, EvalError, NodeIndex, Outcome};

/// Name of the value an operator produces on a match.
pub const CAPTURE_NAME: &str = "predicate_operator_capture";

impl<'p> EvalState<'p> {
    fn program_node(&self, node: NodeIndex) -> Result<&'p ProgramNode, EvalError> {
        let program = self.program;
        program
            .node(node)
            .ok_or(EvalError::UnknownNode(node.raw()))
    }

    /// Children `node` needs evaluated this round.
    pub(super) fn demanded(
        &self,
        node: NodeIndex,
        context: &dyn Context,
    ) -> SmallVec<[NodeIndex; 4]> {
        let Ok(pnode) = self.program_node(node) else {
            return SmallVec::new();
        };
        let kind = match &pnode.kind {
            NodeKind::Literal(_) => return SmallVec::new(),
            NodeKind::Call(kind) => *kind,
        };
        let nth = |position: usize| -> SmallVec<[NodeIndex; 4]> {
            pnode.children.get(position).copied().into_iter().collect()
        };
        match kind {
            CallKind::True | CallKind::False | CallKind::Field => SmallVec::new(),
            CallKind::And | CallKind::Or | CallKind::Not => pnode.children.clone(),
            CallKind::Ask | CallKind::Transformation | CallKind::FinishPhase => nth(1),
            CallKind::Operator => nth(2),
            CallKind::WaitPhase => match pnode.binding {
                Binding::Phase(phase) if context.phase() == phase => nth(1),
                _ => SmallVec::new(),
            },
        }
    }

    /// Does `child`'s current reading decide the `and`/`or` at `node`?
    pub(super) fn decides(&self, node: NodeIndex, child: NodeIndex) -> bool {
        let decider = match self.program_node(node).map(|pnode| &pnode.kind) {
            Ok(NodeKind::Call(CallKind::And)) => false,
            Ok(NodeKind::Call(CallKind::Or)) => true,
            _ => return false,
        };
        self.decision(child) == Some(decider)
    }

    pub(super) fn calculate(
        &mut self,
        node: NodeIndex,
        context: &dyn Context,
    ) -> Result<(), EvalError> {
        let pnode = self.program_node(node)?;
        let kind = match (&pnode.kind, &pnode.binding) {
            (NodeKind::Literal(_), Binding::Value(value)) => {
                if let Some(value) = value {
                    self.push(node, value.clone())?;
                }
                self.finish(node);
                return Ok(());
            }
            (NodeKind::Literal(_), _) => return Err(unbound(pnode)),
            (NodeKind::Call(kind), _) => *kind,
        };

        match kind {
            CallKind::True => {
                self.push(node, Value::truthy())?;
                self.finish(node);
            }
            CallKind::False => self.finish(node),
            CallKind::And => self.connective(node, pnode, false)?,
            CallKind::Or => self.connective(node, pnode, true)?,
            CallKind::Not => {
                let child = input(pnode, 0)?;
                match self.decision(child) {
                    Some(true) => self.finish(node),
                    Some(false) => {
                        self.push(node, Value::truthy())?;
                        self.finish(node);
                    }
                    None => {}
                }
            }
            CallKind::Field => self.field(node, pnode, context)?,
            CallKind::Ask => self.ask(node, pnode)?,
            CallKind::Operator => {
                let Binding::Operator { name, instance } = &pnode.binding else {
                    return Err(unbound(pnode));
                };
                self.map_calculate(node, input(pnode, 2)?, |value| {
                    match instance.execute(context, value) {
                        Ok(Outcome::Hit(captures)) => Ok(Some(Value::new(
                            CAPTURE_NAME,
                            ValueData::List(ValueList::finished(captures)),
                        ))),
                        Ok(Outcome::Miss) => Ok(None),
                        Err(message) => Err(EvalError::Operator {
                            name: name.to_string(),
                            message,
                        }),
                    }
                })?;
            }
            CallKind::Transformation => {
                let Binding::Transformation {
                    name,
                    transformation,
                } = &pnode.binding
                else {
                    return Err(unbound(pnode));
                };
                self.map_calculate(node, input(pnode, 1)?, |value| {
                    transformation
                        .execute(value)
                        .map(Some)
                        .map_err(|message| EvalError::Transformation {
                            name: name.to_string(),
                            message,
                        })
                })?;
            }
            CallKind::WaitPhase => {
                let Binding::Phase(phase) = pnode.binding else {
                    return Err(unbound(pnode));
                };
                if context.phase() == phase {
                    self.forward(node, input(pnode, 1)?)?;
                }
            }
            CallKind::FinishPhase => {
                let Binding::Phase(phase) = pnode.binding else {
                    return Err(unbound(pnode));
                };
                self.map_calculate(node, input(pnode, 1)?, |value| Ok(Some(value.clone())))?;
                if context.phase() == phase {
                    self.finish(node);
                }
            }
        }
        Ok(())
    }

    /// `and` (`decider == false`) or `or` (`decider == true`).
    ///
    /// Decided as soon as one child reads as `decider`; otherwise once every
    /// child reads as the opposite.
    fn connective(
        &mut self,
        node: NodeIndex,
        pnode: &ProgramNode,
        decider: bool,
    ) -> Result<(), EvalError> {
        let mut undecided = false;
        for &child in &pnode.children {
            match self.decision(child) {
                Some(d) if d == decider => return self.conclude(node, decider),
                Some(_) => {}
                None => undecided = true,
            }
        }
        if undecided {
            Ok(())
        } else {
            self.conclude(node, !decider)
        }
    }

    fn conclude(&mut self, node: NodeIndex, truthy: bool) -> Result<(), EvalError> {
        if truthy {
            self.push(node, Value::truthy())?;
        }
        self.finish(node);
        Ok(())
    }

    fn field(
        &mut self,
        node: NodeIndex,
        pnode: &ProgramNode,
        context: &dyn Context,
    ) -> Result<(), EvalError> {
        let Binding::Field { name, slot } = &pnode.binding else {
            return Err(unbound(pnode));
        };
        let fetched = match slot {
            Some(slot) => context.field_by_slot(*slot),
            None => context.field_by_name(name),
        }
        .map_err(|message| EvalError::Field {
            name: name.to_string(),
            message,
        })?;

        match fetched {
            None => self.finish(node),
            Some(value) => match value.as_list().cloned() {
                Some(list) => self.alias(node, list)?,
                None => {
                    self.push(node, value)?;
                    self.finish(node);
                }
            },
        }
        Ok(())
    }

    /// Members of the collection child named like the `ask`.
    ///
    /// A dynamic collection is asked directly and aliased. Otherwise the
    /// collection's values are matched on their own names as they arrive.
    fn ask(&mut self, node: NodeIndex, pnode: &ProgramNode) -> Result<(), EvalError> {
        let Binding::Ask { name } = &pnode.binding else {
            return Err(unbound(pnode));
        };
        let collection = input(pnode, 1)?;
        let collection_done = self.is_finished(collection);
        let cursor = self.slots[node.index()].cursor;
        let fresh = self.values_from(collection, cursor);

        if cursor == 0 {
            if let Some(dynamic) = fresh.first().and_then(Value::as_dynamic) {
                match dynamic.lookup(name) {
                    Some(list) => self.alias(node, list)?,
                    None => self.finish(node),
                }
                return Ok(());
            }
        }

        self.slots[node.index()].cursor = cursor + fresh.len();
        for value in fresh {
            if value.name_matches(name) {
                self.push(node, value)?;
            }
        }
        if collection_done {
            self.finish(node);
        }
        Ok(())
    }

    /// Apply `f` to each value `input` produced since the last call, pushing
    /// whatever it returns. Finishes `node` once `input` is finished.
    fn map_calculate(
        &mut self,
        node: NodeIndex,
        input: NodeIndex,
        mut f: impl FnMut(&Value) -> Result<Option<Value>, EvalError>,
    ) -> Result<(), EvalError> {
        // Read the flag first: values appended after it are picked up next
        // round instead of being lost.
        let input_done = self.is_finished(input);
        let cursor = self.slots[node.index()].cursor;
        let fresh = self.values_from(input, cursor);
        self.slots[node.index()].cursor = cursor + fresh.len();

        for value in &fresh {
            if let Some(out) = f(value)? {
                self.push(node, out)?;
            }
        }
        if input_done {
            self.finish(node);
        }
        Ok(())
    }
}

fn input(pnode: &ProgramNode, position: usize) -> Result<NodeIndex, EvalError> {
    pnode
        .children
        .get(position)
        .copied()
        .ok_or_else(|| unbound(pnode))
}

fn unbound(pnode: &ProgramNode) -> EvalError {
    EvalError::Unbound {
        expression: pnode.expression.clone(),
    }
}
