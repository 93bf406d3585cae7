//! What the host provides.
//!
//! An [`Environment`] is consulted once per node while a program is being
//! finalized, to turn names into operators, transformations, field slots and
//! phases. A [`Context`] is consulted on every evaluation call, for the
//! transaction's data and current phase.

use std::fmt;
use std::sync::Arc;

use pred_ir::{Phase, Value};

use crate::ResolutionError;

/// Pre-resolved position of a field in the host's data store.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct FieldSlot(pub u32);

/// Engine-wide bindings, resolved once per configuration.
pub trait Environment {
    /// Fixed slot for a field name, if the host indexes it.
    fn field_slot(&self, _name: &str) -> Option<FieldSlot> {
        None
    }

    fn operator(&self, name: &str) -> Result<Arc<dyn OperatorFactory>, ResolutionError>;

    fn transformation(&self, name: &str) -> Result<Arc<dyn Transformation>, ResolutionError>;

    fn phase(&self, name: &str) -> Result<Phase, ResolutionError> {
        Phase::lookup(name).ok_or_else(|| ResolutionError::not_found("phase", name))
    }
}

/// Creates operator instances from literal parameters.
pub trait OperatorFactory: Send + Sync {
    fn create(&self, params: &str) -> Result<Arc<dyn OperatorInstance>, String>;
}

/// Result of running an operator on one input.
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    Miss,
    /// Match, with whatever the operator captured.
    Hit(Vec<Value>),
}

/// A configured operator, shared by every context evaluating the program.
pub trait OperatorInstance: Send + Sync {
    fn execute(&self, context: &dyn Context, input: &Value) -> Result<Outcome, String>;
}

/// A value-to-value function, shared by every context.
pub trait Transformation: Send + Sync {
    fn execute(&self, input: &Value) -> Result<Value, String>;
}

/// One evaluation session, typically a transaction.
pub trait Context {
    /// Where the host is in its lifecycle right now.
    fn phase(&self) -> Phase;

    /// Fetch a field by name. `Ok(None)` means absent, which is not an
    /// error.
    fn field_by_name(&self, name: &str) -> Result<Option<Value>, String>;

    /// Fetch a field by pre-resolved slot.
    fn field_by_slot(&self, slot: FieldSlot) -> Result<Option<Value>, String> {
        Err(format!("field slot {} is not supported", slot.0))
    }
}

impl fmt::Debug for dyn OperatorInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("OperatorInstance")
    }
}

impl fmt::Debug for dyn Transformation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Transformation")
    }
}
