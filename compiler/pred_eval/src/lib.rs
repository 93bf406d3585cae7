//! Evaluation of merged predicate graphs.
//!
//! # Architecture
//!
//! - [`Program`]: immutable, indexed and pre-evaluated form of a
//!   [`MergeGraph`](pred_ir::MergeGraph), shared by every context
//! - [`EvalState`]: one context's value streams over a [`Program`]
//! - [`Environment`] / [`Context`]: what the host supplies, at finalize time
//!   and at evaluation time respectively
//!
//! Evaluation is incremental. A context may call [`EvalState::eval`] any
//! number of times as its phase advances and its data grows; values already
//! produced are never retracted and a finished node never reopens.

mod binding;
mod error;
mod program;
mod state;

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod test_support;

pub use binding::{
    Context, Environment, FieldSlot, OperatorFactory, OperatorInstance, Outcome, Transformation,
};
pub use error::{EvalError, ResolutionError};
pub use program::{NodeIndex, Program};
pub use state::{EvalState, Values, CAPTURE_NAME};
