//! Diagnostics for predicate graph construction.
//!
//! Configuration problems (bad arity, misplaced literals, unknown operator
//! names) are not `Err`s: every stage reports them to a [`Reporter`] and
//! keeps going, so one load surfaces all of them at once. The caller decides
//! afterwards whether the stage failed by checking
//! [`Reporter::has_errors`].

mod diagnostic;
mod reporter;

pub use diagnostic::{Diagnostic, Severity};
pub use reporter::{NodeReporter, Reporter, ReporterConfig};
