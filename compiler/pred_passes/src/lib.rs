//! Configuration-time passes over a [`MergeGraph`](pred_ir::MergeGraph).
//!
//! - [`validate`]: per-kind arity and literal checks, run before and after
//!   transformation
//! - [`transform`]: per-kind rewrites (constant folding of the boolean
//!   connectives, canonical child order), run to a fixpoint
//!
//! Both report problems to a [`Reporter`](pred_diagnostic::Reporter) rather
//! than failing, so a whole configuration is checked in one go.

pub mod transform;
pub mod validate;

pub use transform::{transform_graph, transform_node};
pub use validate::{validate_graph, validate_node};
