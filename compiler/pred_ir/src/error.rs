//! Errors returned by graph operations.

use thiserror::Error;

/// Failure of an arena or Merge Graph operation.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum GraphError {
    /// A referenced node, root, or edge does not exist.
    #[error("not found: {0}")]
    NotFound(String),
    /// The operation would break a structural invariant.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}
