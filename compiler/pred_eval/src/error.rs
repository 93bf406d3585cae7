//! Errors raised while binding and evaluating a program.

use thiserror::Error;

/// Failure to resolve a name against the [`Environment`](crate::Environment).
///
/// Raised during pre-evaluation and turned into a diagnostic there.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ResolutionError {
    #[error("no {what} named {name}")]
    NotFound { what: &'static str, name: String },
    #[error("cannot create {name}: {message}")]
    Construction { name: String, message: String },
}

impl ResolutionError {
    pub fn not_found(what: &'static str, name: impl Into<String>) -> Self {
        ResolutionError::NotFound {
            what,
            name: name.into(),
        }
    }
}

/// Hard failure of one evaluation call.
///
/// The context's remaining evaluation is left as it is; the host decides
/// whether to continue with it.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum EvalError {
    #[error("operator {name} failed: {message}")]
    Operator { name: String, message: String },
    #[error("transformation {name} failed: {message}")]
    Transformation { name: String, message: String },
    #[error("cannot read field {name}: {message}")]
    Field { name: String, message: String },
    /// The node was never bound, usually because pre-evaluation reported an
    /// error for it.
    #[error("{expression} has no binding")]
    Unbound { expression: String },
    #[error("{expression} is already finished")]
    AlreadyFinished { expression: String },
    #[error("{expression} did not finish")]
    Pending { expression: String },
    #[error("no node with index {0}")]
    UnknownNode(u32),
}
