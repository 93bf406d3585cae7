//! Compilation failures.

use std::fmt;

use thiserror::Error;

use pred_diagnostic::Diagnostic;

/// Lifecycle stage that reports diagnostics.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Stage {
    Validation,
    Transform,
    PostValidation,
    PreEvaluation,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Validation => write!(f, "validation"),
            Stage::Transform => write!(f, "transform"),
            Stage::PostValidation => write!(f, "post-transform validation"),
            Stage::PreEvaluation => write!(f, "pre-evaluation"),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum CompileError {
    /// A stage reported errors. `diagnostics` holds everything reported so
    /// far, warnings included, up to the error limit.
    #[error("{stage} failed with {errors} error(s)")]
    Stage {
        stage: Stage,
        errors: usize,
        diagnostics: Vec<Diagnostic>,
    },
    /// The merge graph failed its own consistency check.
    #[error("graph self-check failed: {}", .0.join("; "))]
    Internal(Vec<String>),
    #[error("graph still changing after {0} transform passes")]
    TransformLimit(usize),
}

impl CompileError {
    pub fn diagnostics(&self) -> &[Diagnostic] {
        match self {
            CompileError::Stage { diagnostics, .. } => diagnostics,
            CompileError::Internal(_) | CompileError::TransformLimit(_) => &[],
        }
    }
}
