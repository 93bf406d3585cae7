//! Predicate expressions merged into one graph and evaluated incrementally.
//!
//! Rules contribute boolean expressions as roots of a shared
//! [`MergeGraph`]; identical subexpressions collapse into a single node, so
//! each is calculated once per transaction no matter how many rules use it.
//!
//! # Lifecycle
//!
//! 1. Build expressions and add them as roots (`MergeGraph::add_root`).
//! 2. [`compile`]: validate, transform to a fixpoint, validate again, and
//!    finalize against an [`Environment`] into an immutable [`Program`].
//! 3. Per transaction: create an [`EvalState`] and call
//!    [`EvalState::eval`] on the roots of interest as the transaction
//!    advances through its phases.
//!
//! Enable logging with `RUST_LOG=predicate=debug` (or `pred_eval=trace` for
//! evaluation rounds) after calling [`init_tracing`].

mod config;
mod error;

use std::sync::Once;

use tracing::debug;

pub use config::CompileConfig;
pub use error::{CompileError, Stage};

pub use pred_diagnostic::{Diagnostic, Reporter, ReporterConfig, Severity};
pub use pred_eval::{
    Context, Environment, EvalError, EvalState, FieldSlot, NodeIndex, OperatorFactory,
    OperatorInstance, Outcome, Program, ResolutionError, Transformation, Values, CAPTURE_NAME,
};
pub use pred_ir::{
    to_dot, to_dot_with, CallFactory, CallKind, DynamicList, GraphError, Literal, MergeGraph,
    NodeId, NodeKind, Phase, Value, ValueData, ValueError, ValueList,
};
pub use pred_passes::{transform_graph, validate_graph};

/// Result of a successful [`compile`].
#[derive(Debug)]
pub struct Compiled {
    pub program: Program,
    /// Warnings reported along the way.
    pub diagnostics: Vec<Diagnostic>,
}

/// Run the configuration-time lifecycle on `graph` and finalize it.
///
/// Stops at the first stage that reports an error. `graph` is left as that
/// stage left it.
#[tracing::instrument(level = "debug", skip_all, fields(roots = graph.roots().len()))]
pub fn compile(
    graph: &mut MergeGraph,
    factory: &CallFactory,
    env: &dyn Environment,
    config: &CompileConfig,
) -> Result<Compiled, CompileError> {
    let mut reporter = Reporter::with_config(config.reporter_config());

    validate_graph(graph, &mut reporter);
    check(Stage::Validation, &reporter)?;

    if config.transform {
        let mut passes = 0;
        loop {
            if passes == config.max_transform_passes {
                return Err(CompileError::TransformLimit(passes));
            }
            passes += 1;
            let changed = transform_graph(graph, factory, &mut reporter);
            check(Stage::Transform, &reporter)?;
            if !changed {
                break;
            }
        }
        debug!(passes, nodes = graph.arena().len(), "transform settled");
    }

    if config.self_check {
        let report = graph.validation_report();
        if !report.is_empty() {
            return Err(CompileError::Internal(report));
        }
    }

    validate_graph(graph, &mut reporter);
    check(Stage::PostValidation, &reporter)?;

    let program = Program::finalize(graph, env, &mut reporter);
    check(Stage::PreEvaluation, &reporter)?;

    Ok(Compiled {
        program,
        diagnostics: reporter.into_diagnostics(),
    })
}

fn check(stage: Stage, reporter: &Reporter) -> Result<(), CompileError> {
    if reporter.has_errors() {
        debug!(%stage, errors = reporter.error_count(), "stage failed");
        return Err(CompileError::Stage {
            stage,
            errors: reporter.error_count(),
            diagnostics: reporter.diagnostics().to_vec(),
        });
    }
    Ok(())
}

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for debug output.
///
/// Safe to call multiple times. Does nothing unless `RUST_LOG` is set.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{prelude::*, EnvFilter};
        use tracing_tree::HierarchicalLayer;

        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    HierarchicalLayer::new(2)
                        .with_targets(true)
                        .with_indent_lines(true),
                )
                .init();
        }
    });
}
