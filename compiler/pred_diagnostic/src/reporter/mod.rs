//! Collection of diagnostics across a graph stage.
//!
//! Features:
//! - Error limit, so a badly broken configuration does not flood the host
//! - Per-severity counts that keep counting past the limit
//! - [`NodeReporter`], a view scoped to one node for per-kind checks

use tracing::debug;

use pred_ir::NodeId;

use crate::{Diagnostic, Severity};

/// Configuration for diagnostic collection.
#[derive(Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct ReporterConfig {
    /// Maximum number of errors stored (0 = unlimited). Errors past the
    /// limit are still counted.
    pub error_limit: usize,
}

impl ReporterConfig {
    /// Store every diagnostic.
    pub fn unlimited() -> Self {
        ReporterConfig { error_limit: 0 }
    }

    #[must_use]
    pub fn with_error_limit(mut self, limit: usize) -> Self {
        self.error_limit = limit;
        self
    }
}

/// Collects diagnostics.
#[derive(Clone, Debug, Default)]
pub struct Reporter {
    config: ReporterConfig,
    diagnostics: Vec<Diagnostic>,
    error_count: usize,
    warning_count: usize,
    stored_errors: usize,
}

impl Reporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ReporterConfig) -> Self {
        Reporter {
            config,
            ..Self::default()
        }
    }

    pub fn report(&mut self, diagnostic: Diagnostic) {
        debug!(
            severity = %diagnostic.severity,
            expression = %diagnostic.expression,
            message = %diagnostic.message,
            "diagnostic"
        );
        match diagnostic.severity {
            Severity::Error => {
                self.error_count += 1;
                if self.limit_reached() {
                    return;
                }
                self.stored_errors += 1;
            }
            Severity::Warning => self.warning_count += 1,
        }
        self.diagnostics.push(diagnostic);
    }

    pub fn error(&mut self, node: NodeId, expression: impl Into<String>, message: impl Into<String>) {
        self.report(Diagnostic::error(node, expression, message));
    }

    pub fn warn(&mut self, node: NodeId, expression: impl Into<String>, message: impl Into<String>) {
        self.report(Diagnostic::warning(node, expression, message));
    }

    /// A reporter view attributing everything to `node`.
    pub fn for_node(&mut self, node: NodeId, expression: impl Into<String>) -> NodeReporter<'_> {
        NodeReporter {
            reporter: self,
            node,
            expression: expression.into(),
        }
    }

    /// Have as many errors as the limit allows been stored?
    pub fn limit_reached(&self) -> bool {
        self.config.error_limit > 0 && self.stored_errors >= self.config.error_limit
    }

    /// Errors reported, including any past the limit.
    pub fn error_count(&self) -> usize {
        self.error_count
    }

    pub fn warning_count(&self) -> usize {
        self.warning_count
    }

    pub fn has_errors(&self) -> bool {
        self.error_count > 0
    }

    /// Stored diagnostics, in reporting order.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}

/// Reporter scoped to one node.
pub struct NodeReporter<'r> {
    reporter: &'r mut Reporter,
    node: NodeId,
    expression: String,
}

impl NodeReporter<'_> {
    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    pub fn error(&mut self, message: impl Into<String>) {
        let diag = Diagnostic::error(self.node, self.expression.clone(), message);
        self.reporter.report(diag);
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        let diag = Diagnostic::warning(self.node, self.expression.clone(), message);
        self.reporter.report(diag);
    }
}
