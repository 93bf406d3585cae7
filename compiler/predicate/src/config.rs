//! Compilation settings.

use pred_diagnostic::ReporterConfig;

/// Settings for [`compile`](crate::compile).
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct CompileConfig {
    /// Transform passes allowed before the graph must stop changing. The
    /// final, unchanged pass counts.
    pub max_transform_passes: usize,
    /// Run transform passes at all.
    pub transform: bool,
    /// Maximum number of errors stored (0 = unlimited).
    pub error_limit: usize,
    /// Check the merge graph's internal consistency after transforming.
    pub self_check: bool,
}

impl Default for CompileConfig {
    fn default() -> Self {
        CompileConfig {
            max_transform_passes: 64,
            transform: true,
            error_limit: 0,
            self_check: cfg!(debug_assertions),
        }
    }
}

impl CompileConfig {
    #[must_use]
    pub fn with_max_transform_passes(mut self, passes: usize) -> Self {
        self.max_transform_passes = passes;
        self
    }

    #[must_use]
    pub fn with_transform(mut self, transform: bool) -> Self {
        self.transform = transform;
        self
    }

    #[must_use]
    pub fn with_error_limit(mut self, limit: usize) -> Self {
        self.error_limit = limit;
        self
    }

    #[must_use]
    pub fn with_self_check(mut self, self_check: bool) -> Self {
        self.self_check = self_check;
        self
    }

    pub(crate) fn reporter_config(&self) -> ReporterConfig {
        ReporterConfig::default().with_error_limit(self.error_limit)
    }
}
