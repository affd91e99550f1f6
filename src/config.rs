//! Analysis configuration.

use crate::types::SymbolId;

/// Configuration of a [`RangePass`][crate::pass::RangePass] run.
///
/// # Examples
///
/// ```
/// use range_rs::config::RangeConfig;
///
/// let config = RangeConfig::default().with_max_iterations(10).with_watch("var.count");
/// assert_eq!(config.max_iterations, 10);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeConfig {
    /// Rounds allowed before ids still changing are widened to the full range
    /// (default: 5).
    pub max_iterations: usize,
    /// Id whose every update is traced at `info` level (default: none).
    pub watch: Option<SymbolId>,
}

impl Default for RangeConfig {
    fn default() -> Self {
        Self {
            max_iterations: 5,
            watch: None,
        }
    }
}

impl RangeConfig {
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_watch(mut self, id: impl Into<SymbolId>) -> Self {
        self.watch = Some(id.into());
        self
    }
}
