//! Per-compilation configuration.

use srcmodel_common::limits::MAX_RESOLUTION_DEPTH;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompilationOptions {
    /// Look names up case-insensitively.
    pub ignore_case: bool,
    /// Warn when partial declarations disagree on a generic parameter's
    /// variance or special constraints.
    pub report_generic_conflicts: bool,
    /// Maximum number of scopes and alias hops walked for one name.
    pub max_resolution_depth: u32,
}

impl Default for CompilationOptions {
    fn default() -> Self {
        CompilationOptions {
            ignore_case: false,
            report_generic_conflicts: true,
            max_resolution_depth: MAX_RESOLUTION_DEPTH,
        }
    }
}
