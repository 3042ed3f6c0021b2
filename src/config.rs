//! Numerical configuration for chain rewriting.

use serde::{Deserialize, Serialize};

/// Default relative tolerance for the commutation residual test.
pub const DEFAULT_COMMUTE_TOLERANCE: f64 = 1e-10;

/// Tolerances used when commuting a uniform scale past an updim step.
///
/// Canonicalization solves a small least-squares system for the offset of the
/// commuted scale. The rewrite is accepted only if the solution reproduces the
/// composed map of the pair, i.e. the residual satisfies
/// `|A d - v| <= tolerance * (1 + |v|)` in the max norm.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommuteConfig {
    pub tolerance: f64,
}

impl Default for CommuteConfig {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_COMMUTE_TOLERANCE,
        }
    }
}

impl CommuteConfig {
    /// Config with an explicit tolerance.
    pub fn with_tolerance(tolerance: f64) -> Self {
        Self { tolerance }
    }

    /// Whether `residual` is negligible relative to `scale`.
    #[inline]
    pub fn accepts(&self, residual: f64, scale: f64) -> bool {
        residual <= self.tolerance * (1.0 + scale)
    }
}
