//! TransformError: Unified error type for mesh-transform public APIs
//!
//! Every failure in this crate is a fail-fast contract violation reported to
//! the caller. Nothing is retried internally.

use thiserror::Error;

use crate::transform::TransformKind;

/// Unified error type for transformation and chain operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransformError {
    /// A construction call could not be normalized against the parameter list
    /// of its kind (unknown keyword, duplicate or missing argument, wrong type,
    /// or values violating the todim/fromdim/sign invariant).
    #[error("invalid arguments for {kind}: {reason}")]
    InvalidArguments {
        kind: TransformKind,
        reason: String,
    },
    /// `fromdim`/`todim` of two operands (or of a point array) disagree.
    #[error("dimension mismatch in {op}: expected {expected}, found {found}")]
    DimensionMismatch {
        op: &'static str,
        expected: usize,
        found: usize,
    },
    /// Requested a closed form that is only implemented for small dimensions.
    #[error("unsupported configuration: {0}")]
    UnsupportedConfiguration(String),
    /// Inversion of a non-square or numerically singular map.
    #[error("transformation is singular or not invertible: {0}")]
    SingularOrNonInvertible(String),
}

impl TransformError {
    pub(crate) fn invalid(kind: TransformKind, reason: impl Into<String>) -> Self {
        TransformError::InvalidArguments {
            kind,
            reason: reason.into(),
        }
    }

    pub(crate) fn mismatch(op: &'static str, expected: usize, found: usize) -> Self {
        TransformError::DimensionMismatch {
            op,
            expected,
            found,
        }
    }
}
