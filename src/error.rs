//! Error type for [`crate::fit_incremental`] and [`crate::fit_incremental_f32`].

use thiserror::Error;

/// Invalid-argument and allocation-class failures.
///
/// Degenerate tangents and solver near-misses are *not* represented here —
/// per the fitter's design, those surface as a large-but-finite squared
/// error that naturally excludes a knot from collapsing, never as an `Err`.
#[derive(Debug, Error, PartialEq)]
pub enum FitError {
    #[error("points_len must be non-zero")]
    EmptyInput,

    #[error("dims must be non-zero")]
    ZeroDimensions,

    #[error("error_threshold must be non-negative, got {0}")]
    NegativeErrorThreshold(f64),

    #[error("points slice length mismatch: expected {expected}, got {actual}")]
    PointsLengthMismatch { expected: usize, actual: usize },
}
