//! Engine error types.

use thiserror::Error;

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors that can occur while analysing terrain and ranking placements.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The elevation source could not serve the request.
    #[error("elevation provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// Rows of an elevation grid have inconsistent lengths.
    #[error("ragged elevation grid: row {row} has {actual} cells, expected {expected}")]
    InvalidDimensions {
        row: usize,
        expected: usize,
        actual: usize,
    },

    /// A NaN or infinite elevation value.
    #[error("non-finite elevation at ({x}, {y})")]
    InvalidElevation { x: usize, y: usize },

    /// Observer pixel lies outside the grid.
    #[error("observer ({x}, {y}) outside {width}x{height} grid")]
    InvalidObserver {
        x: usize,
        y: usize,
        width: usize,
        height: usize,
    },

    #[error("invalid parameters: {0}")]
    InvalidParams(String),

    /// Inputs to the optimizer do not describe the same grid / candidate set.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: String, actual: String },

    /// A sightline of zero length (target coincides with a camera).
    #[error("ill-conditioned geometry: zero-length sightline")]
    IllConditionedGeometry,

    #[error("no candidate sites were extracted")]
    NoCandidates,

    #[error("need {required} candidate sites, only {available} available")]
    InsufficientCandidates { required: usize, available: usize },

    /// Every camera combination was excluded for lack of covered points.
    #[error("no camera combination covers any sample point")]
    NoViableCoverage,

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
