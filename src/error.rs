// src/error.rs

use thiserror::Error;

/// Every failure the projection step can report.
///
/// Nothing is recovered locally: a failing fit, transform or report aborts the
/// whole call chain and no partial result is returned.
#[derive(Error, Debug)]
pub enum ProjectionError {
    /// The training data cannot be fitted (empty, non-finite, degenerate,
    /// or an impossible component request).
    #[error("Cannot fit the projection: {reason}")]
    Fit { reason: String },

    /// The underlying linear-algebra routine failed.
    #[error("Decomposition failed: {0}")]
    Decomposition(String),

    #[error("Dimension mismatch: expected {expected}, found {found}.")]
    DimensionMismatch { expected: usize, found: usize },

    /// Instances to project hold NaN or infinity.
    #[error("Instance {row} has a non-finite value in feature {column}.")]
    NonFinite { row: usize, column: usize },

    /// A truncation size outside `1..=num_components` was requested.
    #[error("Component count {k} is outside the valid range 1..={num_components}.")]
    Range { k: usize, num_components: usize },

    #[error("Row {row} has {found} features, but the first row has {expected}.")]
    RaggedRows {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("The operation requires at least one instance.")]
    NoInstances,

    #[error("Failed to write report: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize report: {0}")]
    Csv(#[from] csv::Error),
}

impl ProjectionError {
    pub(crate) fn fit(reason: impl Into<String>) -> Self {
        ProjectionError::Fit {
            reason: reason.into(),
        }
    }
}
