//! Error types for progress configuration.

/// Result type for progress operations.
pub type Result<T> = std::result::Result<T, ProgressError>;

/// Errors raised while configuring a traversal or its estimator.
///
/// Traversals themselves never fail: a sequence without a usable size is
/// simply empty.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProgressError {
    /// Estimator upper bound is not a positive, finite number
    #[error("Invalid estimator max: {0} (expected a positive number of steps)")]
    InvalidMax(f64),

    /// History time constant is not a positive, finite number of seconds
    #[error("Invalid history time constant: {0} (expected positive seconds)")]
    InvalidTimeConstant(f64),
}
