//! Solver error types

use thiserror::Error;

/// Result type for solver operations
pub type SolverResult<T> = Result<T, SolverError>;

/// Errors raised before a water-filling solve starts.
///
/// Running out of iterations is not an error; it is reported through
/// [`Allocation::converged`](crate::waterfilling::Allocation::converged).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolverError {
    /// No sub-channels were supplied
    #[error("At least one channel is required")]
    NoChannels,

    /// Power budget is zero, negative or not finite
    #[error("Invalid total power: {0}. Must be positive and finite")]
    InvalidPower(f64),

    /// A channel floor (1/SNR) is zero, negative or not finite
    #[error("Invalid inverse SNR {value} on channel {index}. Must be positive and finite")]
    InvalidInverseSnr { index: usize, value: f64 },

    /// Convergence tolerance is zero, negative or not finite
    #[error("Invalid convergence tolerance: {0}. Must be positive and finite")]
    InvalidTolerance(f64),

    /// Iteration cap of zero
    #[error("Iteration cap must be at least 1")]
    InvalidIterationCap,

    /// Two per-channel slices that must line up do not
    #[error("Length mismatch: expected {expected} channels, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },
}

impl SolverError {
    /// Whether the error comes from the channel set rather than solver settings.
    pub fn is_channel_error(&self) -> bool {
        matches!(
            self,
            SolverError::NoChannels
                | SolverError::InvalidInverseSnr { .. }
                | SolverError::LengthMismatch { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = SolverError::InvalidInverseSnr { index: 2, value: -1.0 };
        assert_eq!(
            err.to_string(),
            "Invalid inverse SNR -1 on channel 2. Must be positive and finite"
        );
        assert_eq!(
            SolverError::LengthMismatch { expected: 3, actual: 2 }.to_string(),
            "Length mismatch: expected 3 channels, got 2"
        );
    }

    #[test]
    fn test_channel_error_classification() {
        assert!(SolverError::NoChannels.is_channel_error());
        assert!(!SolverError::InvalidPower(0.0).is_channel_error());
        assert!(!SolverError::InvalidIterationCap.is_channel_error());
    }
}
