//! Simulation error types

use thiserror::Error;
use wlab_core::SolverError;

/// Result type for simulation operations
pub type SimResult<T> = Result<T, SimError>;

/// Errors from channel generation and runs
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimError {
    #[error("Invalid channel count: {0}. Must be at least 1")]
    InvalidChannelCount(usize),

    #[error("Invalid noise power: {0}. Must be positive and finite")]
    InvalidNoisePower(f64),

    #[error("Solver rejected input: {0}")]
    Solver(#[from] SolverError),
}
