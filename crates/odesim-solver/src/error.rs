//! Error types for solver operations.

use odesim_core::CoreError;
use thiserror::Error;

/// Errors that abort a solver invocation.
#[derive(Error, Debug)]
pub enum SolverError {
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("Linear solve failed after {iterations} iterations (residual: {residual:.3e})")]
    LinearSolve { iterations: usize, residual: f64 },

    #[error("Numeric error: {what}")]
    Numeric { what: String },

    #[error("State error: {0}")]
    Core(#[from] CoreError),
}

pub type SolverResult<T> = Result<T, SolverError>;
