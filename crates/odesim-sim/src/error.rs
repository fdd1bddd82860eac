//! Error types for simulation operations.

use odesim_core::{CoreError, Space, Symbol};
use odesim_solver::SolverError;
use thiserror::Error;

use crate::config::ConfigError;

/// Errors that abort a simulation.
#[derive(Error, Debug)]
pub enum SimError {
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Timespan error: {what}")]
    Timespan { what: String },

    #[error("Simulation not ready: {what}")]
    NotReady { what: &'static str },

    #[error("{space} state is inconsistent for {first} and {others} other symbol(s); match functions with state symbols")]
    Inconsistent {
        space: Space,
        first: Symbol,
        others: usize,
    },

    #[error("Simulation already executed; results are not empty")]
    AlreadyExecuted,

    #[error("Simulation results are only available after a completed run")]
    NotCompleted,

    #[error("Symbol {symbol} not found in domain, X or U variables")]
    SymbolNotFound { symbol: String },

    #[error("Event {label}: symbol {symbol} not found in derivative or input functions")]
    EventTarget { label: String, symbol: Symbol },

    #[error("Event {label}: {what}")]
    InvalidEvent { label: String, what: String },

    #[error("Solver error: {0}")]
    Solver(#[from] SolverError),

    #[error("State error: {0}")]
    Core(#[from] CoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type SimResult<T> = Result<T, SimError>;
