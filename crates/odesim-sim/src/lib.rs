//! Simulation driver for systems of first-order ODEs.
//!
//! Provides:
//! - `Timespan`: the discretised domain and mid-run step-length changes
//! - `Config`: serde-backed configuration with YAML/JSON loaders
//! - events: handlers that change equations, step length or end a run
//! - `Simulation`: the run state machine and result extraction
//! - `ResultsLogger`: fixed-width text log of the result history

pub mod config;
pub mod error;
pub mod events;
pub mod logger;
pub mod simulation;
pub mod timespan;

pub use config::{
    BehaviourConfig, Config, ConfigError, LogConfig, SymbolsConfig, load_json, load_yaml,
};
pub use error::{SimError, SimResult};
pub use events::{Event, EventHandler, EventRecord, FnHandler};
pub use logger::{LogOptions, ResultsLogger};
pub use simulation::{Simulation, Status};
pub use timespan::Timespan;

pub use odesim_core::{Diffs, Expr, Func, FuncMap, Real, State, Symbol, func, state_diff};
pub use odesim_solver::{AlgorithmConfig, Integrator, IntegratorType, StepInput, StepOutput};
