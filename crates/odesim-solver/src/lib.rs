//! Integration algorithms for odesim.
//!
//! Every solver advances a [`State`](odesim_core::State) across one domain
//! step by one or more internal sub-steps and reports the produced states
//! together with a recommended sub-step count for the next domain step.
//!
//! Provides:
//! - explicit Runge-Kutta driven by Butcher tableaus (RK4, RKF45,
//!   Dormand-Prince, Fehlberg 7(8), Prince-Dormand 8(7))
//! - adaptive step control for the embedded pairs
//! - implicit Newton-Raphson (backward Euler) stepping with GMRES linear solves
//! - naive trapezoidal integration for baseline comparison

pub mod config;
pub mod direct;
pub mod error;
pub mod explicit;
pub mod gmres;
pub mod integrator;
pub mod jacobian;
pub mod newton;
pub mod tableau;

pub use config::{
    AdaptiveBounds, AlgorithmConfig, DEFAULT_NEWTON_ITERATIONS, DEFAULT_NEWTON_TOLERANCE,
    ErrorBounds, IntegratorType, JacobianFormula, StepBounds,
};
pub use direct::DirectIntegration;
pub use error::{SolverError, SolverResult};
pub use explicit::ExplicitRk;
pub use gmres::{GmresConfig, GmresResult, solve_gmres};
pub use integrator::{Integrator, StepInput, StepOutput};
pub use newton::{NewtonRaphson, NewtonResult, newton_sub_step};
pub use tableau::{Controller, Tableau};
