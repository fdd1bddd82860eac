//! Algorithm configuration shared by all solvers.

use std::fmt;
use std::str::FromStr;

use odesim_core::Real;

use crate::error::SolverError;

/// Newton tolerance used when `error.max` is not configured.
pub const DEFAULT_NEWTON_TOLERANCE: Real = 1e-5;

/// Newton iteration cap used when `iteration_max` is not configured.
pub const DEFAULT_NEWTON_ITERATIONS: usize = 10;

/// Integrator selection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum IntegratorType {
    /// Classical 4th-order Runge-Kutta (default).
    #[default]
    Rk4,
    /// Runge-Kutta-Fehlberg 4(5), adaptive.
    Rkf45,
    /// Dormand-Prince 5(4), adaptive.
    DormandPrince,
    /// Runge-Kutta-Fehlberg 7(8), adaptive.
    Rkf78,
    /// Prince-Dormand 8(7), adaptive.
    Rk87,
    /// Implicit backward-Euler stepping solved with Newton-Raphson.
    NewtonRaphson,
    /// Naive trapezoidal integration, one derivative evaluation per sub-step.
    DirectIntegration,
}

impl IntegratorType {
    pub const ALL: [IntegratorType; 7] = [
        IntegratorType::Rk4,
        IntegratorType::Rkf45,
        IntegratorType::DormandPrince,
        IntegratorType::Rkf78,
        IntegratorType::Rk87,
        IntegratorType::NewtonRaphson,
        IntegratorType::DirectIntegration,
    ];

    pub fn name(self) -> &'static str {
        match self {
            IntegratorType::Rk4 => "rk4",
            IntegratorType::Rkf45 => "rkf45",
            IntegratorType::DormandPrince => "dormand_prince",
            IntegratorType::Rkf78 => "rkf78",
            IntegratorType::Rk87 => "rk87",
            IntegratorType::NewtonRaphson => "newton_raphson",
            IntegratorType::DirectIntegration => "direct_integration",
        }
    }
}

impl fmt::Display for IntegratorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for IntegratorType {
    type Err = SolverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase().replace('-', "_");
        match key.as_str() {
            "newton" => return Ok(IntegratorType::NewtonRaphson),
            "direct" => return Ok(IntegratorType::DirectIntegration),
            "dopri" | "dopri5" => return Ok(IntegratorType::DormandPrince),
            _ => {}
        }
        IntegratorType::ALL
            .into_iter()
            .find(|t| t.name() == key)
            .ok_or(SolverError::InvalidArg {
                what: "unknown integrator name",
            })
    }
}

/// Finite-difference formula for Jacobian approximation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum JacobianFormula {
    #[default]
    Forward,
    Central,
}

impl JacobianFormula {
    /// Relative perturbation used for this formula.
    pub fn epsilon(self) -> Real {
        match self {
            JacobianFormula::Forward => 1e-8,
            JacobianFormula::Central => 6e-6,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default, deny_unknown_fields))]
pub struct StepBounds {
    pub min: Option<Real>,
    pub max: Option<Real>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default, deny_unknown_fields))]
pub struct ErrorBounds {
    pub max: Option<Real>,
}

/// Numerical settings consumed by solvers.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default, deny_unknown_fields))]
pub struct AlgorithmConfig {
    /// Sub-steps per domain step (>= 1).
    pub steps: usize,
    /// Solver used when none is set programmatically; `None` leaves the
    /// simulation without a solver.
    pub solver: Option<IntegratorType>,
    /// Adaptive step-length bounds.
    pub step: StepBounds,
    /// Maximum local error (adaptive solvers) or Newton tolerance.
    pub error: ErrorBounds,
    /// Newton update damping in `[0, 1)`; the update is scaled by `1 - relaxation_factor`.
    pub relaxation_factor: Real,
    /// Newton iteration cap.
    pub iteration_max: Option<usize>,
    pub jacobian: JacobianFormula,
}

impl Default for AlgorithmConfig {
    fn default() -> Self {
        Self {
            steps: 1,
            solver: Some(IntegratorType::Rk4),
            step: StepBounds::default(),
            error: ErrorBounds::default(),
            relaxation_factor: 0.0,
            iteration_max: None,
            jacobian: JacobianFormula::default(),
        }
    }
}

/// Resolved adaptive-stepping parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AdaptiveBounds {
    pub tolerance: Real,
    pub min: Real,
    pub max: Real,
}

impl AlgorithmConfig {
    /// Adaptive stepping is active only when the error tolerance and both
    /// step bounds are positive and `step.max > step.min`.
    pub fn adaptive(&self) -> Option<AdaptiveBounds> {
        let tolerance = self.error.max.filter(|v| *v > 0.0)?;
        let min = self.step.min.filter(|v| *v > 0.0)?;
        let max = self.step.max.filter(|v| *v > min)?;
        Some(AdaptiveBounds { tolerance, min, max })
    }

    /// True when both step bounds are set but cannot enable adaptivity.
    pub fn step_bounds_inconsistent(&self) -> bool {
        matches!((self.step.min, self.step.max), (Some(min), Some(max)) if max <= min)
    }

    pub fn newton_tolerance(&self) -> Real {
        self.error
            .max
            .filter(|v| *v > 0.0)
            .unwrap_or(DEFAULT_NEWTON_TOLERANCE)
    }

    pub fn newton_iterations(&self) -> usize {
        self.iteration_max
            .filter(|v| *v > 0)
            .unwrap_or(DEFAULT_NEWTON_ITERATIONS)
    }
}
