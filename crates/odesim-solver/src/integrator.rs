//! The solver interface.

use odesim_core::{Diffs, Real, State, ensure_all_finite};

use crate::config::{AlgorithmConfig, IntegratorType};
use crate::direct::DirectIntegration;
use crate::error::{SolverError, SolverResult};
use crate::explicit::ExplicitRk;
use crate::newton::NewtonRaphson;

/// Everything a solver needs to advance one domain step.
#[derive(Clone, Copy, Debug)]
pub struct StepInput<'a> {
    /// State at the start of the domain step.
    pub state: &'a State,
    pub diffs: &'a Diffs,
    /// Domain step length.
    pub dt: Real,
    /// Current sub-step count (>= 1).
    pub sub_steps: usize,
    pub config: &'a AlgorithmConfig,
}

impl StepInput<'_> {
    /// Nominal sub-step length.
    pub fn h(&self) -> Real {
        self.dt / self.sub_steps.max(1) as Real
    }

    pub fn end_time(&self) -> Real {
        self.state.time() + self.dt
    }

    /// Time stamp at the end of sub-step `i` of `n`. The last one lands on
    /// [`end_time`](Self::end_time) exactly.
    pub fn sub_step_time(&self, i: usize, n: usize) -> Real {
        if i + 1 >= n {
            self.end_time()
        } else {
            self.state.time() + (i + 1) as Real * (self.dt / n as Real)
        }
    }
}

/// States produced by one solver invocation.
#[derive(Clone, Debug)]
pub struct StepOutput {
    /// Sub-step states; element 0 is the starting state.
    pub states: Vec<State>,
    /// Recommended sub-step count for the next domain step.
    pub next_steps: usize,
    /// Adaptive attempts that were rejected and retried.
    pub rejected: usize,
    /// Some sub-step was accepted at the minimum step length with its local
    /// error above tolerance.
    pub tolerance_exceeded: bool,
}

impl StepOutput {
    pub(crate) fn fixed(states: Vec<State>, steps: usize) -> Self {
        Self {
            states,
            next_steps: steps.max(1),
            rejected: 0,
            tolerance_exceeded: false,
        }
    }

    /// Final state of the step.
    pub fn last(&self) -> Option<&State> {
        self.states.last()
    }
}

/// A stateless integration algorithm.
pub trait Integrator: Send + Sync {
    fn name(&self) -> &str;

    /// Advances `input.state` by `input.dt`.
    fn advance(&self, input: &StepInput<'_>) -> SolverResult<StepOutput>;
}

impl Integrator for IntegratorType {
    fn name(&self) -> &str {
        IntegratorType::name(*self)
    }

    fn advance(&self, input: &StepInput<'_>) -> SolverResult<StepOutput> {
        match self {
            IntegratorType::Rk4 => ExplicitRk::rk4().advance(input),
            IntegratorType::Rkf45 => ExplicitRk::rkf45().advance(input),
            IntegratorType::DormandPrince => ExplicitRk::dormand_prince().advance(input),
            IntegratorType::Rkf78 => ExplicitRk::rkf78().advance(input),
            IntegratorType::Rk87 => ExplicitRk::rk87().advance(input),
            IntegratorType::NewtonRaphson => NewtonRaphson.advance(input),
            IntegratorType::DirectIntegration => DirectIntegration.advance(input),
        }
    }
}

/// Runs `n` sub-steps of nominal length `dt / n`, time-stamping each result.
///
/// `step(prev, h, t_next)` returns the state at `t_next`.
pub(crate) fn fixed_sub_steps<F>(input: &StepInput<'_>, mut step: F) -> SolverResult<Vec<State>>
where
    F: FnMut(&State, Real, Real) -> SolverResult<State>,
{
    check_input(input)?;
    let n = input.sub_steps.max(1);
    let mut states = Vec::with_capacity(n + 1);
    states.push(input.state.clone());
    for i in 0..n {
        let prev = &states[i];
        let t_next = input.sub_step_time(i, n);
        let h = t_next - prev.time();
        if h <= 0.0 {
            return Err(SolverError::Numeric {
                what: format!("sub-step does not advance the domain at t = {}", prev.time()),
            });
        }
        let mut next = step(prev, h, t_next)?;
        next.set_time(t_next);
        ensure_all_finite(next.x_values().as_slice(), "integrated state")?;
        states.push(next);
    }
    Ok(states)
}

pub(crate) fn check_input(input: &StepInput<'_>) -> SolverResult<()> {
    if !(input.dt.is_finite() && input.dt > 0.0) {
        return Err(SolverError::InvalidArg {
            what: "domain step must be positive and finite",
        });
    }
    if input.diffs.len() != input.state.len() {
        return Err(odesim_core::CoreError::ArityMismatch {
            funcs: input.diffs.len(),
            vars: input.state.len(),
        }
        .into());
    }
    Ok(())
}
