//! Naive trapezoidal integration.
//!
//! `y_{n+1} = y_n + (f_n + f_{n-1}) * h/2`, with `f_{-1} = f_0` at the start
//! of every domain step. One derivative evaluation per sub-step; meant as a
//! baseline to compare the other solvers against.

use odesim_core::arithmetic::{add, add_scaled};
use odesim_core::state_diff;

use crate::error::SolverResult;
use crate::integrator::{Integrator, StepInput, StepOutput, fixed_sub_steps};

#[derive(Clone, Copy, Debug, Default)]
pub struct DirectIntegration;

impl Integrator for DirectIntegration {
    fn name(&self) -> &str {
        "direct_integration"
    }

    fn advance(&self, input: &StepInput<'_>) -> SolverResult<StepOutput> {
        let mut previous = None;
        let states = fixed_sub_steps(input, |y, h, _| {
            let current = state_diff(input.diffs, y)?;
            let mut slope = previous.take().unwrap_or_else(|| current.clone());
            add(&mut slope, &current);

            let mut next = y.clone();
            add_scaled(&mut next, 0.5 * h, &slope);
            previous = Some(current);
            Ok(next)
        })?;
        Ok(StepOutput::fixed(states, input.sub_steps))
    }
}
