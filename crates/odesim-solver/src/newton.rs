//! Implicit Newton-Raphson stepping.
//!
//! Each sub-step solves the backward-Euler equations
//! `R_i(next) = next_i - now_i - h * f_i(next) = 0` for `next`. Every iteration
//! re-evaluates the residual, approximates its Jacobian by finite differences,
//! solves `J * delta = R` with GMRES and updates
//! `guess <- guess - (1 - relaxation_factor) * delta`. Iteration stops once the
//! largest component change drops below the tolerance or the iteration cap is
//! reached.

use nalgebra::DVector;
use odesim_core::{Diffs, Real, State};
use tracing::{debug, trace};

use crate::error::{SolverError, SolverResult};
use crate::gmres::{GmresConfig, solve_gmres};
use crate::integrator::{Integrator, StepInput, StepOutput, fixed_sub_steps};
use crate::jacobian::jacobian;

#[derive(Clone, Copy, Debug, Default)]
pub struct NewtonRaphson;

/// Newton iteration summary for one sub-step.
#[derive(Clone, Debug)]
pub struct NewtonResult {
    /// Solution vector
    pub x: DVector<Real>,
    /// Largest component change in the final iteration
    pub change: Real,
    /// Number of iterations
    pub iterations: usize,
    /// Converged flag
    pub converged: bool,
}

/// Residual of the backward-Euler equations at `x`, evaluated on `trial`
/// (a state stamped with the sub-step end time).
fn residual(
    diffs: &Diffs,
    now: &State,
    trial: &mut State,
    h: Real,
    x: &DVector<Real>,
) -> DVector<Real> {
    trial.set_all_x(x.as_slice());
    let f = DVector::from_vec(diffs.evaluate(trial));
    x - now.x_values() - f * h
}

/// Solves one backward-Euler sub-step from `now` to `now.time() + h`.
pub fn newton_sub_step(
    input: &StepInput<'_>,
    now: &State,
    h: Real,
    t_next: Real,
) -> SolverResult<(State, NewtonResult)> {
    let cfg = input.config;
    let tolerance = cfg.newton_tolerance();
    let max_iterations = cfg.newton_iterations();
    let damping = 1.0 - cfg.relaxation_factor;
    let gmres = GmresConfig::default();

    let mut trial = now.clone();
    trial.set_time(t_next);

    let mut guess = now.x_values().clone();
    let mut change = Real::INFINITY;
    let mut iterations = 0;

    while iterations == 0 || (iterations < max_iterations && change > tolerance) {
        let r = residual(input.diffs, now, &mut trial, h, &guess);
        let jac = {
            let cell = std::cell::RefCell::new(trial.clone());
            jacobian(
                &guess,
                |x| Ok(residual(input.diffs, now, &mut cell.borrow_mut(), h, x)),
                cfg.jacobian,
            )?
        };

        let solved = solve_gmres(&jac, &r, &gmres);
        if !solved.converged || !solved.x.iter().all(|v| v.is_finite()) {
            return Err(SolverError::LinearSolve {
                iterations: solved.iterations,
                residual: solved.residual,
            });
        }

        let next = &guess - solved.x * damping;
        change = (&next - &guess).amax();
        guess = next;
        iterations += 1;
        trace!(t = t_next, iterations, change, "newton iteration");
    }

    let converged = change <= tolerance;
    if !converged {
        debug!(
            t = t_next,
            iterations, change, tolerance, "newton iteration cap reached"
        );
    }

    trial.set_all_x(guess.as_slice());
    Ok((
        trial,
        NewtonResult {
            x: guess,
            change,
            iterations,
            converged,
        },
    ))
}

impl Integrator for NewtonRaphson {
    fn name(&self) -> &str {
        "newton_raphson"
    }

    fn advance(&self, input: &StepInput<'_>) -> SolverResult<StepOutput> {
        let states = fixed_sub_steps(input, |now, h, t_next| {
            newton_sub_step(input, now, h, t_next).map(|(next, _)| next)
        })?;
        Ok(StepOutput::fixed(states, input.sub_steps))
    }
}
