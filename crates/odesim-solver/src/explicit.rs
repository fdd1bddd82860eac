//! Explicit Runge-Kutta integration driven by a [`Tableau`].
//!
//! Fixed-step tableaus run `sub_steps` equal sub-steps per domain step.
//! Embedded tableaus do the same unless adaptive bounds are configured, in
//! which case each sub-step is accepted or retried according to the local
//! error estimate (max absolute component of the difference between the two
//! solutions).

use odesim_core::arithmetic::{abs, add_scaled, max};
use odesim_core::{Diffs, Real, State, ensure_all_finite, ensure_finite, state_diff};
use tracing::{trace, warn};

use crate::config::AdaptiveBounds;
use crate::error::{SolverError, SolverResult};
use crate::integrator::{Integrator, StepInput, StepOutput, check_input, fixed_sub_steps};
use crate::tableau::{self, Controller, Tableau};

#[derive(Clone, Copy, Debug)]
pub struct ExplicitRk {
    tableau: &'static Tableau,
}

impl ExplicitRk {
    pub fn new(tableau: &'static Tableau) -> Self {
        Self { tableau }
    }

    pub fn rk4() -> Self {
        Self::new(&tableau::RK4)
    }

    pub fn rkf45() -> Self {
        Self::new(&tableau::RKF45)
    }

    pub fn dormand_prince() -> Self {
        Self::new(&tableau::DORMAND_PRINCE)
    }

    pub fn rkf78() -> Self {
        Self::new(&tableau::RKF78)
    }

    pub fn rk87() -> Self {
        Self::new(&tableau::RK87)
    }

    pub fn tableau(&self) -> &'static Tableau {
        self.tableau
    }

    /// Stage derivatives for one sub-step of length `h` from `y`.
    ///
    /// Each stage state is stamped with `t + c_i*h` before the derivatives
    /// are evaluated on it.
    fn stages(&self, diffs: &Diffs, y: &State, h: Real) -> SolverResult<Vec<State>> {
        let tab = self.tableau;
        let mut k: Vec<State> = Vec::with_capacity(tab.stages());
        for (row, c) in tab.a.iter().zip(tab.c) {
            let mut yi = y.clone();
            yi.set_time(y.time() + c * h);
            for (kj, a) in k.iter().zip(row.iter()) {
                if *a != 0.0 {
                    add_scaled(&mut yi, h * a, kj);
                }
            }
            k.push(state_diff(diffs, &yi)?);
        }
        Ok(k)
    }

    fn combine(y: &State, h: Real, weights: &[Real], k: &[State]) -> State {
        let mut out = y.clone();
        for (w, kj) in weights.iter().zip(k) {
            if *w != 0.0 {
                add_scaled(&mut out, h * w, kj);
            }
        }
        out
    }

    /// One sub-step. Returns the propagated state (time not yet stamped) and,
    /// for embedded tableaus, the max-abs local error estimate.
    fn attempt(&self, diffs: &Diffs, y: &State, h: Real) -> SolverResult<(State, Option<Real>)> {
        let k = self.stages(diffs, y, h)?;
        let next = Self::combine(y, h, self.tableau.b, &k);
        let err = match self.tableau.b_alt {
            Some(alt) => {
                let mut e = y.clone_blank(y.time());
                for ((b, a), kj) in self.tableau.b.iter().zip(alt).zip(&k) {
                    let w = b - a;
                    if w != 0.0 {
                        add_scaled(&mut e, h * w, kj);
                    }
                }
                abs(&mut e);
                Some(if e.is_empty() { 0.0 } else { max(&e) })
            }
            None => None,
        };
        Ok((next, err))
    }

    fn advance_adaptive(
        &self,
        input: &StepInput<'_>,
        controller: &Controller,
        bounds: AdaptiveBounds,
    ) -> SolverResult<StepOutput> {
        let end = input.end_time();
        // slivers below this are absorbed into the preceding sub-step
        let slack = 4.0 * Real::EPSILON * end.abs().max(input.dt);

        let mut states = vec![input.state.clone()];
        let mut h = input.h();
        let mut rejected = 0;
        let mut tolerance_exceeded = false;

        loop {
            let current = states.last().map(State::time).unwrap_or(end);
            let remaining = end - current;
            if remaining <= slack {
                break;
            }
            let last = h >= remaining - slack;
            let nominal = if last { remaining } else { h };
            let t_next = if last { end } else { current + h };
            // X advances by the representable time increment only
            let h_try = t_next - current;
            if h_try <= 0.0 {
                return Err(SolverError::Numeric {
                    what: format!("sub-step {h:e} does not advance the domain at t = {current}"),
                });
            }

            let from = &states[states.len() - 1];
            let (mut next, err) = self.attempt(input.diffs, from, h_try)?;
            let err = ensure_finite(err.unwrap_or(0.0), "local error estimate")?;

            let ratio = bounds.tolerance / err;
            let h_new = controller.propose(h_try, ratio, &bounds);

            if ratio < 1.0 && nominal > bounds.min {
                rejected += 1;
                trace!(t = current, h = h_try, h_new, err, "sub-step rejected");
                h = h_new;
                continue;
            }
            if ratio < 1.0 {
                tolerance_exceeded = true;
                warn!(
                    t = current,
                    h = h_try,
                    err,
                    tolerance = bounds.tolerance,
                    "accepted sub-step at minimum step length above error tolerance"
                );
            }

            next.set_time(t_next);
            ensure_all_finite(next.x_values().as_slice(), "integrated state")?;
            states.push(next);
            h = h_new;
        }

        let next_steps = ((input.dt / h).floor() as usize).max(1);
        Ok(StepOutput {
            states,
            next_steps,
            rejected,
            tolerance_exceeded,
        })
    }
}

impl Integrator for ExplicitRk {
    fn name(&self) -> &str {
        self.tableau.name
    }

    fn advance(&self, input: &StepInput<'_>) -> SolverResult<StepOutput> {
        check_input(input)?;
        if let (Some(controller), Some(bounds)) =
            (self.tableau.controller.as_ref(), input.config.adaptive())
        {
            if self.tableau.b_alt.is_some() {
                return self.advance_adaptive(input, controller, bounds);
            }
        }
        let states = fixed_sub_steps(input, |prev, h, _| {
            let (next, _) = self.attempt(input.diffs, prev, h)?;
            Ok(next)
        })?;
        Ok(StepOutput::fixed(states, input.sub_steps))
    }
}
