//! Discretised simulation domain.
//!
//! A `Timespan` covers `[start, end]` with `steps` intervals of length `dt`.
//! Grid points are computed as `start + k*dt` rather than accumulated, and the
//! last grid point is `end` exactly. A timespan produced by [`Timespan::resume`]
//! may have a final interval shorter than `dt`.

use odesim_core::{Real, STAGNATION_STEP};
use tracing::warn;

use crate::error::{SimError, SimResult};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Timespan {
    start: Real,
    end: Real,
    steps: usize,
    dt: Real,
}

impl Timespan {
    /// Uniform grid of `steps` intervals over `[start, end]`.
    pub fn new(start: Real, end: Real, steps: usize) -> SimResult<Self> {
        if !start.is_finite() || !end.is_finite() {
            return Err(SimError::Timespan {
                what: format!("bounds must be finite (start={start}, end={end})"),
            });
        }
        if start >= end {
            return Err(SimError::Timespan {
                what: format!("start ({start}) must be less than end ({end})"),
            });
        }
        if steps < 1 {
            return Err(SimError::Timespan {
                what: "step count must be at least 1".to_string(),
            });
        }
        let dt = (end - start) / steps as Real;
        Self::checked(start, end, steps, dt)
    }

    /// Grid from `current` to `end` with nominal step length `dt`.
    ///
    /// The step count is `ceil((end - current) / dt)`; a quotient within
    /// rounding of an integer is taken as that integer so no sliver interval
    /// is produced. The final interval covers whatever remains.
    pub fn resume(current: Real, end: Real, dt: Real) -> SimResult<Self> {
        if !dt.is_finite() || dt <= 0.0 {
            return Err(SimError::Timespan {
                what: format!("step length must be positive and finite, got {dt}"),
            });
        }
        if !current.is_finite() || current >= end {
            return Err(SimError::Timespan {
                what: format!("cannot resume at {current} with end {end}"),
            });
        }
        let quotient = (end - current) / dt;
        let nearest = quotient.round();
        let steps = if (quotient - nearest).abs() <= 1e-9 * nearest.max(1.0) {
            nearest
        } else {
            quotient.ceil()
        };
        Self::checked(current, end, (steps as usize).max(1), dt)
    }

    fn checked(start: Real, end: Real, steps: usize, dt: Real) -> SimResult<Self> {
        if dt == 0.0 || !dt.is_finite() {
            return Err(SimError::Timespan {
                what: format!("step length {dt} over [{start}, {end}] is unusable"),
            });
        }
        let scale = start.abs().max(end.abs()).max(1.0);
        if dt.abs() <= STAGNATION_STEP * scale {
            warn!(
                dt,
                start,
                end,
                "step length is near machine precision; the solution may stagnate"
            );
        }
        Ok(Self {
            start,
            end,
            steps,
            dt,
        })
    }

    pub fn start(&self) -> Real {
        self.start
    }

    pub fn end(&self) -> Real {
        self.end
    }

    /// Number of intervals.
    pub fn len(&self) -> usize {
        self.steps
    }

    pub fn is_empty(&self) -> bool {
        self.steps == 0
    }

    /// Nominal step length.
    pub fn dt(&self) -> Real {
        self.dt
    }

    /// Grid point `k`, clamped to `end` for `k >= len()`.
    pub fn time_at(&self, k: usize) -> Real {
        if k >= self.steps {
            self.end
        } else {
            self.start + k as Real * self.dt
        }
    }

    /// Length of the last interval (equal to `dt` for uniform grids).
    pub fn final_interval(&self) -> Real {
        self.end - self.time_at(self.steps - 1)
    }

    /// `true` while more than 90% of the final interval remains after `t`.
    pub fn is_running(&self, t: Real) -> bool {
        self.end - t > 0.9 * self.final_interval()
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn grid_is_monotone_and_closed(
            start in -1e3..1e3_f64,
            span in 1e-3..1e3_f64,
            steps in 1usize..500,
        ) {
            let ts = Timespan::new(start, start + span, steps).unwrap();
            prop_assert_eq!(ts.time_at(0), start);
            prop_assert_eq!(ts.time_at(steps), start + span);
            for k in 0..steps {
                prop_assert!(ts.time_at(k + 1) > ts.time_at(k));
            }
        }

        #[test]
        fn resume_covers_remaining_span(
            current in 0.0..10.0_f64,
            remaining in 1e-2..10.0_f64,
            dt in 1e-2..1.0_f64,
        ) {
            let ts = Timespan::resume(current, current + remaining, dt).unwrap();
            prop_assert!(ts.final_interval() > 0.0);
            prop_assert!(ts.final_interval() <= dt + 1e-9 * remaining + 1e-12);
            prop_assert_eq!(ts.time_at(ts.len()), current + remaining);
        }
    }
}
