//! Scalar type and finiteness checks.

use crate::CoreError;

/// Floating point type used for every state value and domain coordinate.
pub type Real = f64;

/// Relative step lengths at or below this value risk stagnating the domain coordinate.
pub const STAGNATION_STEP: Real = 2.0 * Real::EPSILON;

pub fn ensure_finite(v: Real, what: &'static str) -> Result<Real, CoreError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(CoreError::NonFinite { what, value: v })
    }
}

/// Fails on the first non-finite entry of `values`.
pub fn ensure_all_finite(values: &[Real], what: &'static str) -> Result<(), CoreError> {
    values
        .iter()
        .try_for_each(|&v| ensure_finite(v, what).map(|_| ()))
}
