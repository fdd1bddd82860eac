//! Finite-difference Jacobians of the implicit step residual.
//!
//! Perturbations are relative: `dx = epsilon * max(|x_j|, 1)`.

use crate::config::JacobianFormula;
use crate::error::SolverResult;
use nalgebra::{DMatrix, DVector};

/// Forward differences: one extra residual evaluation per column.
pub fn finite_difference_jacobian<F>(
    x: &DVector<f64>,
    f: F,
    epsilon: f64,
) -> SolverResult<DMatrix<f64>>
where
    F: Fn(&DVector<f64>) -> SolverResult<DVector<f64>>,
{
    let base = f(x)?;
    let mut jac = DMatrix::zeros(base.len(), x.len());
    let mut probe = x.clone();
    for j in 0..x.len() {
        let dx = epsilon * x[j].abs().max(1.0);
        probe[j] = x[j] + dx;
        let shifted = f(&probe)?;
        probe[j] = x[j];
        jac.set_column(j, &((shifted - &base) / dx));
    }
    Ok(jac)
}

/// Central differences: two residual evaluations per column, second-order accurate.
pub fn central_difference_jacobian<F>(
    x: &DVector<f64>,
    f: F,
    epsilon: f64,
) -> SolverResult<DMatrix<f64>>
where
    F: Fn(&DVector<f64>) -> SolverResult<DVector<f64>>,
{
    let n = x.len();
    let mut jac: Option<DMatrix<f64>> = None;

    for j in 0..n {
        let dx = epsilon * x[j].abs().max(1.0);

        let mut x_plus = x.clone();
        x_plus[j] += dx;
        let f_plus = f(&x_plus)?;

        let mut x_minus = x.clone();
        x_minus[j] -= dx;
        let f_minus = f(&x_minus)?;

        let jac = jac.get_or_insert_with(|| DMatrix::zeros(f_plus.len(), n));
        jac.set_column(j, &((f_plus - f_minus) / (2.0 * dx)));
    }

    match jac {
        Some(jac) => Ok(jac),
        None => Ok(DMatrix::zeros(f(x)?.len(), 0)),
    }
}

/// Jacobian of `f` at `x` with the chosen formula and its default step.
pub fn jacobian<F>(x: &DVector<f64>, f: F, formula: JacobianFormula) -> SolverResult<DMatrix<f64>>
where
    F: Fn(&DVector<f64>) -> SolverResult<DVector<f64>>,
{
    match formula {
        JacobianFormula::Forward => finite_difference_jacobian(x, f, formula.epsilon()),
        JacobianFormula::Central => central_difference_jacobian(x, f, formula.epsilon()),
    }
}
