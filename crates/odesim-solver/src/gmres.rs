//! Restarted GMRES for dense systems.
//!
//! Arnoldi with modified Gram-Schmidt; the least-squares problem is kept in
//! triangular form with Givens rotations so the residual norm is available
//! after every inner iteration.

use nalgebra::{DMatrix, DVector};

/// GMRES solver configuration.
#[derive(Clone, Debug)]
pub struct GmresConfig {
    /// Krylov dimension per cycle; `None` uses the system size.
    pub restart: Option<usize>,
    /// Maximum restart cycles.
    pub max_cycles: usize,
    /// Convergence tolerance on `||b - A x|| / ||b||`.
    pub tolerance: f64,
}

impl Default for GmresConfig {
    fn default() -> Self {
        Self {
            restart: None,
            max_cycles: 3,
            tolerance: 1e-10,
        }
    }
}

/// GMRES solve result.
#[derive(Clone, Debug)]
pub struct GmresResult {
    /// Solution vector
    pub x: DVector<f64>,
    /// Converged flag
    pub converged: bool,
    /// Inner iterations performed
    pub iterations: usize,
    /// Final residual norm
    pub residual: f64,
}

fn givens(a: f64, b: f64) -> (f64, f64) {
    if b == 0.0 {
        (1.0, 0.0)
    } else {
        let r = a.hypot(b);
        (a / r, b / r)
    }
}

/// Solves `a * x = b` starting from the zero vector.
pub fn solve_gmres(a: &DMatrix<f64>, b: &DVector<f64>, config: &GmresConfig) -> GmresResult {
    let n = b.len();
    let mut x = DVector::zeros(n);
    let b_norm = b.norm();
    if n == 0 || b_norm == 0.0 {
        return GmresResult {
            x,
            converged: true,
            iterations: 0,
            residual: 0.0,
        };
    }

    let m = config.restart.unwrap_or(n).clamp(1, n);
    let target = config.tolerance * b_norm;
    let mut iterations = 0;
    let mut residual = b_norm;

    for _ in 0..config.max_cycles.max(1) {
        let r = b - a * &x;
        let beta = r.norm();
        residual = beta;
        if beta <= target {
            return GmresResult {
                x,
                converged: true,
                iterations,
                residual,
            };
        }

        let mut basis: Vec<DVector<f64>> = Vec::with_capacity(m + 1);
        basis.push(r / beta);
        let mut h = DMatrix::<f64>::zeros(m + 1, m);
        let mut cs = vec![0.0; m];
        let mut sn = vec![0.0; m];
        let mut g = DVector::<f64>::zeros(m + 1);
        g[0] = beta;
        let mut k = 0;

        for j in 0..m {
            let mut w = a * &basis[j];
            for (i, v) in basis.iter().enumerate() {
                let hij = w.dot(v);
                h[(i, j)] = hij;
                w.axpy(-hij, v, 1.0);
            }
            let h_next = w.norm();
            h[(j + 1, j)] = h_next;

            for i in 0..j {
                let upper = cs[i] * h[(i, j)] + sn[i] * h[(i + 1, j)];
                h[(i + 1, j)] = -sn[i] * h[(i, j)] + cs[i] * h[(i + 1, j)];
                h[(i, j)] = upper;
            }
            let (c, s) = givens(h[(j, j)], h[(j + 1, j)]);
            cs[j] = c;
            sn[j] = s;
            h[(j, j)] = c * h[(j, j)] + s * h[(j + 1, j)];
            h[(j + 1, j)] = 0.0;
            g[j + 1] = -s * g[j];
            g[j] *= c;

            k = j + 1;
            iterations += 1;
            residual = g[j + 1].abs();
            // breakdown: the Krylov space is invariant
            if residual <= target || h_next <= f64::EPSILON * beta {
                break;
            }
            basis.push(w / h_next);
        }

        // back substitution on the leading k x k triangle
        let mut y = DVector::<f64>::zeros(k);
        for i in (0..k).rev() {
            let mut acc = g[i];
            for l in (i + 1)..k {
                acc -= h[(i, l)] * y[l];
            }
            let diag = h[(i, i)];
            if diag.abs() <= f64::MIN_POSITIVE || !diag.is_finite() {
                let residual = (b - a * &x).norm();
                return GmresResult {
                    x,
                    converged: false,
                    iterations,
                    residual,
                };
            }
            y[i] = acc / diag;
        }
        for (i, v) in basis.iter().take(k).enumerate() {
            x.axpy(y[i], v, 1.0);
        }
    }

    residual = (b - a * &x).norm();
    GmresResult {
        converged: residual <= target,
        x,
        iterations,
        residual,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solves_small_dense_system() {
        let a = DMatrix::from_row_slice(3, 3, &[4.0, 1.0, 0.0, 1.0, 3.0, -1.0, 0.0, -1.0, 2.0]);
        let x_true = DVector::from_vec(vec![1.0, -2.0, 0.5]);
        let b = &a * &x_true;

        let result = solve_gmres(&a, &b, &GmresConfig::default());
        assert!(result.converged);
        assert!(result.iterations <= 3);
        assert!((result.x - x_true).norm() < 1e-9);
    }

    #[test]
    fn nonsymmetric_system_with_short_restart() {
        let a = DMatrix::from_row_slice(
            4,
            4,
            &[
                10.0, 2.0, 0.0, 1.0, //
                -1.0, 8.0, 3.0, 0.0, //
                0.0, 1.0, 9.0, -2.0, //
                2.0, 0.0, -1.0, 7.0,
            ],
        );
        let x_true = DVector::from_vec(vec![0.3, -1.0, 2.0, 4.0]);
        let b = &a * &x_true;
        let config = GmresConfig {
            restart: Some(3),
            max_cycles: 200,
            tolerance: 1e-12,
        };

        let result = solve_gmres(&a, &b, &config);
        assert!(result.converged, "residual {}", result.residual);
        assert!((result.x - x_true).norm() < 1e-9);
    }

    #[test]
    fn zero_rhs_is_trivially_converged() {
        let a = DMatrix::<f64>::identity(2, 2);
        let b = DVector::zeros(2);
        let result = solve_gmres(&a, &b, &GmresConfig::default());
        assert!(result.converged);
        assert_eq!(result.x, DVector::zeros(2));
    }

    #[test]
    fn singular_system_does_not_converge() {
        let a = DMatrix::<f64>::zeros(2, 2);
        let b = DVector::from_vec(vec![1.0, 1.0]);
        let result = solve_gmres(&a, &b, &GmresConfig::default());
        assert!(!result.converged);
        // the degenerate Hessenberg diagonal stops the solve at the zero start
        assert_eq!(result.x, DVector::zeros(2));
        assert!((result.residual - 2.0_f64.sqrt()).abs() < 1e-12);
    }
}
