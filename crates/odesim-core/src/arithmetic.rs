//! Element-wise arithmetic on the X vector of states.
//!
//! Operations work by slot, not by symbol: operands must share a common
//! ancestor so their layouts agree. Every binary operation panics when the
//! X lengths differ. U values and time stamps are never touched.
//!
//! In-place variants mutate `dst`; `_to` variants overwrite `dst` with a
//! result computed from the other operands.

use crate::numeric::Real;
use crate::state::State;

#[track_caller]
fn check_len(op: &'static str, a: &State, b: &State) {
    assert_eq!(a.x.len(), b.x.len(), "{op}: state X lengths differ");
}

/// `dst = |dst|`
pub fn abs(dst: &mut State) {
    dst.x.apply(|v| *v = v.abs());
}

/// `dst += s`
#[track_caller]
pub fn add(dst: &mut State, s: &State) {
    check_len("add", dst, s);
    dst.x += &s.x;
}

/// `dst = s + t`
#[track_caller]
pub fn add_to(dst: &mut State, s: &State, t: &State) {
    check_len("add_to", dst, s);
    check_len("add_to", s, t);
    dst.x.copy_from(&s.x);
    dst.x += &t.x;
}

/// `dst += c`, element-wise.
pub fn add_const(c: Real, dst: &mut State) {
    dst.x.add_scalar_mut(c);
}

/// `dst += alpha * s`
#[track_caller]
pub fn add_scaled(dst: &mut State, alpha: Real, s: &State) {
    check_len("add_scaled", dst, s);
    dst.x.axpy(alpha, &s.x, 1.0);
}

/// `dst = y + alpha * s`
#[track_caller]
pub fn add_scaled_to(dst: &mut State, y: &State, alpha: Real, s: &State) {
    check_len("add_scaled_to", dst, y);
    check_len("add_scaled_to", y, s);
    dst.x.copy_from(&y.x);
    dst.x.axpy(alpha, &s.x, 1.0);
}

/// `dst -= s`
#[track_caller]
pub fn sub(dst: &mut State, s: &State) {
    check_len("sub", dst, s);
    dst.x -= &s.x;
}

/// `dst = s - t`
#[track_caller]
pub fn sub_to(dst: &mut State, s: &State, t: &State) {
    check_len("sub_to", dst, s);
    check_len("sub_to", s, t);
    dst.x.copy_from(&s.x);
    dst.x -= &t.x;
}

/// `dst *= s`, element-wise.
#[track_caller]
pub fn mul(dst: &mut State, s: &State) {
    check_len("mul", dst, s);
    dst.x.component_mul_assign(&s.x);
}

/// `dst = s * t`, element-wise.
#[track_caller]
pub fn mul_to(dst: &mut State, s: &State, t: &State) {
    check_len("mul_to", dst, s);
    check_len("mul_to", s, t);
    dst.x.copy_from(&s.x);
    dst.x.component_mul_assign(&t.x);
}

/// `dst /= s`, element-wise.
#[track_caller]
pub fn div(dst: &mut State, s: &State) {
    check_len("div", dst, s);
    dst.x.component_div_assign(&s.x);
}

/// `dst = s / t`, element-wise.
#[track_caller]
pub fn div_to(dst: &mut State, s: &State, t: &State) {
    check_len("div_to", dst, s);
    check_len("div_to", s, t);
    dst.x.copy_from(&s.x);
    dst.x.component_div_assign(&t.x);
}

/// `dst *= c`
pub fn scale(c: Real, dst: &mut State) {
    dst.x.scale_mut(c);
}

/// `dst = c * s`
#[track_caller]
pub fn scale_to(dst: &mut State, c: Real, s: &State) {
    check_len("scale_to", dst, s);
    dst.x.copy_from(&s.x);
    dst.x.scale_mut(c);
}

/// Largest X value.
pub fn max(s: &State) -> Real {
    s.x.iter().copied().fold(Real::NEG_INFINITY, Real::max)
}

/// Smallest X value.
pub fn min(s: &State) -> Real {
    s.x.iter().copied().fold(Real::INFINITY, Real::min)
}

/// L-norm of the X vector. `l = inf` gives the max-abs norm.
pub fn norm(s: &State, l: Real) -> Real {
    if l.is_infinite() {
        return s.x.amax();
    }
    if l == 2.0 {
        return s.x.norm();
    }
    s.x.iter()
        .map(|v| v.abs().powf(l))
        .sum::<Real>()
        .powf(1.0 / l)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn st(values: &[Real]) -> State {
        State::from_x_map(
            values
                .iter()
                .enumerate()
                .map(|(i, &v)| (format!("x{i}"), v)),
        )
    }

    #[test]
    fn in_place_operations() {
        let mut a = st(&[1.0, -2.0, 3.0]);
        let b = st(&[0.5, 0.5, 2.0]);

        add(&mut a, &b);
        assert_eq!(a.x_vector(), vec![1.5, -1.5, 5.0]);

        sub(&mut a, &b);
        assert_eq!(a.x_vector(), vec![1.0, -2.0, 3.0]);

        mul(&mut a, &b);
        assert_eq!(a.x_vector(), vec![0.5, -1.0, 6.0]);

        div(&mut a, &b);
        assert_eq!(a.x_vector(), vec![1.0, -2.0, 3.0]);

        add_scaled(&mut a, 2.0, &b);
        assert_eq!(a.x_vector(), vec![2.0, -1.0, 7.0]);

        scale(-1.0, &mut a);
        add_const(1.0, &mut a);
        assert_eq!(a.x_vector(), vec![-1.0, 2.0, -6.0]);

        abs(&mut a);
        assert_eq!(a.x_vector(), vec![1.0, 2.0, 6.0]);
    }

    #[test]
    fn to_variants_overwrite_destination() {
        let s = st(&[1.0, 2.0]);
        let t = st(&[4.0, 8.0]);
        let mut dst = st(&[100.0, 100.0]);

        add_to(&mut dst, &s, &t);
        assert_eq!(dst.x_vector(), vec![5.0, 10.0]);
        sub_to(&mut dst, &s, &t);
        assert_eq!(dst.x_vector(), vec![-3.0, -6.0]);
        mul_to(&mut dst, &s, &t);
        assert_eq!(dst.x_vector(), vec![4.0, 16.0]);
        div_to(&mut dst, &s, &t);
        assert_eq!(dst.x_vector(), vec![0.25, 0.25]);
        scale_to(&mut dst, 3.0, &s);
        assert_eq!(dst.x_vector(), vec![3.0, 6.0]);
        add_scaled_to(&mut dst, &s, 0.5, &t);
        assert_eq!(dst.x_vector(), vec![3.0, 6.0]);
    }

    #[test]
    fn arithmetic_leaves_time_and_inputs_alone() {
        let mut a = st(&[1.0]);
        a.set_time(2.5);
        a.u_equal("u", 7.0);
        let b = st(&[1.0]);
        add_scaled(&mut a, 3.0, &b);
        assert_eq!(a.time(), 2.5);
        assert_eq!(a.u("u"), 7.0);
    }

    #[test]
    fn reductions() {
        let s = st(&[3.0, -4.0, 1.0]);
        assert_eq!(max(&s), 3.0);
        assert_eq!(min(&s), -4.0);
        assert!((norm(&s, 2.0) - 26.0_f64.sqrt()).abs() < 1e-12);
        assert_eq!(norm(&s, 1.0), 8.0);
        assert_eq!(norm(&s, Real::INFINITY), 4.0);
    }

    #[test]
    #[should_panic(expected = "lengths differ")]
    fn mismatched_lengths_panic() {
        let mut a = st(&[1.0, 2.0]);
        let b = st(&[1.0]);
        add(&mut a, &b);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn add_then_sub_restores(values in prop::collection::vec(-1e6..1e6_f64, 1..12)) {
                let original = st(&values);
                let other = st(&values.iter().map(|v| v * 0.5 + 1.0).collect::<Vec<_>>());
                let mut s = original.clone();
                add(&mut s, &other);
                sub(&mut s, &other);
                for (a, b) in s.x_vector().iter().zip(original.x_vector()) {
                    prop_assert!((a - b).abs() <= 1e-9 * b.abs().max(1.0));
                }
            }

            #[test]
            fn add_scaled_to_matches_scale_then_add(
                values in prop::collection::vec(-1e3..1e3_f64, 1..12),
                alpha in -10.0..10.0_f64,
            ) {
                let y = st(&values);
                let s = st(&values.iter().map(|v| v - 2.0).collect::<Vec<_>>());

                let mut fused = y.clone();
                add_scaled_to(&mut fused, &y, alpha, &s);

                let mut stepwise = s.clone();
                scale(alpha, &mut stepwise);
                add(&mut stepwise, &y);

                for (a, b) in fused.x_vector().iter().zip(stepwise.x_vector()) {
                    prop_assert!((a - b).abs() <= 1e-9 * b.abs().max(1.0));
                }
            }

            #[test]
            fn max_bounds_min(values in prop::collection::vec(-1e6..1e6_f64, 1..12)) {
                let s = st(&values);
                prop_assert!(min(&s) <= max(&s));
                prop_assert!(norm(&s, Real::INFINITY) >= max(&s).abs().min(min(&s).abs()));
            }
        }
    }
}
