//! Evaluable expressions and derivative lists.
//!
//! Derivative (Diff) and input functions are pure functions of a [`State`].
//! They are modelled by the [`Expr`] trait so closures, expression trees and
//! user types can all take part in a simulation.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{CoreError, CoreResult};
use crate::numeric::Real;
use crate::state::State;
use crate::symbol::Symbol;

/// A pure function of the simulation state.
pub trait Expr: Send + Sync {
    fn evaluate(&self, state: &State) -> Real;
}

impl<F> Expr for F
where
    F: Fn(&State) -> Real + Send + Sync,
{
    fn evaluate(&self, state: &State) -> Real {
        self(state)
    }
}

/// Shared handle to an expression.
pub type Func = Arc<dyn Expr>;

/// Symbol -> function association (derivatives or inputs).
pub type FuncMap = BTreeMap<Symbol, Func>;

/// Wraps a closure into a [`Func`].
pub fn func<F>(f: F) -> Func
where
    F: Fn(&State) -> Real + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Derivative functions ordered to match the X slots of a state.
#[derive(Clone, Default)]
pub struct Diffs {
    funcs: Vec<Func>,
}

impl Diffs {
    pub fn new(funcs: Vec<Func>) -> Self {
        Self { funcs }
    }

    /// Orders `map` by the X layout of `state`.
    ///
    /// Returns [`CoreError::UnknownSymbol`] for the first X symbol without a
    /// function; map entries without an X counterpart are ignored.
    pub fn aligned(map: &FuncMap, state: &State) -> CoreResult<Self> {
        let funcs = state
            .x_symbols()
            .iter()
            .map(|sym| {
                map.get(sym)
                    .cloned()
                    .ok_or_else(|| CoreError::UnknownSymbol {
                        symbol: sym.clone(),
                        space: crate::symbol::Space::X,
                    })
            })
            .collect::<CoreResult<Vec<_>>>()?;
        Ok(Self { funcs })
    }

    pub fn len(&self) -> usize {
        self.funcs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.funcs.is_empty()
    }

    pub fn get(&self, slot: usize) -> Option<&Func> {
        self.funcs.get(slot)
    }

    /// Replaces the function in `slot`, returning the previous one.
    pub fn replace(&mut self, slot: usize, f: Func) -> Option<Func> {
        self.funcs
            .get_mut(slot)
            .map(|old| std::mem::replace(old, f))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Func> {
        self.funcs.iter()
    }

    /// Evaluates every function at `state`, in slot order.
    pub fn evaluate(&self, state: &State) -> Vec<Real> {
        self.funcs.iter().map(|f| f.evaluate(state)).collect()
    }
}

impl fmt::Debug for Diffs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Diffs").field("len", &self.funcs.len()).finish()
    }
}

impl FromIterator<Func> for Diffs {
    fn from_iter<I: IntoIterator<Item = Func>>(iter: I) -> Self {
        Self {
            funcs: iter.into_iter().collect(),
        }
    }
}

/// Applies `diffs` to `state`.
///
/// The result is a clone of `state` (same time stamp, same inputs) whose X
/// values are the derivative evaluations, in slot order.
pub fn state_diff(diffs: &Diffs, state: &State) -> CoreResult<State> {
    if diffs.len() != state.len() {
        return Err(CoreError::ArityMismatch {
            funcs: diffs.len(),
            vars: state.len(),
        });
    }
    let mut out = state.clone();
    for (slot, f) in diffs.iter().enumerate() {
        out.x[slot] = f.evaluate(state);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn oscillator() -> (State, FuncMap) {
        let mut s = State::from_x_map([("pos", 1.0), ("vel", 2.0)]);
        s.set_time(0.75);
        s.u_equal("force", 3.0);

        let mut map = FuncMap::new();
        map.insert("vel".into(), func(|s: &State| -s.x("pos") + s.u("force")));
        map.insert("pos".into(), func(|s: &State| s.x("vel")));
        (s, map)
    }

    #[test]
    fn state_diff_evaluates_in_slot_order() {
        let (s, map) = oscillator();
        let diffs = Diffs::aligned(&map, &s).unwrap();
        let d = state_diff(&diffs, &s).unwrap();

        assert_eq!(d.time(), 0.75);
        assert_eq!(d.x_symbols(), s.x_symbols());
        assert_eq!(d.x_vector(), vec![2.0, 2.0]);
        assert_eq!(d.u("force"), 3.0);
        // input untouched
        assert_eq!(s.x_vector(), vec![1.0, 2.0]);
    }

    #[test]
    fn state_diff_rejects_arity_mismatch() {
        let (s, _) = oscillator();
        let diffs = Diffs::new(vec![func(|_: &State| 0.0)]);
        let err = state_diff(&diffs, &s).unwrap_err();
        assert!(matches!(err, CoreError::ArityMismatch { funcs: 1, vars: 2 }));
    }

    #[test]
    fn aligned_reports_missing_symbol() {
        let (s, mut map) = oscillator();
        map.remove("vel");
        let err = Diffs::aligned(&map, &s).unwrap_err();
        assert!(format!("{err}").contains("vel"));
    }

    #[test]
    fn replace_swaps_a_single_slot() {
        let (s, map) = oscillator();
        let mut diffs = Diffs::aligned(&map, &s).unwrap();
        assert!(diffs.replace(1, func(|_: &State| 10.0)).is_some());
        assert!(diffs.replace(5, func(|_: &State| 10.0)).is_none());
        assert_eq!(diffs.evaluate(&s), vec![2.0, 10.0]);
    }

    struct Linear {
        gain: Real,
    }

    impl Expr for Linear {
        fn evaluate(&self, state: &State) -> Real {
            self.gain * state.time()
        }
    }

    #[test]
    fn user_types_implement_expr() {
        let f: Func = Arc::new(Linear { gain: 4.0 });
        let mut s = State::new();
        s.set_time(0.5);
        assert_eq!(f.evaluate(&s), 2.0);
    }
}
