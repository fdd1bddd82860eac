//! The simulation state value type.
//!
//! A [`State`] holds two dense vectors, X (integrated variables) and U
//! (inputs), plus the domain coordinate at which it is valid. Symbol indices
//! are shared between clones, so cloning a state copies only the numbers.

use std::sync::Arc;

use nalgebra::DVector;

use crate::error::{CoreError, CoreResult};
use crate::numeric::Real;
use crate::symbol::{Space, Symbol, SymbolIndex};

#[derive(Debug, Clone)]
pub struct State {
    time: Real,
    pub(crate) x_index: Arc<SymbolIndex>,
    pub(crate) x: DVector<Real>,
    u_index: Arc<SymbolIndex>,
    u: DVector<Real>,
}

impl Default for State {
    fn default() -> Self {
        Self::new()
    }
}

impl State {
    /// Empty state at time zero.
    pub fn new() -> Self {
        Self {
            time: 0.0,
            x_index: Arc::new(SymbolIndex::new()),
            x: DVector::zeros(0),
            u_index: Arc::new(SymbolIndex::new()),
            u: DVector::zeros(0),
        }
    }

    /// Builds a state whose X variables follow the iteration order of `values`.
    pub fn from_x_map<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = (S, Real)>,
        S: Into<Symbol>,
    {
        let mut state = Self::new();
        for (sym, v) in values {
            state.x_equal(sym, v);
        }
        state
    }

    pub fn time(&self) -> Real {
        self.time
    }

    pub fn set_time(&mut self, time: Real) {
        self.time = time;
    }

    /// Number of X variables.
    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    pub fn u_len(&self) -> usize {
        self.u.len()
    }

    // ---- X space ----

    /// Value of X variable `sym`.
    ///
    /// # Panics
    ///
    /// Panics when `sym` is not an X variable. Derivative closures use this
    /// accessor, so a typo surfaces at the first evaluation.
    pub fn x(&self, sym: &str) -> Real {
        match self.try_x(sym) {
            Some(v) => v,
            None => panic!("symbol {sym} does not exist in X variables"),
        }
    }

    pub fn try_x(&self, sym: &str) -> Option<Real> {
        self.x_index.get(sym).map(|i| self.x[i])
    }

    pub fn has_x(&self, sym: &str) -> bool {
        self.x_index.contains(sym)
    }

    /// Overwrites an existing X variable.
    pub fn x_set(&mut self, sym: &str, value: Real) -> CoreResult<()> {
        let slot = self.x_index.get(sym).ok_or_else(|| CoreError::UnknownSymbol {
            symbol: Symbol::from(sym),
            space: Space::X,
        })?;
        self.x[slot] = value;
        Ok(())
    }

    /// Sets X variable `sym`, appending a new slot if it does not exist yet.
    ///
    /// Appending is a construction-time operation; the X layout must stay
    /// fixed once a run starts.
    pub fn x_equal(&mut self, sym: impl Into<Symbol>, value: Real) {
        let sym = sym.into();
        if let Some(slot) = self.x_index.get(&sym) {
            self.x[slot] = value;
            return;
        }
        Arc::make_mut(&mut self.x_index).insert(sym);
        self.x = append(std::mem::replace(&mut self.x, DVector::zeros(0)), value);
    }

    pub fn x_symbols(&self) -> &[Symbol] {
        self.x_index.symbols()
    }

    pub fn x_index(&self) -> &SymbolIndex {
        &self.x_index
    }

    /// Copy of the X values in slot order.
    pub fn x_vector(&self) -> Vec<Real> {
        self.x.iter().copied().collect()
    }

    pub fn x_values(&self) -> &DVector<Real> {
        &self.x
    }

    /// Overwrites every X value in slot order.
    ///
    /// # Panics
    ///
    /// Panics if `values.len()` differs from the number of X variables.
    pub fn set_all_x(&mut self, values: &[Real]) {
        assert_eq!(
            values.len(),
            self.x.len(),
            "set_all_x: length mismatch with X vector"
        );
        self.x.copy_from_slice(values);
    }

    // ---- U space ----

    /// Value of input `sym`.
    ///
    /// # Panics
    ///
    /// Panics when `sym` is not a U variable.
    pub fn u(&self, sym: &str) -> Real {
        match self.try_u(sym) {
            Some(v) => v,
            None => panic!("symbol {sym} does not exist in U variables"),
        }
    }

    pub fn try_u(&self, sym: &str) -> Option<Real> {
        self.u_index.get(sym).map(|i| self.u[i])
    }

    pub fn has_u(&self, sym: &str) -> bool {
        self.u_index.contains(sym)
    }

    pub fn u_set(&mut self, sym: &str, value: Real) -> CoreResult<()> {
        let slot = self.u_index.get(sym).ok_or_else(|| CoreError::UnknownSymbol {
            symbol: Symbol::from(sym),
            space: Space::U,
        })?;
        self.u[slot] = value;
        Ok(())
    }

    pub fn u_equal(&mut self, sym: impl Into<Symbol>, value: Real) {
        let sym = sym.into();
        if let Some(slot) = self.u_index.get(&sym) {
            self.u[slot] = value;
            return;
        }
        Arc::make_mut(&mut self.u_index).insert(sym);
        self.u = append(std::mem::replace(&mut self.u, DVector::zeros(0)), value);
    }

    pub fn u_symbols(&self) -> &[Symbol] {
        self.u_index.symbols()
    }

    pub fn u_vector(&self) -> Vec<Real> {
        self.u.iter().copied().collect()
    }

    // ---- derived states ----

    /// Structurally identical copy with X zeroed and the time set to `time`.
    /// Inputs are carried over unchanged.
    pub fn clone_blank(&self, time: Real) -> Self {
        Self {
            time,
            x_index: Arc::clone(&self.x_index),
            x: DVector::zeros(self.x.len()),
            u_index: Arc::clone(&self.u_index),
            u: self.u.clone(),
        }
    }

    /// Copy whose X variables are sorted by symbol name.
    pub fn sorted(&self) -> Self {
        let mut order: Vec<usize> = (0..self.x.len()).collect();
        order.sort_by(|&a, &b| self.x_symbols()[a].cmp(&self.x_symbols()[b]));

        let index: SymbolIndex = order.iter().map(|&i| self.x_symbols()[i].clone()).collect();
        let x = DVector::from_iterator(order.len(), order.iter().map(|&i| self.x[i]));
        Self {
            time: self.time,
            x_index: Arc::new(index),
            x,
            u_index: Arc::clone(&self.u_index),
            u: self.u.clone(),
        }
    }

    /// Values of `symbols` looked up in X, with NaN marking absent symbols.
    pub fn consistency_x(&self, symbols: &[Symbol]) -> Vec<Real> {
        symbols
            .iter()
            .map(|s| self.try_x(s).unwrap_or(Real::NAN))
            .collect()
    }

    /// Values of `symbols` looked up in U, with NaN marking absent symbols.
    pub fn consistency_u(&self, symbols: &[Symbol]) -> Vec<Real> {
        symbols
            .iter()
            .map(|s| self.try_u(s).unwrap_or(Real::NAN))
            .collect()
    }
}

fn append(v: DVector<Real>, value: Real) -> DVector<Real> {
    let n = v.len();
    let mut grown = v.resize_vertically(n + 1, 0.0);
    grown[n] = value;
    grown
}
