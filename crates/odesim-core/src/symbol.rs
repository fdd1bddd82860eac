//! Symbol names and contiguous symbol indexing.
//!
//! A [`SymbolIndex`] maps each symbol of one namespace (X or U) to a stable,
//! contiguous slot `0..N` in the corresponding state vector.

use core::fmt;
use std::borrow::Borrow;
use std::collections::HashMap;
use std::ops::Deref;

/// Name of a scalar state or input quantity.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Symbol(String);

impl Symbol {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({})", self.0)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Deref for Symbol {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for Symbol {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Symbol {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Symbol {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for Symbol {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&Symbol> for Symbol {
    fn from(s: &Symbol) -> Self {
        s.clone()
    }
}

/// Variable namespace a symbol lives in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Space {
    /// Integrated variables.
    X,
    /// Input (non-integrated) variables.
    U,
}

impl fmt::Display for Space {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Space::X => f.write_str("X"),
            Space::U => f.write_str("U"),
        }
    }
}

/// Ordered symbol list with O(1) reverse lookup.
///
/// Slots are handed out in insertion order and never change afterwards.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SymbolIndex {
    /// Contiguous list of symbols (slot -> Symbol).
    symbols: Vec<Symbol>,

    /// Reverse lookup: Symbol -> slot.
    slots: HashMap<Symbol, usize>,
}

impl SymbolIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Slot of `symbol`, if present.
    pub fn get(&self, symbol: &str) -> Option<usize> {
        self.slots.get(symbol).copied()
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.slots.contains_key(symbol)
    }

    /// Symbol stored in `slot`.
    pub fn symbol(&self, slot: usize) -> Option<&Symbol> {
        self.symbols.get(slot)
    }

    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    /// Returns the slot of `symbol`, appending it when absent.
    pub fn insert(&mut self, symbol: Symbol) -> usize {
        if let Some(&slot) = self.slots.get(symbol.as_str()) {
            return slot;
        }
        let slot = self.symbols.len();
        self.slots.insert(symbol.clone(), slot);
        self.symbols.push(symbol);
        slot
    }
}

impl FromIterator<Symbol> for SymbolIndex {
    fn from_iter<I: IntoIterator<Item = Symbol>>(iter: I) -> Self {
        let mut index = Self::new();
        for symbol in iter {
            index.insert(symbol);
        }
        index
    }
}
