//! odesim-core: state representation for odesim.
//!
//! Contains:
//! - symbol (names and the contiguous symbol index)
//! - state (X/U vectors plus the domain coordinate)
//! - arithmetic (X-vector primitives solvers compose against)
//! - expr (evaluable expressions, ordered derivative lists, `state_diff`)
//! - numeric (Real and finiteness checks)
//! - error (shared error types)

pub mod arithmetic;
pub mod error;
pub mod expr;
pub mod numeric;
pub mod state;
pub mod symbol;

// Re-exports for downstream crates
pub use error::{CoreError, CoreResult};
pub use expr::{Diffs, Expr, Func, FuncMap, func, state_diff};
pub use numeric::*;
pub use state::State;
pub use symbol::{Space, Symbol, SymbolIndex};
