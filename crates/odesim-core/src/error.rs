use thiserror::Error;

use crate::symbol::{Space, Symbol};

pub type CoreResult<T> = Result<T, CoreError>;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Non-finite numeric value for {what}: {value}")]
    NonFinite { what: &'static str, value: f64 },

    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("Symbol {symbol} does not exist in {space} variables")]
    UnknownSymbol { symbol: Symbol, space: Space },

    #[error("Length of function list not equal to state vector ({funcs} functions, {vars} variables)")]
    ArityMismatch { funcs: usize, vars: usize },
}
