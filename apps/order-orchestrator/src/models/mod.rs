//! Core data model: instruments and execution results.

mod instrument;
mod report;

pub use instrument::{
    Instrument, expiry_code, future_key, is_derivative_key, normalize_key, option_key,
};
pub use report::{AccountOutcome, AccountReport, BasketResult, OrderResult, RunResults};
