//! Helpers shared by the collection modules.

pub mod decimal128;

pub use decimal128::{from_decimal128, to_decimal128, DecimalError};
