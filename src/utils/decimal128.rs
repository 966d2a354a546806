//! Exact conversion between [`rust_decimal::Decimal`] and BSON Decimal128.
//!
//! Both directions go through decimal text: `Decimal` renders in plain notation, which bson
//! parses into the canonical Decimal128, and bson renders Decimal128 in plain or `d.dddE±n`
//! notation. Parsing is exact; a value `Decimal` cannot hold without rounding is rejected.

use bson::Decimal128;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum DecimalError {
    #[error("decimal128 value is NaN or infinite")]
    NotFinite,
    #[error("decimal128 value {0} does not fit a 96-bit decimal")]
    OutOfRange(String),
    #[error("decimal {0} has no decimal128 encoding")]
    Unencodable(String),
}

/// Encode `value` without going through a float
pub fn to_decimal128(value: Decimal) -> Result<Decimal128, DecimalError> {
    let text = value.to_string();
    text.parse::<Decimal128>()
        .map_err(|_| DecimalError::Unencodable(text))
}

pub fn from_decimal128(value: Decimal128) -> Result<Decimal, DecimalError> {
    let text = value.to_string();
    if matches!(text.trim_start_matches('-'), "NaN" | "Infinity") {
        return Err(DecimalError::NotFinite);
    }

    // Trailing fraction zeros only widen the scale; drop them when the value does not fit as is.
    parse_exact(&text)
        .or_else(|| parse_exact(&strip_fraction_zeros(&text)))
        .ok_or(DecimalError::OutOfRange(text))
}

fn parse_exact(text: &str) -> Option<Decimal> {
    let base = match text.split_once(['e', 'E']) {
        Some((base, _)) => base,
        None => text,
    };
    let exact = Decimal::from_str_exact(base).ok()?;

    if base.len() == text.len() {
        Some(exact)
    } else if exact.is_zero() {
        Some(Decimal::ZERO)
    } else {
        Decimal::from_scientific(text).ok()
    }
}

fn strip_fraction_zeros(text: &str) -> String {
    let (base, exponent) = match text.find(['e', 'E']) {
        Some(at) => text.split_at(at),
        None => (text, ""),
    };
    if !base.contains('.') {
        return text.to_string();
    }
    format!("{}{}", base.trim_end_matches('0').trim_end_matches('.'), exponent)
}

/// `#[serde(with = "...")]` adapter storing a `Decimal` field as Decimal128
pub mod as_decimal128 {
    use super::*;

    pub fn serialize<S: Serializer>(value: &Decimal, serializer: S) -> Result<S::Ok, S::Error> {
        to_decimal128(*value)
            .map_err(serde::ser::Error::custom)?
            .serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Decimal, D::Error> {
        let raw = Decimal128::deserialize(deserializer)?;
        from_decimal128(raw).map_err(serde::de::Error::custom)
    }
}
