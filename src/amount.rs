//! Decoding raw integer amounts from loosely typed JSON
//!
//! Indexers disagree on how to send big integers: JSON numbers, decimal
//! strings, `0x` hex strings. Wei balances also overflow `u64`, so raw
//! balances are `u128` everywhere and persisted as decimal strings.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serializer};
use serde_json::Value;

/// A raw balance accepted in any of the shapes upstream APIs use
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct RawAmount(pub u128);

impl<'de> Deserialize<'de> for RawAmount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        parse_raw_amount(&value)
            .map(RawAmount)
            .ok_or_else(|| de::Error::custom(format!("not a raw amount: {value}")))
    }
}

/// Number, decimal string or `0x` hex string to `u128`.
///
/// Numbers are read from their literal text, so integers beyond `u64` keep
/// every digit. Fractions, signs and exponents are rejected.
pub(crate) fn parse_raw_amount(value: &Value) -> Option<u128> {
    match value {
        Value::Number(n) => parse_decimal(&n.to_string()),
        Value::String(s) => {
            let s = s.trim();
            match s.strip_prefix("0x") {
                Some(hex) => parse_hex_quantity(hex),
                None => parse_decimal(s),
            }
        }
        _ => None,
    }
}

fn parse_decimal(digits: &str) -> Option<u128> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Hex digits (no prefix) to `u128`. Leading zeros are fine, empty is not.
pub(crate) fn parse_hex_quantity(hex: &str) -> Option<u128> {
    if hex.is_empty() || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let digits = hex.trim_start_matches('0');
    if digits.is_empty() {
        return Some(0);
    }
    u128::from_str_radix(digits, 16).ok()
}

/// Serde adapter persisting a `u128` as a decimal string, reading either form
pub mod raw_balance {
    use super::*;

    pub fn serialize<S: Serializer>(value: &u128, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
        RawAmount::deserialize(deserializer).map(|raw| raw.0)
    }
}
