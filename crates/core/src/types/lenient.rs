//! Deserializers for fields the backend encodes inconsistently.
//!
//! Use with `#[serde(default, deserialize_with = "...")]`.

use serde::{Deserialize, Deserializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum RawInt {
    Int(i64),
    Text(String),
}

/// Deserialize an optional `i32` from a number, a numeric string, `null`,
/// or an empty string.
///
/// # Errors
///
/// Fails on non-numeric text or values outside the `i32` range.
pub fn optional_i32<'de, D>(deserializer: D) -> Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<RawInt>::deserialize(deserializer)?;
    let value = match raw {
        None => return Ok(None),
        Some(RawInt::Int(value)) => value,
        Some(RawInt::Text(text)) => {
            let text = text.trim();
            if text.is_empty() {
                return Ok(None);
            }
            text.parse::<i64>()
                .map_err(|_| serde::de::Error::custom(format!("invalid integer: {text:?}")))?
        }
    };

    i32::try_from(value)
        .map(Some)
        .map_err(|_| serde::de::Error::custom(format!("integer out of range: {value}")))
}
