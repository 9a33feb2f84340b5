//! Type-safe price representation using decimal arithmetic.
//!
//! Prices come from the backend as either JSON numbers or decimal strings.
//! Both are parsed into a `Decimal` so totals never pick up floating-point
//! drift on this side of the wire.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

/// A price in the store currency (USD).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
#[serde(transparent)]
pub struct Price(Decimal);

impl Price {
    /// A zero price.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create a new price.
    #[must_use]
    pub const fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// The decimal amount in dollars.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Price of `quantity` units.
    #[must_use]
    pub fn times(self, quantity: u32) -> Self {
        Self(self.0 * Decimal::from(quantity))
    }

    /// Whether the amount is zero.
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${:.2}", self.0)
    }
}

impl From<Decimal> for Price {
    fn from(amount: Decimal) -> Self {
        Self(amount)
    }
}

impl FromStr for Price {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Decimal::from_str(s.trim()).map(Self)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawPrice {
    Int(i64),
    Float(f64),
    Text(String),
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        match RawPrice::deserialize(deserializer)? {
            RawPrice::Int(value) => Ok(Self(Decimal::from(value))),
            // Round-trip through the shortest decimal representation so 12.1
            // becomes 12.1 and not 12.0999999999999996447286321199499070644378662109375
            RawPrice::Float(value) => value
                .to_string()
                .parse::<Self>()
                .map_err(serde::de::Error::custom),
            RawPrice::Text(text) if text.trim().is_empty() => Ok(Self::ZERO),
            RawPrice::Text(text) => text.parse::<Self>().map_err(serde::de::Error::custom),
        }
    }
}
