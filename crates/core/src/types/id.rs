//! Newtype IDs for type-safe entity references.
//!
//! Use the `define_id!` macro to create type-safe ID wrappers that prevent
//! accidentally mixing IDs from different entity types.
//!
//! The backend is loose about identifier types: the same pet id may arrive as
//! `7` from one endpoint and `"7"` from another. Every generated ID accepts
//! both forms when deserializing, so the coercion happens exactly once, at the
//! API boundary, and never again at comparison sites.

use serde::{Deserialize, Deserializer};
use thiserror::Error;

/// Error returned when a textual identifier is not an integer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid identifier: {0:?}")]
pub struct IdParseError(pub String);

/// Macro to define a type-safe ID wrapper.
///
/// Creates a newtype wrapper around `i64` with:
/// - `Serialize` as a plain number
/// - `Deserialize` from a number or a numeric string
/// - `Debug`, `Clone`, `Copy`, `PartialEq`, `Eq`, `Ord`, `Hash`
/// - Conversion methods: `new()`, `as_i64()`
/// - `From<i64>`, `Into<i64>` and `FromStr` implementations
///
/// # Example
///
/// ```rust
/// # use pawmart_core::define_id;
/// define_id!(PetId);
/// define_id!(CartItemId);
///
/// let pet_id = PetId::new(1);
/// let item_id: CartItemId = "1".parse().unwrap();
///
/// // These are different types, so this won't compile:
/// // let _: PetId = item_id;
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, ::serde::Serialize,
        )]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Create a new ID from an i64 value.
            #[must_use]
            pub const fn new(id: i64) -> Self {
                Self(id)
            }

            /// Get the underlying i64 value.
            #[must_use]
            pub const fn as_i64(&self) -> i64 {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl ::core::str::FromStr for $name {
            type Err = $crate::types::id::IdParseError;

            fn from_str(s: &str) -> ::core::result::Result<Self, Self::Err> {
                $crate::types::id::parse_id(s).map(Self)
            }
        }

        impl<'de> ::serde::Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> ::core::result::Result<Self, D::Error>
            where
                D: ::serde::Deserializer<'de>,
            {
                $crate::types::id::deserialize_id(deserializer).map(Self)
            }
        }
    };
}

// Define standard entity IDs
define_id!(PetId);
define_id!(CartItemId);

/// Parse a textual identifier, ignoring surrounding whitespace.
///
/// # Errors
///
/// Returns `IdParseError` if the text is not a base-10 integer.
pub fn parse_id(text: &str) -> Result<i64, IdParseError> {
    text.trim()
        .parse::<i64>()
        .map_err(|_| IdParseError(text.to_string()))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Int(i64),
    Text(String),
}

/// Deserialize an identifier that may be encoded as a number or a string.
///
/// # Errors
///
/// Fails if the value is neither an integer nor a string holding one.
pub fn deserialize_id<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    match RawId::deserialize(deserializer)? {
        RawId::Int(id) => Ok(id),
        RawId::Text(text) => parse_id(&text).map_err(serde::de::Error::custom),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_id_from_number() {
        let id: PetId = serde_json::from_str("7").unwrap();
        assert_eq!(id, PetId::new(7));
    }

    #[test]
    fn test_id_from_string() {
        let id: PetId = serde_json::from_str("\"7\"").unwrap();
        assert_eq!(id, PetId::new(7));

        let padded: PetId = serde_json::from_str("\" 7 \"").unwrap();
        assert_eq!(padded, id);
    }

    #[test]
    fn test_id_rejects_non_numeric_string() {
        let result = serde_json::from_str::<PetId>("\"seven\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_id_serializes_as_number() {
        let json = serde_json::to_string(&CartItemId::new(42)).unwrap();
        assert_eq!(json, "42");
    }

    #[test]
    fn test_id_from_str() {
        assert_eq!("12".parse::<PetId>().unwrap(), PetId::new(12));
        assert_eq!(
            "x".parse::<PetId>().unwrap_err(),
            IdParseError("x".to_string())
        );
    }

    #[test]
    fn test_id_display() {
        assert_eq!(PetId::new(3).to_string(), "3");
    }
}
