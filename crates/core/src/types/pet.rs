//! Pet listing types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use super::id::PetId;
use super::lenient;
use super::price::Price;

/// Kind of animal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PetType {
    Dog,
    Cat,
}

/// Error returned when parsing an unknown pet type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown pet type: {0:?}")]
pub struct PetTypeError(pub String);

impl PetType {
    /// All pet types, in display order.
    pub const ALL: [Self; 2] = [Self::Dog, Self::Cat];

    /// Lowercase wire name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Dog => "dog",
            Self::Cat => "cat",
        }
    }
}

impl fmt::Display for PetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PetType {
    type Err = PetTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dog" => Ok(Self::Dog),
            "cat" => Ok(Self::Cat),
            _ => Err(PetTypeError(s.to_string())),
        }
    }
}

impl<'de> Deserialize<'de> for PetType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// A pet as listed by the backend.
///
/// The backend stores image data in one of two fields: `image` holds
/// whatever the listing was created with (a bare filename, a path or a full
/// URL) and `imageUrl` holds a resolved URL when the backend has one. Either
/// may be missing, especially on pets embedded in cart responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pet {
    pub id: PetId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub breed: String,
    #[serde(default)]
    pub pet_type: Option<PetType>,
    #[serde(default, deserialize_with = "lenient::optional_i32")]
    pub birth_year: Option<i32>,
    #[serde(default)]
    pub price: Price,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl Pet {
    /// Whether either image field holds a non-blank value.
    #[must_use]
    pub fn has_image(&self) -> bool {
        self.image_candidate().is_some()
    }

    /// The best image reference available: the resolved URL first, then the
    /// raw field. Blank values are skipped.
    #[must_use]
    pub fn image_candidate(&self) -> Option<&str> {
        [self.image_url.as_deref(), self.image.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|s| !s.is_empty())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    #[test]
    fn test_pet_from_loose_json() {
        let pet: Pet = serde_json::from_str(
            r#"{
                "id": "4",
                "name": "Rex",
                "breed": "Beagle",
                "petType": "DOG",
                "birthYear": "2021",
                "price": "350.00",
                "image": "rex"
            }"#,
        )
        .unwrap();

        assert_eq!(pet.id, PetId::new(4));
        assert_eq!(pet.pet_type, Some(PetType::Dog));
        assert_eq!(pet.birth_year, Some(2021));
        assert_eq!(pet.price, Price::new(Decimal::from(350)));
        assert_eq!(pet.image.as_deref(), Some("rex"));
        assert_eq!(pet.image_url, None);
    }

    #[test]
    fn test_pet_minimal_json() {
        let pet: Pet = serde_json::from_str(r#"{"id": 9}"#).unwrap();
        assert_eq!(pet.id, PetId::new(9));
        assert!(pet.name.is_empty());
        assert_eq!(pet.pet_type, None);
        assert!(pet.price.is_zero());
        assert!(!pet.has_image());
    }

    #[test]
    fn test_image_candidate_prefers_resolved_url() {
        let mut pet: Pet = serde_json::from_str(r#"{"id": 1}"#).unwrap();
        pet.image = Some("rex".to_string());
        pet.image_url = Some("   ".to_string());
        assert_eq!(pet.image_candidate(), Some("rex"));

        pet.image_url = Some("http://cdn/rex.png".to_string());
        assert_eq!(pet.image_candidate(), Some("http://cdn/rex.png"));
    }

    #[test]
    fn test_pet_type_parse() {
        assert_eq!("Cat".parse::<PetType>().unwrap(), PetType::Cat);
        assert!("parrot".parse::<PetType>().is_err());
        assert_eq!(PetType::Dog.to_string(), "dog");
    }
}
