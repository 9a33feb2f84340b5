//! Cache types for pet backend responses.

use std::sync::Arc;

use pawmart_core::{Pet, PetId};

/// Cache key for pet lookups.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub enum CacheKey {
    Pets,
    Pet(PetId),
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Pets(Arc<Vec<Pet>>),
    Pet(Box<Pet>),
}
