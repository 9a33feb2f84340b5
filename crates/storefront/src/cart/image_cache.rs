//! Per-cart cache of pet snapshots used to repair image fields.

use std::collections::HashMap;

use pawmart_core::{CartLineItem, Pet, PetId};

/// Best-known pet snapshot per pet, owned by one cart store.
///
/// The backend treats image fields as optional on cart responses. When a
/// shopper adds a pet we keep the full snapshot they saw and copy its image
/// fields back onto the matching line item after every refresh. The backend
/// stays authoritative for everything else.
#[derive(Debug, Default, Clone)]
pub struct PetImageCache {
    pets: HashMap<PetId, Pet>,
}

impl PetImageCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember a pet snapshot, replacing any earlier one.
    pub fn remember(&mut self, pet: Pet) {
        self.pets.insert(pet.id, pet);
    }

    /// Copy cached image fields onto a fetched line item.
    ///
    /// Only snapshots that actually carry an image are applied. Returns
    /// whether the item was patched.
    pub fn overlay(&self, item: &mut CartLineItem) -> bool {
        match self.pets.get(&item.pet.id) {
            Some(cached) if cached.has_image() => {
                item.pet.image.clone_from(&cached.image);
                item.pet.image_url.clone_from(&cached.image_url);
                true
            }
            _ => false,
        }
    }

    /// Drop the snapshot for a pet.
    pub fn evict(&mut self, pet_id: PetId) -> Option<Pet> {
        self.pets.remove(&pet_id)
    }

    /// Drop every snapshot.
    pub fn clear(&mut self) {
        self.pets.clear();
    }

    /// Snapshot for a pet, if cached.
    #[must_use]
    pub fn get(&self, pet_id: PetId) -> Option<&Pet> {
        self.pets.get(&pet_id)
    }

    /// Number of cached pets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pets.len()
    }

    /// Whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pets.is_empty()
    }
}
