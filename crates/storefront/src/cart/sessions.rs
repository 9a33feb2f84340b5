//! Per-session cart stores.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use uuid::Uuid;

use super::CartStore;
use crate::api::CartBackend;

/// Maps a browser session's cart key to its [`CartStore`].
///
/// The cart key doubles as the shopper's backend cart id, so each store
/// talks to its own backend cart. Stores idle for longer than the configured
/// timeout are dropped along with their image caches. Concurrent first
/// requests for the same key share one store.
pub struct CartSessions<B: CartBackend> {
    backend: B,
    stores: Cache<Uuid, Arc<CartStore<B::Cart>>>,
}

impl<B: CartBackend> CartSessions<B> {
    #[must_use]
    pub fn new(backend: B, idle_timeout: Duration) -> Self {
        let stores = Cache::builder()
            .max_capacity(10_000)
            .time_to_idle(idle_timeout)
            .build();

        Self { backend, stores }
    }

    /// Store for `key`, creating an empty one on first use.
    ///
    /// Returns the store and whether it was just created; a new store has
    /// not loaded the backend cart yet.
    pub async fn get_or_create(&self, key: Uuid) -> (Arc<CartStore<B::Cart>>, bool) {
        let entry = self
            .stores
            .entry(key)
            .or_insert_with(async { Arc::new(CartStore::new(self.backend.cart(key))) })
            .await;

        let fresh = entry.is_fresh();
        (entry.into_value(), fresh)
    }

    /// Drop the store for `key`.
    pub async fn remove(&self, key: Uuid) {
        self.stores.invalidate(&key).await;
    }
}
