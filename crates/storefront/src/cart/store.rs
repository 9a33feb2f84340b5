//! Cart store: in-memory cart state mediated against the backend.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use pawmart_core::{CartItemId, CartLineItem, Pet, PetId, Price};
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};

use super::{CartError, Direction, Outcome, PetImageCache};
use crate::api::{ApiError, CartApi, CheckoutReceipt};

/// Rendering view of a cart at one point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CartSnapshot {
    /// Line items in backend order.
    pub items: Vec<CartLineItem>,
    /// Last total reported by the backend.
    pub total: Price,
    /// Whether a backend round trip was in flight when the snapshot was taken.
    pub loading: bool,
}

impl CartSnapshot {
    /// Sum of line item quantities.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        item_count(&self.items)
    }

    /// Whether the cart has no line items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[derive(Debug, Default)]
struct CartState {
    items: Vec<CartLineItem>,
    total: Price,
    images: PetImageCache,
}

impl CartState {
    fn find(&self, pet_id: PetId) -> Option<(CartItemId, u32)> {
        self.items
            .iter()
            .find(|item| item.pet.id == pet_id)
            .map(|item| (item.id, item.quantity))
    }

    fn reset(&mut self) {
        self.items.clear();
        self.total = Price::ZERO;
        self.images.clear();
    }
}

/// One shopper's cart.
///
/// Every operation returns a `Result`; failures are also logged. Mutating
/// operations hold the store's operation lock for the whole
/// mutate-then-refresh sequence, so overlapping calls run one after another
/// and each refresh observes every mutation issued before it.
pub struct CartStore<A> {
    api: A,
    /// Held for the duration of a backend sequence.
    ops: Mutex<()>,
    /// Never held across an `.await`.
    state: RwLock<CartState>,
    /// Number of backend round trips in flight.
    in_flight: AtomicUsize,
}

/// Marks the store as loading until dropped.
struct LoadingGuard<'a>(&'a AtomicUsize);

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl<A: CartApi> CartStore<A> {
    /// Create an empty store. Call [`Self::refresh_cart`] to load the
    /// backend's current cart.
    #[must_use]
    pub fn new(api: A) -> Self {
        Self {
            api,
            ops: Mutex::new(()),
            state: RwLock::new(CartState::default()),
            in_flight: AtomicUsize::new(0),
        }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Current cart contents.
    #[must_use]
    pub fn snapshot(&self) -> CartSnapshot {
        let state = self.read_state();
        CartSnapshot {
            items: state.items.clone(),
            total: state.total,
            loading: self.is_loading(),
        }
    }

    /// Sum of quantities across line items.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        item_count(&self.read_state().items)
    }

    /// Last total reported by the backend. Never recomputed from line items.
    #[must_use]
    pub fn cart_total(&self) -> Price {
        self.read_state().total
    }

    /// Whether a backend round trip is in flight.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst) > 0
    }

    /// Number of pets in the image cache.
    #[must_use]
    pub fn cached_pet_count(&self) -> usize {
        self.read_state().images.len()
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Re-fetch line items and total from the backend.
    ///
    /// Cached image fields are overlaid on the fetched items. On error the
    /// previous state is kept.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Api` if either request fails.
    #[instrument(skip(self))]
    pub async fn refresh_cart(&self) -> Result<(), CartError> {
        let _op = self.ops.lock().await;
        self.refresh_locked().await.map_err(|e| {
            warn!(error = %e, "Failed to refresh cart");
            CartError::Api(e)
        })
    }

    /// Add `quantity` units of a pet (0 counts as 1), then refresh.
    ///
    /// The pet snapshot is cached before the backend call so its image can be
    /// restored on line items the backend returns without one.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Api` if the add fails, or
    /// `CartError::RefreshFailed` if the add succeeded but the refresh did not.
    #[instrument(skip(self, pet), fields(pet_id = %pet.id))]
    pub async fn add_to_cart(&self, pet: Pet, quantity: u32) -> Result<Outcome, CartError> {
        let quantity = quantity.max(1);
        let pet_id = pet.id;

        let _op = self.ops.lock().await;
        let _loading = self.begin_loading();

        self.write_state().images.remember(pet);

        self.api
            .add_item(pet_id, quantity)
            .await
            .map_err(|e| mutation_failed("add to cart", e))?;

        self.refresh_after_mutation().await?;
        Ok(Outcome::Applied { message: None })
    }

    /// Remove a pet's line item, then refresh.
    ///
    /// A pet that is not in the cart is skipped without calling the backend.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Api` if the delete fails, or
    /// `CartError::RefreshFailed` if it succeeded but the refresh did not.
    #[instrument(skip(self), fields(pet_id = %pet_id))]
    pub async fn remove_from_cart(&self, pet_id: PetId) -> Result<Outcome, CartError> {
        let _op = self.ops.lock().await;

        let Some((item_id, _)) = self.read_state().find(pet_id) else {
            debug!("Pet not in cart, nothing to remove");
            return Ok(Outcome::Skipped);
        };

        let _loading = self.begin_loading();

        let message = self
            .api
            .remove_item(item_id)
            .await
            .map_err(|e| mutation_failed("remove from cart", e))?;

        self.write_state().images.evict(pet_id);

        self.refresh_after_mutation().await?;
        Ok(Outcome::Applied { message })
    }

    /// Step a pet's quantity up or down by one, then refresh.
    ///
    /// Decrementing a quantity of 1 is skipped, as is a pet that is not in
    /// the cart; neither calls the backend. The backend receives the absolute
    /// new quantity.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Api` if the update fails, or
    /// `CartError::RefreshFailed` if it succeeded but the refresh did not.
    #[instrument(skip(self), fields(pet_id = %pet_id))]
    pub async fn update_quantity(
        &self,
        pet_id: PetId,
        direction: Direction,
    ) -> Result<Outcome, CartError> {
        let _op = self.ops.lock().await;

        let Some((item_id, current)) = self.read_state().find(pet_id) else {
            debug!("Pet not in cart, nothing to update");
            return Ok(Outcome::Skipped);
        };

        let quantity = direction.apply(current);
        if quantity == current {
            debug!(quantity, "Quantity already at its floor");
            return Ok(Outcome::Skipped);
        }

        let _loading = self.begin_loading();

        self.api
            .update_quantity(item_id, quantity)
            .await
            .map_err(|e| mutation_failed("update quantity", e))?;

        self.refresh_after_mutation().await?;
        Ok(Outcome::Applied { message: None })
    }

    /// Empty the cart on the backend, then locally.
    ///
    /// Local items, total and image cache are all reset.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Api` if the backend clear fails; local state is
    /// then left as it was.
    #[instrument(skip(self))]
    pub async fn clear_cart(&self) -> Result<Outcome, CartError> {
        let _op = self.ops.lock().await;
        let _loading = self.begin_loading();

        let message = self
            .api
            .clear()
            .await
            .map_err(|e| mutation_failed("clear cart", e))?;

        self.write_state().reset();
        Ok(Outcome::Applied { message })
    }

    /// Finalize the order. On success the local cart is reset exactly like
    /// [`Self::clear_cart`].
    ///
    /// # Errors
    ///
    /// Returns `CartError::Api` if the backend checkout fails; local state is
    /// then left as it was.
    #[instrument(skip(self))]
    pub async fn checkout(&self) -> Result<CheckoutReceipt, CartError> {
        let _op = self.ops.lock().await;
        let _loading = self.begin_loading();

        let receipt = self
            .api
            .checkout()
            .await
            .map_err(|e| mutation_failed("checkout", e))?;

        self.write_state().reset();
        Ok(receipt)
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Fetch items then total and apply both, or neither.
    ///
    /// Callers must hold the operation lock.
    async fn refresh_locked(&self) -> Result<(), ApiError> {
        let _loading = self.begin_loading();

        let mut items = self.api.list_items().await?;
        let total = self.api.total().await?;

        let mut state = self.write_state();
        let mut patched = 0_usize;
        for item in &mut items {
            if state.images.overlay(item) {
                patched += 1;
            }
        }
        debug!(items = items.len(), patched, "Cart refreshed");

        state.items = items;
        state.total = total;
        Ok(())
    }

    async fn refresh_after_mutation(&self) -> Result<(), CartError> {
        self.refresh_locked().await.map_err(|e| {
            warn!(error = %e, "Cart changed but refresh failed");
            CartError::RefreshFailed(e)
        })
    }

    fn begin_loading(&self) -> LoadingGuard<'_> {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        LoadingGuard(&self.in_flight)
    }

    fn read_state(&self) -> RwLockReadGuard<'_, CartState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, CartState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn item_count(items: &[CartLineItem]) -> u32 {
    items
        .iter()
        .fold(0_u32, |count, item| count.saturating_add(item.quantity))
}

fn mutation_failed(operation: &str, error: ApiError) -> CartError {
    tracing::error!(error = %error, operation, "Cart operation failed");
    CartError::Api(error)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex as StdMutex;

    use super::*;

    /// Backend fake holding a cart in memory and counting calls.
    #[derive(Default)]
    struct FakeApi {
        items: StdMutex<Vec<CartLineItem>>,
        calls: StdMutex<Vec<&'static str>>,
        fail_total: std::sync::atomic::AtomicBool,
    }

    impl FakeApi {
        fn with_items(json: &str) -> Self {
            let api = Self::default();
            *api.items.lock().unwrap() = serde_json::from_str(json).unwrap();
            api
        }

        fn record(&self, call: &'static str) {
            self.calls.lock().unwrap().push(call);
        }

        fn calls(&self) -> Vec<&'static str> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl CartApi for FakeApi {
        async fn list_items(&self) -> Result<Vec<CartLineItem>, ApiError> {
            self.record("list");
            Ok(self.items.lock().unwrap().clone())
        }

        async fn add_item(&self, _pet_id: PetId, _quantity: u32) -> Result<(), ApiError> {
            self.record("add");
            Ok(())
        }

        async fn update_quantity(
            &self,
            item_id: CartItemId,
            quantity: u32,
        ) -> Result<(), ApiError> {
            self.record("update");
            for item in self.items.lock().unwrap().iter_mut() {
                if item.id == item_id {
                    item.quantity = quantity;
                }
            }
            Ok(())
        }

        async fn remove_item(&self, item_id: CartItemId) -> Result<Option<String>, ApiError> {
            self.record("remove");
            self.items.lock().unwrap().retain(|item| item.id != item_id);
            Ok(Some("Removed".to_string()))
        }

        async fn clear(&self) -> Result<Option<String>, ApiError> {
            self.record("clear");
            self.items.lock().unwrap().clear();
            Ok(None)
        }

        async fn checkout(&self) -> Result<CheckoutReceipt, ApiError> {
            self.record("checkout");
            Err(ApiError::Status {
                status: 402,
                message: "Payment required".to_string(),
            })
        }

        async fn total(&self) -> Result<Price, ApiError> {
            self.record("total");
            if self.fail_total.load(Ordering::SeqCst) {
                return Err(ApiError::RateLimited(1));
            }
            Ok(self
                .items
                .lock()
                .unwrap()
                .iter()
                .map(CartLineItem::line_total)
                .fold(Price::ZERO, |a, b| Price::new(a.amount() + b.amount())))
        }
    }

    const TWO_ITEMS: &str = r#"[
        {"id": 10, "pet": {"id": 1, "name": "Rex", "price": 100}, "quantity": 1},
        {"id": 11, "pet": {"id": "2", "name": "Tom", "price": 50}, "quantity": 3}
    ]"#;

    #[tokio::test]
    async fn test_refresh_loads_items_and_total() {
        let store = CartStore::new(FakeApi::with_items(TWO_ITEMS));
        store.refresh_cart().await.unwrap();

        assert_eq!(store.item_count(), 4);
        assert_eq!(store.cart_total().to_string(), "$250.00");
        assert!(!store.is_loading());
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_previous_state() {
        let store = CartStore::new(FakeApi::with_items(TWO_ITEMS));
        store.refresh_cart().await.unwrap();
        let before = store.snapshot();

        store.api.items.lock().unwrap().clear();
        store.api.fail_total.store(true, Ordering::SeqCst);

        assert!(matches!(
            store.refresh_cart().await,
            Err(CartError::Api(ApiError::RateLimited(1)))
        ));
        assert_eq!(store.snapshot(), before);
    }

    #[tokio::test]
    async fn test_decrement_at_one_is_skipped() {
        let store = CartStore::new(FakeApi::with_items(TWO_ITEMS));
        store.refresh_cart().await.unwrap();
        let calls_before = store.api.calls().len();

        let outcome = store
            .update_quantity(PetId::new(1), Direction::Decrement)
            .await
            .unwrap();

        assert_eq!(outcome, Outcome::Skipped);
        assert_eq!(store.api.calls().len(), calls_before);
    }

    #[tokio::test]
    async fn test_increment_sends_absolute_quantity() {
        let store = CartStore::new(FakeApi::with_items(TWO_ITEMS));
        store.refresh_cart().await.unwrap();

        store
            .update_quantity(PetId::new(2), Direction::Increment)
            .await
            .unwrap();

        assert_eq!(store.item_count(), 5);
        assert_eq!(
            store.api.calls()[2..],
            ["update", "list", "total"]
        );
    }

    #[tokio::test]
    async fn test_remove_unknown_pet_is_skipped() {
        let store = CartStore::new(FakeApi::with_items(TWO_ITEMS));
        store.refresh_cart().await.unwrap();
        let before = store.snapshot();

        let outcome = store.remove_from_cart(PetId::new(99)).await.unwrap();

        assert_eq!(outcome, Outcome::Skipped);
        assert!(!store.api.calls().contains(&"remove"));
        assert_eq!(store.snapshot(), before);
    }

    #[tokio::test]
    async fn test_remove_returns_backend_message() {
        let store = CartStore::new(FakeApi::with_items(TWO_ITEMS));
        store.refresh_cart().await.unwrap();

        let outcome = store.remove_from_cart(PetId::new(2)).await.unwrap();

        assert_eq!(outcome.message(), Some("Removed"));
        assert_eq!(store.item_count(), 1);
    }

    #[tokio::test]
    async fn test_failed_checkout_keeps_cart() {
        let store = CartStore::new(FakeApi::with_items(TWO_ITEMS));
        store.refresh_cart().await.unwrap();

        let result = store.checkout().await;

        assert!(matches!(result, Err(CartError::Api(ApiError::Status { status: 402, .. }))));
        assert_eq!(store.item_count(), 4);
        assert!(!store.is_loading());
    }

    #[tokio::test]
    async fn test_refresh_failure_after_mutation_is_reported() {
        let store = CartStore::new(FakeApi::with_items(TWO_ITEMS));
        store.refresh_cart().await.unwrap();
        store.api.fail_total.store(true, Ordering::SeqCst);

        let result = store
            .update_quantity(PetId::new(1), Direction::Increment)
            .await;

        assert!(matches!(result, Err(CartError::RefreshFailed(_))));
        // Stale until the next successful refresh.
        assert_eq!(store.item_count(), 4);
    }

    #[tokio::test]
    async fn test_refresh_restores_image_of_added_pet() {
        let store = CartStore::new(FakeApi::with_items(TWO_ITEMS));
        let rex: Pet =
            serde_json::from_str(r#"{"id": 1, "name": "Rex", "price": 100, "image": "rex.png"}"#)
                .unwrap();

        store.add_to_cart(rex, 1).await.unwrap();

        let snapshot = store.snapshot();
        let images: Vec<_> = snapshot
            .items
            .iter()
            .map(|item| item.pet.image.as_deref())
            .collect();
        assert_eq!(images, [Some("rex.png"), None]);
    }
}
