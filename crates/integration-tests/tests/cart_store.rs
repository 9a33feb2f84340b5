//! Integration tests for the cart store.
//!
//! Each test drives a `CartStore` against `FakeBackend`, which drops image
//! fields from cart responses the way the real backend does.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::time::Duration;

use pawmart_core::{PetId, Price};
use pawmart_integration_tests::{Call, FakeBackend, pet};
use pawmart_storefront::cart::{CartError, CartStore, Direction, Outcome};
use rust_decimal::Decimal;

fn store() -> (CartStore<FakeBackend>, FakeBackend) {
    let backend = FakeBackend::new();
    (CartStore::new(backend.clone()), backend)
}

fn dollars(amount: i64) -> Price {
    Price::new(Decimal::from(amount))
}

// =============================================================================
// Adding
// =============================================================================

#[tokio::test]
async fn test_added_pet_keeps_its_image_after_refresh() {
    let (store, backend) = store();

    let outcome = store.add_to_cart(pet(1, "Rex", Some("rex")), 2).await.unwrap();
    assert_eq!(outcome, Outcome::Applied { message: None });

    // The backend's copy has no image...
    assert_eq!(backend.items()[0].pet.image, None);

    // ...but the store shows the one it was given.
    let snapshot = store.snapshot();
    assert_eq!(snapshot.items.len(), 1);
    assert_eq!(snapshot.items[0].quantity, 2);
    assert_eq!(snapshot.items[0].pet.image.as_deref(), Some("rex"));
    assert_eq!(store.cart_total(), dollars(20));
}

#[tokio::test]
async fn test_add_zero_quantity_adds_one() {
    let (store, _) = store();

    store.add_to_cart(pet(3, "Tom", None), 0).await.unwrap();

    assert_eq!(store.item_count(), 1);
}

#[tokio::test]
async fn test_add_sequence_refreshes_after_mutation() {
    let (store, backend) = store();

    store.add_to_cart(pet(1, "Rex", None), 1).await.unwrap();

    assert_eq!(backend.calls(), vec![Call::Add, Call::List, Call::Total]);
}

#[tokio::test]
async fn test_failed_add_leaves_state_unchanged() {
    let (store, backend) = store();
    store.add_to_cart(pet(1, "Rex", None), 1).await.unwrap();
    let before = store.snapshot();

    backend.fail(Call::Add);
    let result = store.add_to_cart(pet(2, "Tom", None), 1).await;

    assert!(matches!(result, Err(CartError::Api(_))));
    assert_eq!(store.snapshot(), before);
    assert!(!store.is_loading());
}

#[tokio::test]
async fn test_add_with_failed_refresh_reports_refresh_failure() {
    let (store, backend) = store();
    backend.fail(Call::Total);

    let result = store.add_to_cart(pet(1, "Rex", None), 1).await;

    assert!(matches!(result, Err(CartError::RefreshFailed(_))));
    // The add landed on the backend even though the store is stale.
    assert_eq!(backend.items().len(), 1);
    assert_eq!(store.item_count(), 0);

    backend.recover(Call::Total);
    store.refresh_cart().await.unwrap();
    assert_eq!(store.item_count(), 1);
}

// =============================================================================
// Quantity
// =============================================================================

#[tokio::test]
async fn test_decrement_at_one_makes_no_backend_call() {
    let (store, backend) = store();
    store.add_to_cart(pet(1, "Rex", None), 1).await.unwrap();
    let calls = backend.calls().len();

    for _ in 0..3 {
        let outcome = store
            .update_quantity(PetId::new(1), Direction::Decrement)
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::Skipped);
    }

    assert_eq!(backend.calls().len(), calls);
    assert_eq!(store.snapshot().items[0].quantity, 1);
}

#[tokio::test]
async fn test_decrement_never_goes_below_one() {
    let (store, backend) = store();
    store.add_to_cart(pet(1, "Rex", None), 3).await.unwrap();

    for _ in 0..5 {
        store
            .update_quantity(PetId::new(1), Direction::Decrement)
            .await
            .unwrap();
    }

    assert_eq!(store.snapshot().items[0].quantity, 1);
    assert_eq!(backend.count(Call::Update), 2);
}

#[tokio::test]
async fn test_quantity_of_unknown_pet_is_skipped() {
    let (store, backend) = store();

    let outcome = store
        .update_quantity(PetId::new(42), Direction::Increment)
        .await
        .unwrap();

    assert_eq!(outcome, Outcome::Skipped);
    assert!(backend.calls().is_empty());
}

// =============================================================================
// Removing
// =============================================================================

#[tokio::test]
async fn test_remove_absent_pet_is_a_no_op() {
    let (store, backend) = store();
    store.add_to_cart(pet(1, "Rex", None), 1).await.unwrap();
    let before = store.snapshot();
    let calls = backend.calls();

    let outcome = store.remove_from_cart(PetId::new(99)).await.unwrap();

    assert_eq!(outcome, Outcome::Skipped);
    assert_eq!(backend.calls(), calls);
    assert_eq!(store.snapshot(), before);
}

#[tokio::test]
async fn test_remove_evicts_cached_image() {
    let (store, _) = store();
    store.add_to_cart(pet(1, "Rex", Some("rex")), 1).await.unwrap();
    store.add_to_cart(pet(2, "Tom", Some("tom")), 1).await.unwrap();
    assert_eq!(store.cached_pet_count(), 2);

    let outcome = store.remove_from_cart(PetId::new(1)).await.unwrap();

    assert_eq!(outcome.message(), Some("Item removed from cart"));
    assert_eq!(store.cached_pet_count(), 1);
    assert_eq!(store.item_count(), 1);
}

// =============================================================================
// Clear and checkout
// =============================================================================

#[tokio::test]
async fn test_clear_resets_everything() {
    let (store, _) = store();
    store.add_to_cart(pet(1, "Rex", Some("rex")), 2).await.unwrap();

    store.clear_cart().await.unwrap();

    let snapshot = store.snapshot();
    assert!(snapshot.items.is_empty());
    assert_eq!(snapshot.total, Price::ZERO);
    assert_eq!(store.cached_pet_count(), 0);
}

#[tokio::test]
async fn test_clear_does_not_resurrect_stale_images() {
    let (store, _) = store();
    store.add_to_cart(pet(1, "Rex", Some("rex")), 1).await.unwrap();
    store.clear_cart().await.unwrap();

    // Same pet, now without an image.
    store.add_to_cart(pet(1, "Rex", None), 1).await.unwrap();

    assert_eq!(store.snapshot().items[0].pet.image, None);
}

#[tokio::test]
async fn test_checkout_resets_like_clear() {
    let (store, backend) = store();
    store.add_to_cart(pet(1, "Rex", Some("rex")), 1).await.unwrap();
    store.add_to_cart(pet(2, "Tom", None), 2).await.unwrap();

    let receipt = store.checkout().await.unwrap();

    assert_eq!(receipt.message, "Order placed");
    assert_eq!(receipt.total, dollars(50));
    assert_eq!(store.item_count(), 0);
    assert_eq!(store.cart_total(), Price::ZERO);
    assert_eq!(store.cached_pet_count(), 0);

    store.add_to_cart(pet(1, "Rex", None), 1).await.unwrap();
    assert_eq!(store.snapshot().items[0].pet.image, None);
    assert_eq!(backend.count(Call::Checkout), 1);
}

#[tokio::test]
async fn test_failed_checkout_keeps_cart() {
    let (store, backend) = store();
    store.add_to_cart(pet(1, "Rex", Some("rex")), 1).await.unwrap();
    let before = store.snapshot();
    backend.fail(Call::Checkout);

    assert!(matches!(store.checkout().await, Err(CartError::Api(_))));
    assert_eq!(store.snapshot(), before);
    assert_eq!(store.cached_pet_count(), 1);
}

// =============================================================================
// Invariants
// =============================================================================

#[tokio::test]
async fn test_item_count_matches_last_refresh() {
    let (store, _) = store();

    store.add_to_cart(pet(1, "Rex", None), 2).await.unwrap();
    store.add_to_cart(pet(2, "Tom", None), 1).await.unwrap();
    store.add_to_cart(pet(1, "Rex", None), 1).await.unwrap();
    store
        .update_quantity(PetId::new(2), Direction::Increment)
        .await
        .unwrap();
    store
        .update_quantity(PetId::new(1), Direction::Decrement)
        .await
        .unwrap();
    store.remove_from_cart(PetId::new(7)).await.unwrap();

    let snapshot = store.snapshot();
    let sum: u32 = snapshot.items.iter().map(|i| i.quantity).sum();
    assert_eq!(store.item_count(), sum);
    assert_eq!(sum, 4);
}

#[tokio::test]
async fn test_total_comes_from_backend() {
    let (store, backend) = store();
    store.add_to_cart(pet(1, "Rex", None), 1).await.unwrap();
    backend.fail(Call::Total);

    // Items would change, but the refresh fails as a whole.
    assert!(
        store
            .update_quantity(PetId::new(1), Direction::Increment)
            .await
            .is_err()
    );
    assert_eq!(store.cart_total(), dollars(10));
    assert_eq!(store.item_count(), 1);
}

// =============================================================================
// Concurrency
// =============================================================================

#[tokio::test]
async fn test_overlapping_adds_keep_both_pets() {
    let backend = FakeBackend::new().with_latency(Duration::from_millis(20));
    let store = CartStore::new(backend.clone());

    let (first, second) = tokio::join!(
        store.add_to_cart(pet(1, "Rex", Some("rex")), 2),
        store.add_to_cart(pet(2, "Tom", Some("tom")), 1),
    );
    first.unwrap();
    second.unwrap();

    let snapshot = store.snapshot();
    assert_eq!(snapshot.items.len(), 2);
    let rex = snapshot.items.iter().find(|i| i.pet.id == PetId::new(1)).unwrap();
    let tom = snapshot.items.iter().find(|i| i.pet.id == PetId::new(2)).unwrap();
    assert_eq!(rex.quantity, 2);
    assert_eq!(tom.quantity, 1);
    assert_eq!(rex.pet.image.as_deref(), Some("rex"));
    assert_eq!(tom.pet.image.as_deref(), Some("tom"));

    // Mutate-then-refresh sequences never interleaved.
    assert_eq!(backend.max_in_flight(), 1);
    assert_eq!(
        backend.calls(),
        vec![
            Call::Add,
            Call::List,
            Call::Total,
            Call::Add,
            Call::List,
            Call::Total
        ]
    );
}

#[tokio::test]
async fn test_loading_clears_after_operations() {
    let backend = FakeBackend::new().with_latency(Duration::from_millis(5));
    let store = CartStore::new(backend);

    store.add_to_cart(pet(1, "Rex", None), 1).await.unwrap();
    store.refresh_cart().await.unwrap();

    assert!(!store.is_loading());
    assert!(!store.snapshot().loading);
}
