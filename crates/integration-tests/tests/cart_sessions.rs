//! Integration tests for per-session carts.
//!
//! Every session key gets its own backend cart, so shoppers never see or
//! change each other's items.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::time::Duration;

use pawmart_core::PetId;
use pawmart_integration_tests::{Call, FakeCarts, pet};
use pawmart_storefront::cart::CartSessions;
use uuid::Uuid;

fn sessions() -> (CartSessions<FakeCarts>, FakeCarts) {
    let carts = FakeCarts::new();
    (CartSessions::new(carts.clone(), Duration::from_secs(60)), carts)
}

#[tokio::test]
async fn test_shoppers_do_not_see_each_others_items() {
    let (sessions, carts) = sessions();
    let (alice_key, bob_key) = (Uuid::new_v4(), Uuid::new_v4());
    let (alice, _) = sessions.get_or_create(alice_key).await;
    let (bob, _) = sessions.get_or_create(bob_key).await;

    alice.add_to_cart(pet(1, "Rex", Some("rex")), 2).await.unwrap();
    bob.refresh_cart().await.unwrap();

    assert_eq!(alice.item_count(), 2);
    assert_eq!(bob.item_count(), 0);
    assert!(carts.cart_for(bob_key).items().is_empty());
    assert_eq!(carts.cart_for(alice_key).items()[0].pet.id, PetId::new(1));
}

#[tokio::test]
async fn test_clear_and_checkout_only_touch_own_cart() {
    let (sessions, carts) = sessions();
    let (alice_key, bob_key) = (Uuid::new_v4(), Uuid::new_v4());
    let (alice, _) = sessions.get_or_create(alice_key).await;
    let (bob, _) = sessions.get_or_create(bob_key).await;

    alice.add_to_cart(pet(1, "Rex", None), 1).await.unwrap();
    bob.add_to_cart(pet(2, "Tom", None), 1).await.unwrap();

    bob.clear_cart().await.unwrap();
    alice.refresh_cart().await.unwrap();
    assert_eq!(alice.item_count(), 1);

    let receipt = bob.checkout().await.unwrap();
    assert!(receipt.total.is_zero());
    assert_eq!(carts.cart_for(alice_key).items().len(), 1);
    assert_eq!(carts.cart_for(alice_key).count(Call::Clear), 0);
    assert_eq!(carts.cart_for(alice_key).count(Call::Checkout), 0);
}

#[tokio::test]
async fn test_same_key_reaches_same_backend_cart() {
    let (sessions, _) = sessions();
    let key = Uuid::new_v4();

    let (first, _) = sessions.get_or_create(key).await;
    first.add_to_cart(pet(3, "Ghost", None), 1).await.unwrap();

    // A new store for the same key, as after idle expiry, finds the items.
    sessions.remove(key).await;
    let (second, created) = sessions.get_or_create(key).await;
    assert!(created);
    second.refresh_cart().await.unwrap();

    assert_eq!(second.item_count(), 1);
}
