//! Pet backend REST client.
//!
//! # Architecture
//!
//! - The backend is the source of truth for cart contents, quantities and
//!   prices. Nothing is synced locally; every read is a direct API call.
//! - Pet listings are cached in memory via `moka` (5 minute TTL).
//! - Cart operations are exposed through the [`CartApi`] trait so the cart
//!   store can run against the real client or an in-process fake.
//! - Every shopper has their own backend cart. Cart requests carry the
//!   shopper's cart id in the [`CART_ID_HEADER`] header; a [`CartBackend`]
//!   hands out a [`CartApi`] bound to one cart id.
//!
//! # Endpoints
//!
//! ```text
//! GET    /api/v1/cart                      - Line items
//! POST   /api/v1/cart/items                - Add {petId, quantity}
//! PUT    /api/v1/cart/items                - Set {cartItemId, quantity}
//! DELETE /api/v1/cart/items/{cartItemId}   - Remove a line item
//! DELETE /api/v1/cart                      - Clear
//! POST   /api/v1/cart/checkout             - Checkout -> {message, total}
//! GET    /api/v1/cart/total                - Total
//! GET    /api/v1/pets                      - Pet listing
//! GET    /api/v1/pets/{id}                 - Single pet
//! ```

mod cache;
mod client;
pub mod types;

use std::future::Future;

use pawmart_core::{CartItemId, CartLineItem, PetId, Price};
use thiserror::Error;
use uuid::Uuid;

pub use client::{CartClient, PetApiClient};
pub use types::CheckoutReceipt;

/// Errors that can occur when talking to the pet backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed (connection, timeout, TLS).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Backend answered with a non-success status.
    #[error("API error: {status} - {message}")]
    Status { status: u16, message: String },

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limited by the backend.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Cart operations offered by the backend.
///
/// Every method is a single request; sequencing (mutate, then refetch) is the
/// caller's job.
pub trait CartApi: Send + Sync {
    /// Fetch the current line items, in backend order.
    fn list_items(&self) -> impl Future<Output = Result<Vec<CartLineItem>, ApiError>> + Send;

    /// Add `quantity` units of a pet.
    fn add_item(
        &self,
        pet_id: PetId,
        quantity: u32,
    ) -> impl Future<Output = Result<(), ApiError>> + Send;

    /// Set the absolute quantity of a line item.
    fn update_quantity(
        &self,
        item_id: CartItemId,
        quantity: u32,
    ) -> impl Future<Output = Result<(), ApiError>> + Send;

    /// Delete a line item. Returns the backend's confirmation, if any.
    fn remove_item(
        &self,
        item_id: CartItemId,
    ) -> impl Future<Output = Result<Option<String>, ApiError>> + Send;

    /// Empty the cart. Returns the backend's confirmation, if any.
    fn clear(&self) -> impl Future<Output = Result<Option<String>, ApiError>> + Send;

    /// Finalize the order.
    fn checkout(&self) -> impl Future<Output = Result<CheckoutReceipt, ApiError>> + Send;

    /// Fetch the authoritative cart total.
    fn total(&self) -> impl Future<Output = Result<Price, ApiError>> + Send;
}

/// Header naming the backend cart a cart request operates on.
pub const CART_ID_HEADER: &str = "X-Cart-Id";

/// Source of per-shopper [`CartApi`] handles.
pub trait CartBackend: Send + Sync {
    /// Handle type bound to a single cart.
    type Cart: CartApi + 'static;

    /// Handle for the backend cart identified by `cart_id`.
    fn cart(&self, cart_id: Uuid) -> Self::Cart;
}
