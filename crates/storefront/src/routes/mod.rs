//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                       - Redirect to the pet listing
//! GET  /health                 - Health check
//!
//! # Pets
//! GET  /pets?type=dog|cat      - Pet listing
//! GET  /pets/{id}/image        - Image fallback after a failed load (redirect)
//!
//! # Cart (HTMX fragments)
//! GET  /cart                   - Cart panel
//! POST /cart/add               - Add to cart (returns count badge)
//! POST /cart/quantity          - Step quantity (returns panel)
//! POST /cart/remove            - Remove item (returns panel)
//! POST /cart/clear             - Clear cart (returns panel)
//! POST /cart/checkout          - Close panel, go to /checkout
//! GET  /cart/count             - Cart count badge
//!
//! # Checkout
//! GET  /checkout               - Order summary
//! POST /checkout               - Place order
//! ```

pub mod cart;
pub mod checkout;
pub mod pets;

use axum::{
    Router,
    response::Redirect,
    routing::{get, post},
};

use crate::state::AppState;

/// Create the pet routes router.
pub fn pet_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(pets::index))
        .route("/{id}/image", get(pets::image_fallback))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/quantity", post(cart::quantity))
        .route("/remove", post(cart::remove))
        .route("/clear", post(cart::clear))
        .route("/checkout", post(cart::checkout))
        .route("/count", get(cart::count))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(|| async { Redirect::to("/pets") }))
        .nest("/pets", pet_routes())
        .nest("/cart", cart_routes())
        .route("/checkout", get(checkout::show).post(checkout::submit))
}
