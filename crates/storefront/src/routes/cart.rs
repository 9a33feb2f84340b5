//! Cart route handlers.
//!
//! Cart operations use HTMX for dynamic updates without full page reloads.
//! Each browser session owns a [`CartStore`] found through the session's
//! cart key. Feedback reaches the page as an `HX-Trigger` header carrying a
//! `cart-updated` event and, where the action calls for it, a toast.

use std::sync::Arc;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{AppendHeaders, IntoResponse, Response},
};
use futures::future::join_all;
use pawmart_core::{CartLineItem, PetId};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use crate::api::{ApiError, CartClient};
use crate::cart::{CartError, CartSnapshot, CartStore, Direction, Outcome};
use crate::error::{AppError, add_breadcrumb};
use crate::images::{ImageProbe, ImageResolver};
use crate::models::cart_key;
use crate::state::AppState;

/// Store type behind every session.
pub type SessionCart = CartStore<CartClient>;

// =============================================================================
// View Models
// =============================================================================

/// Cart line display data for templates.
#[derive(Debug, Clone)]
pub struct CartItemView {
    pub pet_id: PetId,
    pub name: String,
    pub breed: String,
    pub quantity: u32,
    pub unit_price: String,
    pub line_total: String,
    pub image_url: String,
    /// Decrement is disabled at quantity 1.
    pub can_decrement: bool,
}

/// Cart display data for templates.
#[derive(Debug, Clone)]
pub struct CartView {
    pub items: Vec<CartItemView>,
    pub total: String,
    pub item_count: u32,
}

impl CartView {
    /// Build a view, resolving every line item's image concurrently.
    ///
    /// Each resolution falls back to the placeholder on its own, so one slow
    /// or broken image never fails the panel.
    pub async fn resolve<P: ImageProbe>(snapshot: &CartSnapshot, images: &ImageResolver<P>) -> Self {
        let urls = join_all(snapshot.items.iter().map(|item| images.resolve(&item.pet))).await;
        Self::with_images(snapshot, urls)
    }

    /// Build a view from provisional image URLs without touching the network.
    pub async fn provisional<P: ImageProbe>(
        snapshot: &CartSnapshot,
        images: &ImageResolver<P>,
    ) -> Self {
        let urls = join_all(
            snapshot
                .items
                .iter()
                .map(|item| images.provisional(&item.pet)),
        )
        .await;
        Self::with_images(snapshot, urls)
    }

    fn with_images(snapshot: &CartSnapshot, urls: Vec<String>) -> Self {
        Self {
            items: snapshot
                .items
                .iter()
                .zip(urls)
                .map(|(item, url)| CartItemView::new(item, url))
                .collect(),
            total: snapshot.total.to_string(),
            item_count: snapshot.item_count(),
        }
    }

    /// Whether the cart has no line items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl CartItemView {
    fn new(item: &CartLineItem, image_url: String) -> Self {
        Self {
            pet_id: item.pet.id,
            name: item.pet.name.clone(),
            breed: item.pet.breed.clone(),
            quantity: item.quantity,
            unit_price: item.pet.price.to_string(),
            line_total: item.line_total().to_string(),
            image_url,
            can_decrement: item.quantity > 1,
        }
    }
}

// =============================================================================
// Toasts
// =============================================================================

/// Toast severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastLevel {
    Success,
    Error,
}

/// A bottom-anchored notification shown by the page script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Toast {
    pub level: ToastLevel,
    pub message: String,
}

impl Toast {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: ToastLevel::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: ToastLevel::Error,
            message: message.into(),
        }
    }
}

#[derive(Serialize)]
struct Trigger<'a> {
    #[serde(rename = "cart-updated")]
    cart_updated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    toast: Option<&'a Toast>,
}

/// `HX-Trigger` header value announcing a cart change and an optional toast.
#[must_use]
pub fn hx_trigger(toast: Option<&Toast>) -> String {
    serde_json::to_string(&Trigger {
        cart_updated: true,
        toast,
    })
    .unwrap_or_else(|_| "cart-updated".to_string())
}

/// Toast for a store failure. A refresh failure means the change landed.
fn failure_toast(action: &str, error: &CartError) -> Toast {
    match error {
        CartError::RefreshFailed(_) => {
            Toast::error(format!("{action} succeeded, but the cart could not be reloaded"))
        }
        CartError::Api(ApiError::RateLimited(_)) => {
            Toast::error("Too many requests, please try again in a moment")
        }
        CartError::Api(_) => Toast::error(format!("Could not {}", action.to_lowercase())),
    }
}

/// Toast for a completed removal or clear: the backend's own wording if it
/// sent any, otherwise a generic confirmation.
fn confirmation_toast(outcome: &Outcome, fallback: &str) -> Toast {
    Toast::success(outcome.message().unwrap_or(fallback))
}

// =============================================================================
// Templates
// =============================================================================

/// Cart panel fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "cart/panel.html")]
pub struct CartPanelTemplate {
    pub cart: CartView,
}

/// Cart count badge fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_count.html")]
pub struct CartCountTemplate {
    pub count: u32,
}

// =============================================================================
// Session Helpers
// =============================================================================

/// Get the session's cart store. A store seen for the first time loads the
/// backend cart before it is returned.
pub async fn session_cart(state: &AppState, session: &Session) -> Result<Arc<SessionCart>, AppError> {
    // Failure is logged by the store; an empty cart renders in the meantime.
    let (store, _) = open_session_cart(state, session).await?;
    Ok(store)
}

/// Like [`session_cart`], also returning the result of the initial load when
/// the store was just created. `None` means the store already existed and
/// nothing was fetched.
pub async fn open_session_cart(
    state: &AppState,
    session: &Session,
) -> Result<(Arc<SessionCart>, Option<Result<(), CartError>>), AppError> {
    let key = cart_key(session).await?;
    let (store, fresh) = state.carts().get_or_create(key).await;

    let loaded = if fresh {
        Some(store.refresh_cart().await)
    } else {
        None
    };

    Ok((store, loaded))
}

/// Panel fragment with a trigger header.
fn panel_response(cart: CartView, toast: Option<&Toast>) -> Response {
    (
        AppendHeaders([("HX-Trigger", hx_trigger(toast))]),
        CartPanelTemplate { cart },
    )
        .into_response()
}

/// Re-render the panel from provisional URLs after a mutation.
async fn panel_after(state: &AppState, store: &SessionCart, toast: Option<&Toast>) -> Response {
    let cart = CartView::provisional(&store.snapshot(), state.images()).await;
    panel_response(cart, toast)
}

// =============================================================================
// Forms
// =============================================================================

/// Add to cart form data.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub pet_id: PetId,
    pub quantity: Option<u32>,
}

/// Quantity stepper form data.
#[derive(Debug, Deserialize)]
pub struct QuantityForm {
    pub pet_id: PetId,
    pub direction: Direction,
}

/// Remove from cart form data.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartForm {
    pub pet_id: PetId,
}

// =============================================================================
// Handlers
// =============================================================================

/// Display the cart panel (HTMX).
///
/// Refreshes from the backend first, once; on failure the previous contents
/// are rendered with an error toast.
#[instrument(skip(state, session))]
pub async fn show(State(state): State<AppState>, session: Session) -> Result<Response, AppError> {
    let (store, loaded) = open_session_cart(&state, &session).await?;

    let refreshed = match loaded {
        Some(result) => result,
        None => store.refresh_cart().await,
    };
    let toast = match refreshed {
        Ok(()) => None,
        Err(e) => Some(failure_toast("Load cart", &e)),
    };

    let snapshot = store.snapshot();
    let cart = if snapshot.is_empty() {
        CartView::provisional(&snapshot, state.images()).await
    } else {
        CartView::resolve(&snapshot, state.images()).await
    };

    Ok(panel_response(cart, toast.as_ref()))
}

/// Add a pet to the cart (HTMX).
///
/// Returns the count badge. The pet is fetched first so the store can keep
/// its image for line items the backend returns without one.
#[instrument(skip(state, session), fields(pet_id = %form.pet_id))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<AddToCartForm>,
) -> Result<Response, AppError> {
    let store = session_cart(&state, &session).await?;

    let mut pet = match state.api().get_pet(form.pet_id).await {
        Ok(pet) => pet,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load pet for cart");
            let toast = Toast::error("That pet is no longer available");
            return Ok(badge_response(&store, Some(&toast)));
        }
    };

    if pet.has_image() {
        pet.image_url = Some(state.images().provisional(&pet).await);
    }

    let name = pet.name.clone();
    let toast = match store.add_to_cart(pet, form.quantity.unwrap_or(1)).await {
        Ok(_) => {
            let pet_id = form.pet_id.to_string();
            add_breadcrumb("cart", "Added pet", Some(&[("pet_id", pet_id.as_str())]));
            None
        }
        Err(e) => Some(failure_toast(&format!("Add {name} to cart"), &e)),
    };

    Ok(badge_response(&store, toast.as_ref()))
}

fn badge_response(store: &SessionCart, toast: Option<&Toast>) -> Response {
    (
        AppendHeaders([("HX-Trigger", hx_trigger(toast))]),
        CartCountTemplate {
            count: store.item_count(),
        },
    )
        .into_response()
}

/// Step a line item's quantity (HTMX). Toasts only on failure.
#[instrument(skip(state, session), fields(pet_id = %form.pet_id))]
pub async fn quantity(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<QuantityForm>,
) -> Result<Response, AppError> {
    let store = session_cart(&state, &session).await?;

    let toast = store
        .update_quantity(form.pet_id, form.direction)
        .await
        .err()
        .map(|e| failure_toast("Update quantity", &e));

    Ok(panel_after(&state, &store, toast.as_ref()).await)
}

/// Remove a line item (HTMX). Always toasts.
#[instrument(skip(state, session), fields(pet_id = %form.pet_id))]
pub async fn remove(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<RemoveFromCartForm>,
) -> Result<Response, AppError> {
    let store = session_cart(&state, &session).await?;

    let toast = match store.remove_from_cart(form.pet_id).await {
        Ok(outcome) => confirmation_toast(&outcome, "Removed from cart"),
        Err(e) => failure_toast("Remove item", &e),
    };

    Ok(panel_after(&state, &store, Some(&toast)).await)
}

/// Empty the cart (HTMX). Always toasts.
#[instrument(skip(state, session))]
pub async fn clear(State(state): State<AppState>, session: Session) -> Result<Response, AppError> {
    let store = session_cart(&state, &session).await?;

    let toast = match store.clear_cart().await {
        Ok(outcome) => confirmation_toast(&outcome, "Cart cleared"),
        Err(e) => failure_toast("Clear cart", &e),
    };

    Ok(panel_after(&state, &store, Some(&toast)).await)
}

/// Close the panel and navigate to the checkout page.
///
/// Does not check out; the checkout page does.
pub async fn checkout() -> impl IntoResponse {
    AppendHeaders([("HX-Redirect", "/checkout")])
}

/// Get cart count badge (HTMX).
#[instrument(skip(state, session))]
pub async fn count(State(state): State<AppState>, session: Session) -> Result<CartCountTemplate, AppError> {
    let store = session_cart(&state, &session).await?;
    Ok(CartCountTemplate {
        count: store.item_count(),
    })
}
