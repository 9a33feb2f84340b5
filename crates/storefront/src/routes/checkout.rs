//! Checkout route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::State,
    response::{AppendHeaders, IntoResponse, Response},
};
use tower_sessions::Session;
use tracing::instrument;

use super::cart::{CartView, Toast, hx_trigger, open_session_cart, session_cart};
use crate::error::{AppError, add_breadcrumb};
use crate::filters;
use crate::state::AppState;

/// Checkout summary page template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/show.html")]
pub struct CheckoutTemplate {
    pub cart: CartView,
    pub toast: Option<Toast>,
}

/// Order confirmation page template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/done.html")]
pub struct CheckoutDoneTemplate {
    pub message: String,
    pub total: String,
}

/// Display the checkout summary.
#[instrument(skip(state, session))]
pub async fn show(State(state): State<AppState>, session: Session) -> Result<CheckoutTemplate, AppError> {
    let (store, loaded) = open_session_cart(&state, &session).await?;
    match loaded {
        Some(result) => result?,
        None => store.refresh_cart().await?,
    }

    let cart = CartView::resolve(&store.snapshot(), state.images()).await;
    Ok(CheckoutTemplate { cart, toast: None })
}

/// Place the order.
///
/// On success the cart is emptied and the backend's confirmation shown. On
/// failure the summary is rendered again with an error toast.
#[instrument(skip(state, session))]
pub async fn submit(State(state): State<AppState>, session: Session) -> Result<Response, AppError> {
    let store = session_cart(&state, &session).await?;

    match store.checkout().await {
        Ok(receipt) => {
            add_breadcrumb("checkout", "Order placed", None);
            let message = if receipt.message.trim().is_empty() {
                "Thank you for your order!".to_string()
            } else {
                receipt.message
            };

            Ok((
                AppendHeaders([("HX-Trigger", hx_trigger(None))]),
                CheckoutDoneTemplate {
                    message,
                    total: receipt.total.to_string(),
                },
            )
                .into_response())
        }
        Err(e) => {
            tracing::warn!(error = %e, "Checkout failed");
            let toast = Toast::error("Checkout failed, please try again");
            let cart = CartView::provisional(&store.snapshot(), state.images()).await;

            Ok((
                AppendHeaders([("HX-Trigger", hx_trigger(Some(&toast)))]),
                CheckoutTemplate {
                    cart,
                    toast: Some(toast),
                },
            )
                .into_response())
        }
    }
}
