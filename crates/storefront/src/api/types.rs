//! Wire types for the pet backend that are not shared domain types.
//!
//! Pets and cart line items live in `pawmart_core`; this module only holds
//! request bodies and the small response envelopes around them.

use pawmart_core::{CartItemId, PetId, Price};
use serde::{Deserialize, Serialize};

/// Body of `POST /api/v1/cart/items`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddItemRequest {
    pub pet_id: PetId,
    pub quantity: u32,
}

/// Body of `PUT /api/v1/cart/items`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateQuantityRequest {
    pub cart_item_id: CartItemId,
    /// Absolute quantity, not a delta.
    pub quantity: u32,
}

/// Confirmation returned by `POST /api/v1/cart/checkout`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutReceipt {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub total: Price,
}

/// `GET /api/v1/cart/total` answers with either a bare number or an object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum TotalResponse {
    Bare(Price),
    Wrapped { total: Price },
}

impl TotalResponse {
    pub(crate) const fn into_price(self) -> Price {
        match self {
            Self::Bare(total) | Self::Wrapped { total } => total,
        }
    }
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    message: Option<String>,
}

/// Maximum length of a plain-text confirmation we are willing to show.
const MAX_MESSAGE_LEN: usize = 200;

/// Extract a human-readable confirmation from a mutation response body.
///
/// Accepts `{"message": "..."}`, a JSON string, or short plain text. Empty
/// bodies and JSON without a message yield `None`.
pub(crate) fn confirmation_message(body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }

    if let Ok(MessageResponse { message }) = serde_json::from_str::<MessageResponse>(body) {
        return message.filter(|m| !m.trim().is_empty());
    }
    if let Ok(text) = serde_json::from_str::<String>(body) {
        return Some(text).filter(|m| !m.trim().is_empty());
    }
    if serde_json::from_str::<serde_json::Value>(body).is_ok() {
        return None;
    }

    (body.chars().count() <= MAX_MESSAGE_LEN).then(|| body.to_string())
}
