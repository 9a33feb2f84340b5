//! Shopping cart state.
//!
//! # Architecture
//!
//! - [`CartStore`] is the single source of truth for one shopper's cart. It
//!   mediates every change against the backend and re-fetches the
//!   authoritative state afterwards.
//! - Mutations on one store are serialized: a second add started while the
//!   first is still refreshing waits for it, so "mutate, then refresh" never
//!   interleaves.
//! - [`PetImageCache`] remembers the pet snapshots the shopper added, because
//!   the backend's cart responses often drop image fields.
//! - [`CartSessions`] maps browser sessions to stores and drops idle ones.

mod image_cache;
mod sessions;
mod store;

pub use image_cache::PetImageCache;
pub use sessions::CartSessions;
pub use store::{CartSnapshot, CartStore};

use serde::Deserialize;
use thiserror::Error;

use crate::api::ApiError;

/// Errors returned by cart store operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// The backend rejected or failed the operation. Local state is unchanged.
    #[error("Cart request failed: {0}")]
    Api(#[source] ApiError),

    /// The change was applied, but re-fetching the cart afterwards failed.
    /// Local state is stale until the next successful refresh.
    #[error("Cart updated but refresh failed: {0}")]
    RefreshFailed(#[source] ApiError),
}

/// What a cart operation did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The backend accepted the change. Carries its confirmation, if it sent one.
    Applied { message: Option<String> },
    /// Nothing to do; no backend call was made.
    Skipped,
}

impl Outcome {
    /// Backend confirmation, if any.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Applied { message } => message.as_deref(),
            Self::Skipped => None,
        }
    }
}

/// Quantity stepper direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum Direction {
    #[serde(rename = "plus")]
    Increment,
    #[serde(rename = "minus")]
    Decrement,
}

impl Direction {
    /// New quantity after one step. Decrementing never goes below 1.
    #[must_use]
    pub const fn apply(self, quantity: u32) -> u32 {
        match self {
            Self::Increment => quantity.saturating_add(1),
            Self::Decrement => {
                if quantity > 1 {
                    quantity - 1
                } else {
                    1
                }
            }
        }
    }
}
