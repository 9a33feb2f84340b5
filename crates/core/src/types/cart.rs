//! Cart line items as returned by the backend.

use serde::{Deserialize, Serialize};

use super::id::CartItemId;
use super::pet::Pet;
use super::price::Price;

/// One entry in a cart, pairing a pet snapshot with a quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineItem {
    /// Line item ID assigned by the backend.
    pub id: CartItemId,
    /// Pet snapshot at the time the cart was fetched.
    pub pet: Pet,
    /// Number of units, always at least 1.
    pub quantity: u32,
    /// Precomputed line subtotal, when the backend sends one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtotal: Option<Price>,
}

impl CartLineItem {
    /// Line total: the backend subtotal if present, otherwise unit price
    /// times quantity.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.subtotal
            .unwrap_or_else(|| self.pet.price.times(self.quantity))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;
    use crate::types::id::PetId;

    #[test]
    fn test_line_item_from_json() {
        let item: CartLineItem = serde_json::from_str(
            r#"{"id": 10, "pet": {"id": "1", "name": "Rex", "price": 100}, "quantity": 2}"#,
        )
        .unwrap();

        assert_eq!(item.id, CartItemId::new(10));
        assert_eq!(item.pet.id, PetId::new(1));
        assert_eq!(item.quantity, 2);
        assert_eq!(item.subtotal, None);
        assert_eq!(item.line_total(), Price::new(Decimal::from(200)));
    }

    #[test]
    fn test_line_total_prefers_backend_subtotal() {
        let item: CartLineItem = serde_json::from_str(
            r#"{"id": 10, "pet": {"id": 1, "price": 100}, "quantity": 2, "subtotal": "180.00"}"#,
        )
        .unwrap();

        assert_eq!(item.line_total(), Price::new(Decimal::from(180)));
    }
}
