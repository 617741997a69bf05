//! Order and line-item domain types.

use orderly_core::{AddressId, OrderId, OrderItemId, Patch, ProductId, UserId};
use serde::{Deserialize, Serialize};

/// An order with its line items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub address_id: Option<AddressId>,
    /// Line items in insertion order.
    pub items: Vec<OrderItem>,
}

/// A line item. Owned by exactly one order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub quantity: i32,
}

/// Input for creating an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrder {
    pub user_id: UserId,
    #[serde(default)]
    pub address_id: Option<AddressId>,
    pub items: Vec<NewOrderItem>,
}

/// A line item in a [`NewOrder`], or one appended by an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrderItem {
    pub product_id: ProductId,
    pub quantity: i32,
}

/// Partial update for an order, as received over HTTP or the queue.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPatch {
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    pub user_id: Patch<UserId>,
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    pub address_id: Patch<AddressId>,
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    pub items: Patch<Vec<OrderItemPatch>>,
}

/// One entry of [`OrderPatch::items`].
///
/// With an `id` the entry patches that item in place; without one it is
/// appended and both `product_id` and `quantity` are required.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItemPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<OrderItemId>,
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    pub product_id: Patch<ProductId>,
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    pub quantity: Patch<i32>,
}

/// A validated order update, ready for the store.
///
/// Built by the order service from an [`OrderPatch`]; every referenced user,
/// address and product has been checked to exist.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderChanges {
    pub user_id: Option<UserId>,
    /// `Some(None)` clears the address.
    pub address_id: Option<Option<AddressId>>,
    pub items: Vec<ItemChange>,
}

impl OrderChanges {
    /// Returns `true` if applying these changes would leave the order as is.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.user_id.is_none() && self.address_id.is_none() && self.items.is_empty()
    }
}

/// A single line-item change within [`OrderChanges`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemChange {
    /// Patch an existing item. Ignored if the item belongs to another order.
    Patch {
        id: OrderItemId,
        product_id: Option<ProductId>,
        quantity: Option<i32>,
    },
    /// Append a new item.
    Append(NewOrderItem),
}

/// Equality filter for listing orders.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OrderFilter {
    pub user_id: Option<UserId>,
    pub address_id: Option<AddressId>,
}

impl OrderFilter {
    /// Orders owned by `user_id`.
    #[must_use]
    pub const fn for_user(user_id: UserId) -> Self {
        Self {
            user_id: Some(user_id),
            address_id: None,
        }
    }

    /// Returns `true` if `order` satisfies every set field.
    #[must_use]
    pub fn matches(&self, order: &Order) -> bool {
        self.user_id.is_none_or(|u| u == order.user_id)
            && self.address_id.is_none_or(|a| Some(a) == order.address_id)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_order_patch_distinguishes_null_address() {
        let patch: OrderPatch = serde_json::from_str(r#"{"address_id": null}"#).unwrap();
        assert!(patch.address_id.is_null());
        assert!(patch.user_id.is_absent());
        assert!(patch.items.is_absent());
    }

    #[test]
    fn test_item_patch_without_id_is_an_append() {
        let patch: OrderPatch =
            serde_json::from_str(r#"{"items": [{"product_id": 2, "quantity": 1}]}"#).unwrap();
        let items = patch.items.value().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items.first().unwrap().id, None);
        assert_eq!(items.first().unwrap().quantity, Patch::Value(1));
    }

    #[test]
    fn test_new_order_address_is_optional() {
        let order: NewOrder =
            serde_json::from_str(r#"{"user_id": 1, "items": [{"product_id": 1, "quantity": 3}]}"#)
                .unwrap();
        assert_eq!(order.address_id, None);
        assert_eq!(
            order.items,
            vec![NewOrderItem {
                product_id: ProductId::new(1),
                quantity: 3
            }]
        );
    }
}
