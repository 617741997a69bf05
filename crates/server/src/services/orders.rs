//! Order workflow.
//!
//! Every order write is validated here before the store sees it:
//!
//! 1. the user exists
//! 2. the address, if any, exists and belongs to the order's user
//! 3. each line, in input order, has a positive quantity, names an existing
//!    product, and does not ask for more units than are in stock
//!
//! Validation stops at the first violation. Stock is checked, never
//! decremented. The order store repeats the stock check under a row lock,
//! so a concurrent stock change between here and the write still fails the
//! order with `InsufficientStock`.

use std::sync::Arc;

use tracing::{info, instrument};

use orderly_core::{AddressId, OrderId, Page, Patch, ProductId, UserId};

use super::{ServiceError, ValidationError};
use crate::db::{AddressStore, OrderStore, ProductStore, UserStore};
use crate::models::{
    ItemChange, NewOrder, NewOrderItem, Order, OrderChanges, OrderFilter, OrderPatch,
};

/// Order operations.
#[derive(Clone)]
pub struct OrderService {
    orders: Arc<dyn OrderStore>,
    users: Arc<dyn UserStore>,
    products: Arc<dyn ProductStore>,
    addresses: Arc<dyn AddressStore>,
}

impl OrderService {
    #[must_use]
    pub fn new(
        orders: Arc<dyn OrderStore>,
        users: Arc<dyn UserStore>,
        products: Arc<dyn ProductStore>,
        addresses: Arc<dyn AddressStore>,
    ) -> Self {
        Self {
            orders,
            users,
            products,
            addresses,
        }
    }

    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the order does not exist.
    pub async fn get_order(&self, id: OrderId) -> Result<Order, ServiceError> {
        self.orders
            .get_by_id(id)
            .await?
            .ok_or(ServiceError::NotFound("order"))
    }

    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the store fails.
    pub async fn list_orders(&self, page: Page) -> Result<Vec<Order>, ServiceError> {
        Ok(self
            .orders
            .get_by_filter(&OrderFilter::default(), Some(page))
            .await?)
    }

    /// Orders placed by `user_id`. Empty for an unknown user.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the store fails.
    pub async fn list_user_orders(
        &self,
        user_id: UserId,
        page: Page,
    ) -> Result<Vec<Order>, ServiceError> {
        Ok(self
            .orders
            .get_by_filter(&OrderFilter::for_user(user_id), Some(page))
            .await?)
    }

    /// Validate and place an order.
    ///
    /// # Errors
    ///
    /// Returns the first `ValidationError` found, in the order user,
    /// address, then each line.
    #[instrument(skip(self, new), fields(user_id = %new.user_id, lines = new.items.len()))]
    pub async fn create_order(&self, new: NewOrder) -> Result<Order, ServiceError> {
        self.require_user(new.user_id).await?;
        if let Some(address_id) = new.address_id {
            self.require_address(address_id, new.user_id).await?;
        }
        for item in &new.items {
            self.check_line(item.product_id, item.quantity).await?;
        }

        let order = self.orders.create(&new).await?;
        info!(order_id = %order.id, "Created order");
        Ok(order)
    }

    /// Validate and apply a partial update.
    ///
    /// Lines with an `id` patch that item in place; lines without one are
    /// appended. A line whose `id` belongs to another order is ignored.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the order does not exist, or the
    /// first `ValidationError` found.
    #[instrument(skip(self, patch))]
    pub async fn update_order(&self, id: OrderId, patch: OrderPatch) -> Result<Order, ServiceError> {
        let current = self.get_order(id).await?;
        let mut changes = OrderChanges::default();

        match patch.user_id {
            Patch::Absent => {}
            Patch::Null => return Err(ValidationError::NullField("user_id").into()),
            Patch::Value(user_id) => {
                self.require_user(user_id).await?;
                changes.user_id = Some(user_id);
            }
        }

        match patch.address_id {
            Patch::Absent => {}
            Patch::Null => changes.address_id = Some(None),
            Patch::Value(address_id) => {
                let owner = changes.user_id.unwrap_or(current.user_id);
                self.require_address(address_id, owner).await?;
                changes.address_id = Some(Some(address_id));
            }
        }

        let items = match patch.items {
            Patch::Absent => Vec::new(),
            Patch::Null => return Err(ValidationError::NullField("items").into()),
            Patch::Value(items) => items,
        };
        for item in items {
            if item.product_id.is_null() {
                return Err(ValidationError::NullField("product_id").into());
            }
            if item.quantity.is_null() {
                return Err(ValidationError::NullField("quantity").into());
            }
            let product_id = item.product_id.value().copied();
            let quantity = item.quantity.value().copied();

            let Some(item_id) = item.id else {
                let product_id = product_id.ok_or(ValidationError::MissingField("product_id"))?;
                let quantity = quantity.ok_or(ValidationError::MissingField("quantity"))?;
                self.check_line(product_id, quantity).await?;
                changes.items.push(ItemChange::Append(NewOrderItem {
                    product_id,
                    quantity,
                }));
                continue;
            };

            let Some(stored) = current.items.iter().find(|i| i.id == item_id) else {
                continue;
            };
            if product_id.is_none() && quantity.is_none() {
                continue;
            }
            self.check_line(
                product_id.unwrap_or(stored.product_id),
                quantity.unwrap_or(stored.quantity),
            )
            .await?;
            changes.items.push(ItemChange::Patch {
                id: item_id,
                product_id,
                quantity,
            });
        }

        if changes.is_empty() {
            return Ok(current);
        }

        let order = self
            .orders
            .update(id, &changes)
            .await?
            .ok_or(ServiceError::NotFound("order"))?;
        info!(order_id = %order.id, "Updated order");
        Ok(order)
    }

    /// Delete an order and its items. Deleting a missing order succeeds.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the store fails.
    #[instrument(skip(self))]
    pub async fn delete_order(&self, id: OrderId) -> Result<(), ServiceError> {
        self.orders.delete(id).await?;
        info!(order_id = %id, "Deleted order");
        Ok(())
    }

    async fn require_user(&self, user_id: UserId) -> Result<(), ServiceError> {
        if self.users.get_by_id(user_id).await?.is_none() {
            return Err(ValidationError::UserNotFound(user_id).into());
        }
        Ok(())
    }

    /// An address of another user is treated as missing.
    async fn require_address(
        &self,
        address_id: AddressId,
        owner: UserId,
    ) -> Result<(), ServiceError> {
        match self.addresses.get_by_id(address_id).await? {
            Some(address) if address.user_id == owner => Ok(()),
            _ => Err(ValidationError::AddressNotFound(address_id).into()),
        }
    }

    async fn check_line(&self, product_id: ProductId, quantity: i32) -> Result<(), ServiceError> {
        if quantity < 1 {
            return Err(ValidationError::InvalidQuantity(quantity).into());
        }
        let product = self
            .products
            .get_by_id(product_id)
            .await?
            .ok_or(ValidationError::ProductNotFound(product_id))?;
        if quantity > product.quantity {
            return Err(ValidationError::InsufficientStock {
                product_id,
                requested: quantity,
                available: product.quantity,
            }
            .into());
        }
        Ok(())
    }
}
