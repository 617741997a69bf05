//! Product domain types.

use orderly_core::{Patch, ProductId};
use serde::{Deserialize, Serialize};

/// A stocked product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Product {
    /// Unique product ID.
    pub id: ProductId,
    /// Unique product name.
    pub product_name: String,
    /// Units in stock. Never negative.
    pub quantity: i32,
}

/// Input for creating a product.
///
/// `quantity` is signed so a negative value reaches validation and is
/// reported as such instead of failing deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub product_name: String,
    pub quantity: i32,
}

/// Partial update for a product.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductPatch {
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    pub product_name: Patch<String>,
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    pub quantity: Patch<i32>,
}

impl ProductPatch {
    /// A patch that only sets the stock level.
    #[must_use]
    pub const fn quantity(quantity: i32) -> Self {
        Self {
            product_name: Patch::Absent,
            quantity: Patch::Value(quantity),
        }
    }
}

/// Equality filter for listing products.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductFilter {
    pub product_name: Option<String>,
    pub quantity: Option<i32>,
}

impl ProductFilter {
    /// Filter on the unique name.
    #[must_use]
    pub fn by_name(name: impl Into<String>) -> Self {
        Self {
            product_name: Some(name.into()),
            quantity: None,
        }
    }

    /// Returns `true` if `product` satisfies every set field.
    #[must_use]
    pub fn matches(&self, product: &Product) -> bool {
        self.product_name
            .as_ref()
            .is_none_or(|n| *n == product.product_name)
            && self.quantity.is_none_or(|q| q == product.quantity)
    }
}
