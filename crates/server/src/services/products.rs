//! Product service.

use std::sync::Arc;

use tracing::{info, instrument};

use orderly_core::{Page, Patch, ProductId};

use super::{ServiceError, ValidationError};
use crate::db::ProductStore;
use crate::models::{NewProduct, Product, ProductFilter, ProductPatch};

/// Product operations. Reads and writes go through the cache-aside store.
#[derive(Clone)]
pub struct ProductService {
    store: Arc<dyn ProductStore>,
}

impl ProductService {
    #[must_use]
    pub fn new(store: Arc<dyn ProductStore>) -> Self {
        Self { store }
    }

    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the product does not exist.
    pub async fn get(&self, id: ProductId) -> Result<Product, ServiceError> {
        self.store
            .get_by_id(id)
            .await?
            .ok_or(ServiceError::NotFound("product"))
    }

    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the store fails.
    pub async fn list(
        &self,
        filter: &ProductFilter,
        page: Page,
    ) -> Result<Vec<Product>, ServiceError> {
        Ok(self.store.get_by_filter(filter, Some(page)).await?)
    }

    /// Add a product to the catalogue.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::NegativeQuantity` or
    /// `ValidationError::DuplicateName`.
    #[instrument(skip(self, new), fields(product_name = %new.product_name))]
    pub async fn create(&self, new: NewProduct) -> Result<Product, ServiceError> {
        if new.quantity < 0 {
            return Err(ValidationError::NegativeQuantity(new.quantity).into());
        }
        self.ensure_name_free(&new.product_name, None).await?;

        let product = self.store.create(&new).await?;
        info!(product_id = %product.id, quantity = product.quantity, "Created product");
        Ok(product)
    }

    /// Apply a partial update.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::NullField`, `ValidationError::NegativeQuantity`
    /// or `ValidationError::DuplicateName` for a bad patch, and
    /// `ServiceError::NotFound` if the product does not exist.
    #[instrument(skip(self, patch))]
    pub async fn update(&self, id: ProductId, patch: ProductPatch) -> Result<Product, ServiceError> {
        match patch.quantity {
            Patch::Null => return Err(ValidationError::NullField("quantity").into()),
            Patch::Value(q) if q < 0 => return Err(ValidationError::NegativeQuantity(q).into()),
            Patch::Value(_) | Patch::Absent => {}
        }
        match &patch.product_name {
            Patch::Null => return Err(ValidationError::NullField("product_name").into()),
            Patch::Value(name) => self.ensure_name_free(name, Some(id)).await?,
            Patch::Absent => {}
        }

        let product = self
            .store
            .update(id, &patch)
            .await?
            .ok_or(ServiceError::NotFound("product"))?;
        info!(product_id = %product.id, quantity = product.quantity, "Updated product");
        Ok(product)
    }

    /// Set the stock of a product to zero.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the product does not exist.
    #[instrument(skip(self))]
    pub async fn mark_out_of_stock(&self, id: ProductId) -> Result<Product, ServiceError> {
        let product = self
            .store
            .update(id, &ProductPatch::quantity(0))
            .await?
            .ok_or(ServiceError::NotFound("product"))?;
        info!(product_id = %product.id, "Marked product out of stock");
        Ok(product)
    }

    /// Delete a product. Deleting a missing product succeeds.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::Conflict` if an order still references it.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: ProductId) -> Result<(), ServiceError> {
        self.store.delete(id).await?;
        info!(product_id = %id, "Deleted product");
        Ok(())
    }

    async fn ensure_name_free(
        &self,
        name: &str,
        owner: Option<ProductId>,
    ) -> Result<(), ServiceError> {
        let taken = self
            .store
            .get_by_filter(&ProductFilter::by_name(name), None)
            .await?
            .iter()
            .any(|p| Some(p.id) != owner);
        if taken {
            return Err(ValidationError::DuplicateName(name.to_owned()).into());
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;

    fn service() -> ProductService {
        ProductService::new(Arc::new(MemoryStore::new()))
    }

    fn widget(quantity: i32) -> NewProduct {
        NewProduct {
            product_name: "Widget".to_owned(),
            quantity,
        }
    }

    #[tokio::test]
    async fn test_negative_quantity_is_rejected() {
        let err = service().create(widget(-1)).await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Validation(ValidationError::NegativeQuantity(-1))
        ));
    }

    #[tokio::test]
    async fn test_duplicate_name_is_rejected() {
        let products = service();
        products.create(widget(5)).await.unwrap();
        let err = products.create(widget(1)).await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Validation(ValidationError::DuplicateName(_))
        ));
    }

    #[tokio::test]
    async fn test_rename_onto_other_product_is_rejected() {
        let products = service();
        products.create(widget(5)).await.unwrap();
        let gadget = products
            .create(NewProduct {
                product_name: "Gadget".to_owned(),
                quantity: 1,
            })
            .await
            .unwrap();

        let patch = ProductPatch {
            product_name: Patch::Value("Widget".to_owned()),
            ..ProductPatch::default()
        };
        assert!(products.update(gadget.id, patch).await.is_err());
    }

    #[tokio::test]
    async fn test_null_quantity_is_rejected() {
        let products = service();
        let product = products.create(widget(5)).await.unwrap();
        let patch = ProductPatch {
            quantity: Patch::Null,
            ..ProductPatch::default()
        };
        let err = products.update(product.id, patch).await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Validation(ValidationError::NullField("quantity"))
        ));
    }

    #[tokio::test]
    async fn test_mark_out_of_stock() {
        let products = service();
        let product = products.create(widget(5)).await.unwrap();
        let product = products.mark_out_of_stock(product.id).await.unwrap();
        assert_eq!(product.quantity, 0);

        let err = products
            .mark_out_of_stock(ProductId::new(99))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound("product")));
    }
}
