//! Product repository for database operations.

use async_trait::async_trait;
use sqlx::{PgPool, QueryBuilder};

use orderly_core::{Page, ProductId};

use super::{ProductStore, RepositoryError, map_write_error, push_page};
use crate::models::{NewProduct, Product, ProductFilter, ProductPatch};

const COLUMNS: &str = "id, product_name, quantity";

/// Repository for product database operations.
#[derive(Clone)]
pub struct ProductRepository {
    pool: PgPool,
}

impl ProductRepository {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProductStore for ProductRepository {
    async fn get_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let product =
            sqlx::query_as::<_, Product>(&format!("SELECT {COLUMNS} FROM products WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(product)
    }

    async fn get_by_filter(
        &self,
        filter: &ProductFilter,
        page: Option<Page>,
    ) -> Result<Vec<Product>, RepositoryError> {
        let mut query = QueryBuilder::new(format!("SELECT {COLUMNS} FROM products WHERE TRUE"));
        if let Some(name) = &filter.product_name {
            query.push(" AND product_name = ").push_bind(name.clone());
        }
        if let Some(quantity) = filter.quantity {
            query.push(" AND quantity = ").push_bind(quantity);
        }
        query.push(" ORDER BY id");
        push_page(&mut query, page);

        let products = query
            .build_query_as::<Product>()
            .fetch_all(&self.pool)
            .await?;
        Ok(products)
    }

    async fn create(&self, product: &NewProduct) -> Result<Product, RepositoryError> {
        sqlx::query_as::<_, Product>(&format!(
            "INSERT INTO products (product_name, quantity) VALUES ($1, $2) RETURNING {COLUMNS}"
        ))
        .bind(&product.product_name)
        .bind(product.quantity)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "product"))
    }

    async fn update(
        &self,
        id: ProductId,
        patch: &ProductPatch,
    ) -> Result<Option<Product>, RepositoryError> {
        let mut query = QueryBuilder::new("UPDATE products SET updated_at = NOW()");
        if let Some(name) = patch.product_name.value() {
            query.push(", product_name = ").push_bind(name.clone());
        }
        if let Some(quantity) = patch.quantity.value() {
            query.push(", quantity = ").push_bind(*quantity);
        }
        query
            .push(" WHERE id = ")
            .push_bind(id)
            .push(format!(" RETURNING {COLUMNS}"));

        query
            .build_query_as::<Product>()
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_write_error(e, "product"))
    }

    async fn delete(&self, id: ProductId) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| map_write_error(e, "product"))?;
        Ok(())
    }
}
