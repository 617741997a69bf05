//! Address repository for database operations.

use async_trait::async_trait;
use sqlx::PgPool;

use orderly_core::{AddressId, UserId};

use super::{AddressStore, RepositoryError, map_write_error};
use crate::models::{Address, NewAddress};

const COLUMNS: &str = "id, user_id, street, city, state, zip_code, country, is_primary";

/// Repository for address database operations.
#[derive(Clone)]
pub struct AddressRepository {
    pool: PgPool,
}

impl AddressRepository {
    /// Create a new address repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AddressStore for AddressRepository {
    async fn get_by_id(&self, id: AddressId) -> Result<Option<Address>, RepositoryError> {
        let address =
            sqlx::query_as::<_, Address>(&format!("SELECT {COLUMNS} FROM addresses WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(address)
    }

    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Address>, RepositoryError> {
        let addresses = sqlx::query_as::<_, Address>(&format!(
            "SELECT {COLUMNS} FROM addresses WHERE user_id = $1 ORDER BY id"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(addresses)
    }

    async fn create(
        &self,
        user_id: UserId,
        address: &NewAddress,
    ) -> Result<Address, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        // A user has at most one primary address
        if address.is_primary {
            sqlx::query("UPDATE addresses SET is_primary = FALSE, updated_at = NOW() WHERE user_id = $1 AND is_primary")
                .bind(user_id)
                .execute(&mut *tx)
                .await?;
        }

        let created = sqlx::query_as::<_, Address>(&format!(
            "INSERT INTO addresses (user_id, street, city, state, zip_code, country, is_primary) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {COLUMNS}"
        ))
        .bind(user_id)
        .bind(&address.street)
        .bind(&address.city)
        .bind(&address.state)
        .bind(&address.zip_code)
        .bind(&address.country)
        .bind(address.is_primary)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_write_error(e, "address"))?;

        tx.commit().await?;
        Ok(created)
    }

    async fn delete(&self, id: AddressId) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM addresses WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
