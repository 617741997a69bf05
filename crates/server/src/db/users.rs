//! User repository for database operations.

use async_trait::async_trait;
use sqlx::{PgPool, QueryBuilder};

use orderly_core::{Page, UserId};

use super::{RepositoryError, UserStore, map_write_error, push_page};
use crate::models::{NewUser, User, UserFilter, UserPatch};

const COLUMNS: &str = "id, username, email, description";

/// Repository for user database operations.
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for UserRepository {
    async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let user = sqlx::query_as::<_, User>(&format!("SELECT {COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn get_by_filter(
        &self,
        filter: &UserFilter,
        page: Option<Page>,
    ) -> Result<Vec<User>, RepositoryError> {
        let mut query = QueryBuilder::new(format!("SELECT {COLUMNS} FROM users WHERE TRUE"));
        if let Some(username) = &filter.username {
            query.push(" AND username = ").push_bind(username.clone());
        }
        if let Some(email) = &filter.email {
            query.push(" AND email = ").push_bind(email.clone());
        }
        query.push(" ORDER BY id");
        push_page(&mut query, page);

        let users = query.build_query_as::<User>().fetch_all(&self.pool).await?;
        Ok(users)
    }

    async fn create(&self, user: &NewUser) -> Result<User, RepositoryError> {
        sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (username, email, description) VALUES ($1, $2, $3) \
             RETURNING {COLUMNS}"
        ))
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.description)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "user"))
    }

    async fn update(&self, id: UserId, patch: &UserPatch) -> Result<Option<User>, RepositoryError> {
        let mut query = QueryBuilder::new("UPDATE users SET updated_at = NOW()");
        if let Some(username) = patch.username.value() {
            query.push(", username = ").push_bind(username.clone());
        }
        if let Some(email) = patch.email.value() {
            query.push(", email = ").push_bind(email.clone());
        }
        if let Some(description) = patch.description.clone().into_option() {
            query.push(", description = ").push_bind(description);
        }
        query
            .push(" WHERE id = ")
            .push_bind(id)
            .push(format!(" RETURNING {COLUMNS}"));

        query
            .build_query_as::<User>()
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_write_error(e, "user"))
    }

    async fn delete(&self, id: UserId) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| map_write_error(e, "user"))?;
        Ok(())
    }
}
