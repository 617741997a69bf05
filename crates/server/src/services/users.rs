//! User service.

use std::sync::Arc;

use tracing::{info, instrument};

use orderly_core::{Page, Patch, UserId};

use super::{ServiceError, ValidationError};
use crate::db::UserStore;
use crate::models::{NewUser, User, UserFilter, UserPatch};

/// User operations. Reads and writes go through the cache-aside store.
#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn UserStore>,
}

impl UserService {
    #[must_use]
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self { store }
    }

    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the user does not exist.
    pub async fn get(&self, id: UserId) -> Result<User, ServiceError> {
        self.store
            .get_by_id(id)
            .await?
            .ok_or(ServiceError::NotFound("user"))
    }

    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the store fails.
    pub async fn list(&self, filter: &UserFilter, page: Page) -> Result<Vec<User>, ServiceError> {
        Ok(self.store.get_by_filter(filter, Some(page)).await?)
    }

    /// Register a user.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::DuplicateEmail` if the email is taken.
    #[instrument(skip(self, new), fields(email = %new.email))]
    pub async fn create(&self, new: NewUser) -> Result<User, ServiceError> {
        self.ensure_email_free(&new.email, None).await?;

        let user = self.store.create(&new).await?;
        info!(user_id = %user.id, "Created user");
        Ok(user)
    }

    /// Apply a partial update.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::NullField` for a `null` username or email,
    /// `ValidationError::DuplicateEmail` if the new email belongs to another
    /// user, and `ServiceError::NotFound` if the user does not exist.
    #[instrument(skip(self, patch))]
    pub async fn update(&self, id: UserId, patch: UserPatch) -> Result<User, ServiceError> {
        if patch.username.is_null() {
            return Err(ValidationError::NullField("username").into());
        }
        match &patch.email {
            Patch::Null => return Err(ValidationError::NullField("email").into()),
            Patch::Value(email) => self.ensure_email_free(email, Some(id)).await?,
            Patch::Absent => {}
        }

        let user = self
            .store
            .update(id, &patch)
            .await?
            .ok_or(ServiceError::NotFound("user"))?;
        info!(user_id = %user.id, "Updated user");
        Ok(user)
    }

    /// Delete a user. Deleting a missing user succeeds.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::Conflict` if the user still has orders.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: UserId) -> Result<(), ServiceError> {
        self.store.delete(id).await?;
        info!(user_id = %id, "Deleted user");
        Ok(())
    }

    async fn ensure_email_free(
        &self,
        email: &orderly_core::Email,
        owner: Option<UserId>,
    ) -> Result<(), ServiceError> {
        let filter = UserFilter {
            username: None,
            email: Some(email.clone()),
        };
        let taken = self
            .store
            .get_by_filter(&filter, None)
            .await?
            .iter()
            .any(|u| Some(u.id) != owner);
        if taken {
            return Err(ValidationError::DuplicateEmail(email.to_string()).into());
        }
        Ok(())
    }
}
