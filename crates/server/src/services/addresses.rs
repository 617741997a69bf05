//! Address service.

use std::sync::Arc;

use tracing::{info, instrument};

use orderly_core::{AddressId, UserId};

use super::ServiceError;
use crate::db::{AddressStore, UserStore};
use crate::models::{Address, NewAddress};

/// Shipping addresses, always scoped to an existing user.
#[derive(Clone)]
pub struct AddressService {
    store: Arc<dyn AddressStore>,
    users: Arc<dyn UserStore>,
}

impl AddressService {
    #[must_use]
    pub fn new(store: Arc<dyn AddressStore>, users: Arc<dyn UserStore>) -> Self {
        Self { store, users }
    }

    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the user does not exist.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Address>, ServiceError> {
        self.require_user(user_id).await?;
        Ok(self.store.list_for_user(user_id).await?)
    }

    /// Add an address. A new primary address demotes the previous one.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the user does not exist.
    #[instrument(skip(self, new))]
    pub async fn create(&self, user_id: UserId, new: NewAddress) -> Result<Address, ServiceError> {
        self.require_user(user_id).await?;
        let address = self.store.create(user_id, &new).await?;
        info!(address_id = %address.id, "Created address");
        Ok(address)
    }

    /// Delete an address. Orders shipping there keep no address.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the store fails.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: AddressId) -> Result<(), ServiceError> {
        self.store.delete(id).await?;
        info!(address_id = %id, "Deleted address");
        Ok(())
    }

    async fn require_user(&self, user_id: UserId) -> Result<(), ServiceError> {
        if self.users.get_by_id(user_id).await?.is_none() {
            return Err(ServiceError::NotFound("user"));
        }
        Ok(())
    }
}
