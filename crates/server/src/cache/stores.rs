//! Cache-aside decorators for the user and product stores.

use std::sync::Arc;

use async_trait::async_trait;

use orderly_core::{Page, ProductId, UserId};

use super::{CacheAside, KeyValueCache, PRODUCT_TTL, USER_TTL};
use crate::db::{ProductStore, RepositoryError, UserStore};
use crate::models::{NewProduct, NewUser, Product, ProductFilter, ProductPatch, User, UserFilter, UserPatch};

/// [`UserStore`] that serves `get_by_id` from the cache when it can.
pub struct CachedUserStore {
    inner: Arc<dyn UserStore>,
    cache: CacheAside,
}

impl CachedUserStore {
    #[must_use]
    pub fn new(inner: Arc<dyn UserStore>, cache: Arc<dyn KeyValueCache>) -> Self {
        Self {
            inner,
            cache: CacheAside::new(cache, "user", USER_TTL),
        }
    }
}

#[async_trait]
impl UserStore for CachedUserStore {
    async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        if let Some(user) = self.cache.get(id).await {
            return Ok(Some(user));
        }
        let user = self.inner.get_by_id(id).await?;
        if let Some(user) = &user {
            self.cache.put(id, user).await;
        }
        Ok(user)
    }

    async fn get_by_filter(
        &self,
        filter: &UserFilter,
        page: Option<Page>,
    ) -> Result<Vec<User>, RepositoryError> {
        self.inner.get_by_filter(filter, page).await
    }

    async fn create(&self, user: &NewUser) -> Result<User, RepositoryError> {
        let created = self.inner.create(user).await?;
        self.cache.put(created.id, &created).await;
        Ok(created)
    }

    async fn update(&self, id: UserId, patch: &UserPatch) -> Result<Option<User>, RepositoryError> {
        let updated = self.inner.update(id, patch).await?;
        if updated.is_some() {
            self.cache.invalidate(id).await;
        }
        Ok(updated)
    }

    async fn delete(&self, id: UserId) -> Result<(), RepositoryError> {
        let result = self.inner.delete(id).await;
        self.cache.invalidate(id).await;
        result
    }
}

/// [`ProductStore`] that serves `get_by_id` from the cache when it can.
pub struct CachedProductStore {
    inner: Arc<dyn ProductStore>,
    cache: CacheAside,
}

impl CachedProductStore {
    #[must_use]
    pub fn new(inner: Arc<dyn ProductStore>, cache: Arc<dyn KeyValueCache>) -> Self {
        Self {
            inner,
            cache: CacheAside::new(cache, "product", PRODUCT_TTL),
        }
    }
}

#[async_trait]
impl ProductStore for CachedProductStore {
    async fn get_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        if let Some(product) = self.cache.get(id).await {
            return Ok(Some(product));
        }
        let product = self.inner.get_by_id(id).await?;
        if let Some(product) = &product {
            self.cache.put(id, product).await;
        }
        Ok(product)
    }

    async fn get_by_filter(
        &self,
        filter: &ProductFilter,
        page: Option<Page>,
    ) -> Result<Vec<Product>, RepositoryError> {
        self.inner.get_by_filter(filter, page).await
    }

    async fn create(&self, product: &NewProduct) -> Result<Product, RepositoryError> {
        let created = self.inner.create(product).await?;
        self.cache.put(created.id, &created).await;
        Ok(created)
    }

    async fn update(
        &self,
        id: ProductId,
        patch: &ProductPatch,
    ) -> Result<Option<Product>, RepositoryError> {
        let updated = self.inner.update(id, patch).await?;
        if updated.is_some() {
            self.cache.invalidate(id).await;
        }
        Ok(updated)
    }

    async fn delete(&self, id: ProductId) -> Result<(), RepositoryError> {
        let result = self.inner.delete(id).await;
        self.cache.invalidate(id).await;
        result
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use orderly_core::Email;

    use super::*;
    use crate::cache::LocalCache;
    use crate::db::MemoryStore;

    fn setup() -> (Arc<MemoryStore>, Arc<LocalCache>) {
        (Arc::new(MemoryStore::new()), Arc::new(LocalCache::new()))
    }

    #[tokio::test]
    async fn test_second_read_skips_the_store() {
        let (store, cache) = setup();
        let created = ProductStore::create(
            store.as_ref(),
            &NewProduct {
                product_name: "Widget".to_owned(),
                quantity: 5,
            },
        )
        .await
        .unwrap();
        let products = CachedProductStore::new(store.clone(), cache);

        let first = products.get_by_id(created.id).await.unwrap();
        let second = products.get_by_id(created.id).await.unwrap();

        assert_eq!(first, Some(created));
        assert_eq!(first, second);
        assert_eq!(store.product_reads(), 1);
    }

    #[tokio::test]
    async fn test_create_populates_cache() {
        let (store, cache) = setup();
        let users = CachedUserStore::new(store.clone(), cache.clone());
        let created = users
            .create(&NewUser {
                username: "Alex".to_owned(),
                email: Email::parse("a@x.com").unwrap(),
                description: None,
            })
            .await
            .unwrap();

        assert!(cache.get("user:1").await.unwrap().is_some());
        assert_eq!(users.get_by_id(created.id).await.unwrap(), Some(created));
        assert_eq!(store.user_reads(), 0);
    }

    #[tokio::test]
    async fn test_update_invalidates() {
        let (store, cache) = setup();
        let products = CachedProductStore::new(store.clone(), cache.clone());
        let created = products
            .create(&NewProduct {
                product_name: "Widget".to_owned(),
                quantity: 5,
            })
            .await
            .unwrap();

        products
            .update(created.id, &ProductPatch::quantity(2))
            .await
            .unwrap();
        assert!(cache.get("product:1").await.unwrap().is_none());

        let fresh = products.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(fresh.quantity, 2);
        assert_eq!(store.product_reads(), 1);
    }

    #[tokio::test]
    async fn test_delete_invalidates_missing_ids_too() {
        let (store, cache) = setup();
        cache
            .set("product:9", "{}".to_owned(), PRODUCT_TTL)
            .await
            .unwrap();
        let products = CachedProductStore::new(store, cache.clone());

        products.delete(ProductId::new(9)).await.unwrap();
        assert!(cache.get("product:9").await.unwrap().is_none());
    }
}
