//! Application state shared across handlers.

use std::sync::Arc;

use crate::cache::KeyValueCache;
use crate::db::{StoreHealth, Stores};
use crate::services::Services;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to the
/// services and the store health probe.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    services: Services,
    health: Arc<dyn StoreHealth>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `stores` - Entity stores (`PostgreSQL` or in-memory)
    /// * `cache` - Backend for the user and product cache
    #[must_use]
    pub fn new(stores: &Stores, cache: Arc<dyn KeyValueCache>) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                services: Services::new(stores, cache),
                health: stores.health.clone(),
            }),
        }
    }

    /// Get a reference to the services.
    #[must_use]
    pub fn services(&self) -> &Services {
        &self.inner.services
    }

    /// Get a reference to the store health probe.
    #[must_use]
    pub fn health(&self) -> &dyn StoreHealth {
        self.inner.health.as_ref()
    }
}
