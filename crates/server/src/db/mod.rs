//! Store access layer.
//!
//! # Database: `orderly`
//!
//! ## Tables
//!
//! - `users` - Customers (email is unique)
//! - `addresses` - Shipping addresses, cascade-deleted with their user
//! - `products` - Catalogue and stock levels
//! - `orders` / `order_items` - Orders and their line items (cascade)
//! - `reports` - Nightly per-order unit counts
//!
//! Every entity is reached through an async trait (`UserStore`,
//! `ProductStore`, ...) so handlers and the worker hold `Arc<dyn ...>`
//! handles. Two backends implement them: the `PostgreSQL` repositories in
//! this module and [`memory::MemoryStore`].
//!
//! # Migrations
//!
//! Migrations are stored in `crates/server/migrations/` and run via:
//! ```bash
//! cargo run -p orderly-cli -- migrate
//! ```

pub mod addresses;
pub mod memory;
pub mod orders;
pub mod products;
pub mod reports;
pub mod users;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use secrecy::ExposeSecret;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, QueryBuilder};

use orderly_core::{AddressId, OrderId, Page, ProductId, UserId};

pub use addresses::AddressRepository;
pub use memory::MemoryStore;
pub use orders::OrderRepository;
pub use products::ProductRepository;
pub use reports::ReportRepository;
pub use users::UserRepository;

use crate::models::{
    Address, NewAddress, NewOrder, NewProduct, NewUser, Order, OrderChanges, OrderFilter, Product,
    ProductFilter, ProductPatch, Report, User, UserFilter, UserPatch,
};

/// Errors that can occur during store operations.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// Database query failed.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the store is invalid or corrupted.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// A uniqueness, foreign-key or check constraint was violated.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Stock fell below the requested quantity while the order was written.
    #[error(
        "insufficient stock for product {product_id}: requested {requested}, available {available}"
    )]
    InsufficientStock {
        product_id: ProductId,
        requested: i32,
        available: i32,
    },
}

/// Map a write failure, turning constraint violations into `Conflict`.
pub(crate) fn map_write_error(err: sqlx::Error, what: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = err {
        if db_err.is_unique_violation() {
            return RepositoryError::Conflict(format!("{what} already exists"));
        }
        if db_err.is_foreign_key_violation() {
            return RepositoryError::Conflict(format!("{what} is referenced by another record"));
        }
        if db_err.is_check_violation() {
            return RepositoryError::Conflict(format!("{what} violates a constraint"));
        }
    }
    RepositoryError::Database(err)
}

/// Append `LIMIT`/`OFFSET` for `page`; all rows when `None`.
pub(crate) fn push_page(query: &mut QueryBuilder<'_, Postgres>, page: Option<Page>) {
    if let Some(page) = page {
        query
            .push(" LIMIT ")
            .push_bind(i64::try_from(page.limit()).unwrap_or(i64::MAX))
            .push(" OFFSET ")
            .push_bind(i64::try_from(page.offset()).unwrap_or(i64::MAX));
    }
}

/// Create a `PostgreSQL` connection pool.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(
    database_url: &secrecy::SecretString,
    max_connections: u32,
) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// User persistence.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError>;

    /// Users matching every set field of `filter`, ordered by id.
    async fn get_by_filter(
        &self,
        filter: &UserFilter,
        page: Option<Page>,
    ) -> Result<Vec<User>, RepositoryError>;

    async fn create(&self, user: &NewUser) -> Result<User, RepositoryError>;

    /// Returns `None` if the user does not exist.
    async fn update(&self, id: UserId, patch: &UserPatch) -> Result<Option<User>, RepositoryError>;

    /// No-op if the user does not exist.
    async fn delete(&self, id: UserId) -> Result<(), RepositoryError>;
}

/// Product persistence.
#[async_trait]
pub trait ProductStore: Send + Sync {
    async fn get_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError>;

    /// Products matching every set field of `filter`, ordered by id.
    async fn get_by_filter(
        &self,
        filter: &ProductFilter,
        page: Option<Page>,
    ) -> Result<Vec<Product>, RepositoryError>;

    async fn create(&self, product: &NewProduct) -> Result<Product, RepositoryError>;

    /// Returns `None` if the product does not exist.
    async fn update(
        &self,
        id: ProductId,
        patch: &ProductPatch,
    ) -> Result<Option<Product>, RepositoryError>;

    /// No-op if the product does not exist.
    async fn delete(&self, id: ProductId) -> Result<(), RepositoryError>;
}

/// Order persistence. Orders are always loaded with their items.
#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn get_by_id(&self, id: OrderId) -> Result<Option<Order>, RepositoryError>;

    /// Orders matching every set field of `filter`, ordered by id.
    async fn get_by_filter(
        &self,
        filter: &OrderFilter,
        page: Option<Page>,
    ) -> Result<Vec<Order>, RepositoryError>;

    /// Persist the header and every item atomically.
    ///
    /// Stock is re-checked under a row lock; a product that no longer has
    /// enough units fails with [`RepositoryError::InsufficientStock`].
    async fn create(&self, order: &NewOrder) -> Result<Order, RepositoryError>;

    /// Apply header changes and upsert items atomically.
    ///
    /// Item patches naming an item of another order are ignored. Returns
    /// `None` if the order does not exist.
    async fn update(
        &self,
        id: OrderId,
        changes: &OrderChanges,
    ) -> Result<Option<Order>, RepositoryError>;

    /// Deletes the order and its items. No-op if the order does not exist.
    async fn delete(&self, id: OrderId) -> Result<(), RepositoryError>;
}

/// Address persistence.
#[async_trait]
pub trait AddressStore: Send + Sync {
    async fn get_by_id(&self, id: AddressId) -> Result<Option<Address>, RepositoryError>;

    /// Addresses of `user_id`, ordered by id.
    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Address>, RepositoryError>;

    async fn create(
        &self,
        user_id: UserId,
        address: &NewAddress,
    ) -> Result<Address, RepositoryError>;

    /// Orders shipping to the address keep existing with no address.
    async fn delete(&self, id: AddressId) -> Result<(), RepositoryError>;
}

/// Report persistence and aggregation.
#[async_trait]
pub trait ReportStore: Send + Sync {
    /// Report rows for `date`, ordered by id.
    async fn list_by_date(&self, date: NaiveDate) -> Result<Vec<Report>, RepositoryError>;

    /// Replace the rows for `date` with one row per order that has items,
    /// holding the summed item quantity. Returns the number of rows written.
    async fn generate(&self, date: NaiveDate) -> Result<u64, RepositoryError>;
}

/// Connectivity probe for readiness checks.
#[async_trait]
pub trait StoreHealth: Send + Sync {
    async fn ping(&self) -> Result<(), RepositoryError>;
}

#[async_trait]
impl StoreHealth for PgPool {
    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(self).await?;
        Ok(())
    }
}

/// One handle per entity store, all backed by the same database.
#[derive(Clone)]
pub struct Stores {
    pub users: Arc<dyn UserStore>,
    pub products: Arc<dyn ProductStore>,
    pub orders: Arc<dyn OrderStore>,
    pub addresses: Arc<dyn AddressStore>,
    pub reports: Arc<dyn ReportStore>,
    pub health: Arc<dyn StoreHealth>,
}

impl Stores {
    /// `PostgreSQL`-backed stores sharing `pool`.
    #[must_use]
    pub fn postgres(pool: &PgPool) -> Self {
        Self {
            users: Arc::new(UserRepository::new(pool.clone())),
            products: Arc::new(ProductRepository::new(pool.clone())),
            orders: Arc::new(OrderRepository::new(pool.clone())),
            addresses: Arc::new(AddressRepository::new(pool.clone())),
            reports: Arc::new(ReportRepository::new(pool.clone())),
            health: Arc::new(pool.clone()),
        }
    }

    /// Stores sharing one in-memory backend.
    #[must_use]
    pub fn memory(store: &Arc<MemoryStore>) -> Self {
        Self {
            users: store.clone(),
            products: store.clone(),
            orders: store.clone(),
            addresses: store.clone(),
            reports: store.clone(),
            health: store.clone(),
        }
    }
}
