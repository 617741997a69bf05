//! Business logic services.
//!
//! # Services
//!
//! - `users` - User CRUD with unique-email checks (cache-aside reads)
//! - `products` - Product CRUD with name and stock checks (cache-aside reads)
//! - `orders` - The order workflow: validates users, addresses, products and
//!   stock before the order store writes anything
//! - `addresses` - Per-user shipping addresses
//! - `reports` - Nightly per-order unit counts
//!
//! Services are shared by the HTTP handlers and the command worker, so both
//! paths enforce the same rules.

pub mod addresses;
pub mod orders;
pub mod products;
pub mod reports;
pub mod users;

use std::sync::Arc;

use thiserror::Error;

use orderly_core::{AddressId, EmailError, PageError, ProductId, UserId};

pub use addresses::AddressService;
pub use orders::OrderService;
pub use products::ProductService;
pub use reports::ReportService;
pub use users::UserService;

use crate::cache::{CachedProductStore, CachedUserStore, KeyValueCache};
use crate::db::{ProductStore, RepositoryError, Stores, UserStore};

/// A request that breaks a business rule. Reported to the caller as-is.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("user {0} does not exist")]
    UserNotFound(UserId),

    #[error("product {0} does not exist")]
    ProductNotFound(ProductId),

    #[error("address {0} does not exist")]
    AddressNotFound(AddressId),

    #[error(
        "insufficient stock for product {product_id}: requested {requested}, available {available}"
    )]
    InsufficientStock {
        product_id: ProductId,
        requested: i32,
        available: i32,
    },

    #[error("a product named {0:?} already exists")]
    DuplicateName(String),

    #[error("a user with email {0} already exists")]
    DuplicateEmail(String),

    #[error("quantity cannot be negative, got {0}")]
    NegativeQuantity(i32),

    #[error("item quantity must be at least 1, got {0}")]
    InvalidQuantity(i32),

    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    #[error("{0} cannot be null")]
    NullField(&'static str),

    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("invalid page: {0}")]
    InvalidPage(#[from] PageError),

    /// A store constraint rejected the write.
    #[error("{0}")]
    Conflict(String),
}

/// Errors returned by services.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The entity addressed by the operation does not exist.
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Unexpected store failure.
    #[error("repository error: {0}")]
    Repository(RepositoryError),
}

impl ServiceError {
    /// Returns `true` for errors caused by the request rather than the system.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::Validation(_))
    }
}

impl From<RepositoryError> for ServiceError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Conflict(msg) => Self::Validation(ValidationError::Conflict(msg)),
            RepositoryError::InsufficientStock {
                product_id,
                requested,
                available,
            } => Self::Validation(ValidationError::InsufficientStock {
                product_id,
                requested,
                available,
            }),
            other => Self::Repository(other),
        }
    }
}

impl From<EmailError> for ServiceError {
    fn from(err: EmailError) -> Self {
        Self::Validation(err.into())
    }
}

impl From<PageError> for ServiceError {
    fn from(err: PageError) -> Self {
        Self::Validation(err.into())
    }
}

/// Every service, wired to one set of stores and one cache.
#[derive(Clone)]
pub struct Services {
    pub users: UserService,
    pub products: ProductService,
    pub orders: OrderService,
    pub addresses: AddressService,
    pub reports: ReportService,
}

impl Services {
    /// Wire services over `stores`, with user and product reads going
    /// through `cache`.
    #[must_use]
    pub fn new(stores: &Stores, cache: Arc<dyn KeyValueCache>) -> Self {
        let users: Arc<dyn UserStore> =
            Arc::new(CachedUserStore::new(stores.users.clone(), cache.clone()));
        let products: Arc<dyn ProductStore> =
            Arc::new(CachedProductStore::new(stores.products.clone(), cache));

        Self {
            users: UserService::new(users.clone()),
            products: ProductService::new(products),
            // Stock checks read products uncached
            orders: OrderService::new(
                stores.orders.clone(),
                users.clone(),
                stores.products.clone(),
                stores.addresses.clone(),
            ),
            addresses: AddressService::new(stores.addresses.clone(), users),
            reports: ReportService::new(stores.reports.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_conflicts_become_validation_errors() {
        let err = ServiceError::from(RepositoryError::Conflict("user already exists".to_owned()));
        assert!(err.is_client_error());
        assert_eq!(err.to_string(), "user already exists");
    }

    #[test]
    fn test_store_failures_are_not_client_errors() {
        let err = ServiceError::from(RepositoryError::DataCorruption("bad row".to_owned()));
        assert!(!err.is_client_error());
    }

    #[test]
    fn test_stock_race_keeps_its_numbers() {
        let err = ServiceError::from(RepositoryError::InsufficientStock {
            product_id: ProductId::new(1),
            requested: 10,
            available: 5,
        });
        assert!(matches!(
            err,
            ServiceError::Validation(ValidationError::InsufficientStock {
                requested: 10,
                available: 5,
                ..
            })
        ));
    }
}
