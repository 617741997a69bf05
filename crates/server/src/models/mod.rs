//! Domain models for Orderly.
//!
//! Each entity has three shapes:
//!
//! - the persisted entity (`User`, `Product`, ...), which is also the JSON
//!   response body and the cached value
//! - a create input (`NewUser`, ...) holding every required field
//! - a partial update (`UserPatch`, ...) built from [`orderly_core::Patch`]
//!   fields so an absent key never overwrites a column
//!
//! List endpoints take an equality filter (`UserFilter`, ...) whose `None`
//! fields are ignored.

pub mod address;
pub mod order;
pub mod product;
pub mod report;
pub mod user;

pub use address::{Address, NewAddress};
pub use order::{
    ItemChange, NewOrder, NewOrderItem, Order, OrderChanges, OrderFilter, OrderItem,
    OrderItemPatch, OrderPatch,
};
pub use product::{NewProduct, Product, ProductFilter, ProductPatch};
pub use report::Report;
pub use user::{NewUser, User, UserFilter, UserPatch};
