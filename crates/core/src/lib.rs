//! Orderly Core - Shared domain types.
//!
//! This crate provides the types shared by every Orderly component:
//! - `server` - HTTP API and command worker
//! - `cli` - Migrations, report generation and command publishing
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Type-safe IDs, emails, partial-update fields and pagination

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
