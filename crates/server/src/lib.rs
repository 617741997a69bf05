//! Orderly server library.
//!
//! Order management over HTTP and a Redis command queue. This crate provides
//! both binaries' functionality as a library, allowing it to be tested and
//! reused.
//!
//! # Layers
//!
//! - `routes` / `worker` - HTTP handlers and queue consumers
//! - `services` - Business rules, shared by both entry points
//! - `cache` - Cache-aside decorators for user and product stores
//! - `db` - Store traits with `PostgreSQL` and in-memory backends

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod shutdown;
pub mod state;
pub mod telemetry;
pub mod worker;
