//! Core types for Orderly.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod page;
pub mod patch;

pub use email::{Email, EmailError};
pub use id::*;
pub use page::{Page, PageError};
pub use patch::Patch;
