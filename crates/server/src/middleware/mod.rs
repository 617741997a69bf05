//! HTTP middleware stack.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, added by the binary)
//! 2. Timeout (408 after 30 seconds)
//! 3. `TraceLayer` (request span with method, uri, status, latency)
//! 4. Request ID (recorded in the span and the Sentry scope)

pub mod request_id;

pub use request_id::request_id_middleware;
