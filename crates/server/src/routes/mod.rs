//! HTTP route definitions.
//!
//! # Routes
//!
//! ```text
//! GET    /health                  Liveness
//! GET    /health/ready            Database ping
//!
//! GET    /users?count&page        List users (username, email filters)
//! POST   /users                   Create user
//! GET    /users/{id}              Get user
//! PUT    /users/{id}              Update user
//! DELETE /users/{id}              Delete user
//! GET    /users/{id}/addresses    List a user's addresses
//! POST   /users/{id}/addresses    Add an address
//! DELETE /addresses/{id}          Delete address
//!
//! GET    /products?count&page     List products (product_name filter)
//! POST   /products                Create product
//! GET    /products/{id}           Get product
//! PUT    /products/{id}           Update product
//! DELETE /products/{id}           Delete product
//!
//! GET    /orders?count&page       List orders
//! GET    /orders/u/{user_id}      List a user's orders
//! POST   /orders                  Create order
//! GET    /orders/{id}             Get order
//! PUT    /orders/{id}             Update order
//! DELETE /orders/{id}             Delete order
//!
//! GET    /report?date=YYYY-MM-DD  Report rows for a day
//! ```

pub mod addresses;
pub mod orders;
pub mod products;
pub mod reports;
pub mod users;

use std::time::Duration;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    routing::{delete, get},
};
use serde::Deserialize;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

use orderly_core::Page;

use crate::middleware::request_id_middleware;
use crate::services::ValidationError;
use crate::state::AppState;

/// Upper bound on handling a single request.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// `count` and `page` query parameters of list endpoints.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageQuery {
    pub count: Option<u32>,
    pub page: Option<u32>,
}

impl PageQuery {
    /// Defaults to page 1 of 10 rows.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidPage` if either value is zero.
    pub fn page(self) -> Result<Page, ValidationError> {
        Ok(Page::new(
            self.page.unwrap_or(1),
            self.count.unwrap_or(Page::DEFAULT_COUNT),
        )?)
    }
}

/// Build the API routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(users::list).post(users::create))
        .route(
            "/users/{id}",
            get(users::show).put(users::update).delete(users::destroy),
        )
        .route(
            "/users/{id}/addresses",
            get(addresses::list).post(addresses::create),
        )
        .route("/addresses/{id}", delete(addresses::destroy))
        .route("/products", get(products::list).post(products::create))
        .route(
            "/products/{id}",
            get(products::show)
                .put(products::update)
                .delete(products::destroy),
        )
        .route("/orders", get(orders::list).post(orders::create))
        .route("/orders/u/{user_id}", get(orders::list_for_user))
        .route(
            "/orders/{id}",
            get(orders::show).put(orders::update).delete(orders::destroy),
        )
        .route("/report", get(reports::list))
}

/// Build the full application: health checks, API routes and the
/// tracing, request-id and timeout middleware.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .merge(routes())
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>, latency: Duration, span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .with_state(state)
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the database is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.health().ping().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

#[cfg(test)]
mod tests {
    use orderly_core::PageError;

    use super::*;

    #[test]
    fn test_page_defaults() {
        let page = PageQuery::default().page();
        assert_eq!(page, Ok(Page::default()));
    }

    #[test]
    fn test_page_zero_is_invalid() {
        let query = PageQuery {
            count: Some(0),
            page: None,
        };
        assert_eq!(
            query.page(),
            Err(ValidationError::InvalidPage(PageError::CountTooSmall))
        );
    }
}
