//! Integration tests for Orderly.
//!
//! Each test boots the full HTTP application on an ephemeral port, backed by
//! the in-memory store and an in-process cache, and talks to it over real
//! HTTP with `reqwest`. No database or Redis is needed.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p orderly-integration-tests
//! ```

use std::net::SocketAddr;
use std::sync::Arc;

use reqwest::{Client, Response, StatusCode};
use serde_json::{Value, json};

use orderly_server::cache::{KeyValueCache, LocalCache};
use orderly_server::db::{MemoryStore, Stores};
use orderly_server::routes;
use orderly_server::services::Services;
use orderly_server::state::AppState;

/// A running server plus handles on its backing store.
pub struct TestApp {
    pub client: Client,
    pub addr: SocketAddr,
    pub store: Arc<MemoryStore>,
    /// Services sharing the server's store and cache, as the worker would.
    pub services: Services,
}

impl TestApp {
    /// Boot the application on `127.0.0.1:0`.
    ///
    /// # Panics
    ///
    /// Panics if the listener cannot be bound.
    pub async fn spawn() -> Self {
        let store = Arc::new(MemoryStore::new());
        let stores = Stores::memory(&store);
        let cache: Arc<dyn KeyValueCache> = Arc::new(LocalCache::new());

        let app = routes::app(AppState::new(&stores, cache.clone()));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("Listener has no address");
        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        Self {
            client: Client::new(),
            addr,
            store,
            services: Services::new(&stores, cache),
        }
    }

    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    /// # Panics
    ///
    /// Panics if the request cannot be sent.
    pub async fn get(&self, path: &str) -> Response {
        self.client
            .get(self.url(path))
            .send()
            .await
            .expect("GET failed")
    }

    /// # Panics
    ///
    /// Panics if the request cannot be sent.
    pub async fn post(&self, path: &str, body: &Value) -> Response {
        self.client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .expect("POST failed")
    }

    /// # Panics
    ///
    /// Panics if the request cannot be sent.
    pub async fn put(&self, path: &str, body: &Value) -> Response {
        self.client
            .put(self.url(path))
            .json(body)
            .send()
            .await
            .expect("PUT failed")
    }

    /// # Panics
    ///
    /// Panics if the request cannot be sent.
    pub async fn delete(&self, path: &str) -> Response {
        self.client
            .delete(self.url(path))
            .send()
            .await
            .expect("DELETE failed")
    }

    /// Create a user and return its JSON.
    ///
    /// # Panics
    ///
    /// Panics unless the server answers `201 Created`.
    pub async fn create_user(&self, username: &str, email: &str) -> Value {
        let resp = self
            .post("/users", &json!({ "username": username, "email": email }))
            .await;
        expect_json(resp, StatusCode::CREATED).await
    }

    /// Create a product and return its JSON.
    ///
    /// # Panics
    ///
    /// Panics unless the server answers `201 Created`.
    pub async fn create_product(&self, name: &str, quantity: i32) -> Value {
        let resp = self
            .post(
                "/products",
                &json!({ "product_name": name, "quantity": quantity }),
            )
            .await;
        expect_json(resp, StatusCode::CREATED).await
    }
}

/// Assert the status and decode the JSON body.
///
/// # Panics
///
/// Panics if the status differs or the body is not JSON.
pub async fn expect_json(resp: Response, status: StatusCode) -> Value {
    let actual = resp.status();
    let body: Value = resp.json().await.expect("Response body is not JSON");
    assert_eq!(actual, status, "unexpected status, body: {body}");
    body
}

/// Assert a `400` whose error message contains `needle`.
///
/// # Panics
///
/// Panics if the status is not `400` or the message does not match.
pub async fn expect_rejection(resp: Response, needle: &str) {
    let body = expect_json(resp, StatusCode::BAD_REQUEST).await;
    let message = body["error"].as_str().unwrap_or_default();
    assert!(
        message.contains(needle),
        "expected error containing {needle:?}, got {message:?}"
    );
}
