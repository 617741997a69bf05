//! Product endpoints, pagination and the read cache.

use std::collections::BTreeSet;

use reqwest::StatusCode;
use serde_json::json;

use orderly_integration_tests::{TestApp, expect_json, expect_rejection};

#[tokio::test]
async fn test_pages_are_disjoint_and_complete() {
    let app = TestApp::spawn().await;
    for i in 1..=10 {
        app.create_product(&format!("Product{i}"), i).await;
    }

    let first = expect_json(app.get("/products?count=5&page=1").await, StatusCode::OK).await;
    let second = expect_json(app.get("/products?count=5&page=2").await, StatusCode::OK).await;

    let ids = |page: &serde_json::Value| -> BTreeSet<i64> {
        page.as_array()
            .into_iter()
            .flatten()
            .filter_map(|p| p["id"].as_i64())
            .collect()
    };
    let (first, second) = (ids(&first), ids(&second));

    assert_eq!(first.len(), 5);
    assert_eq!(second.len(), 5);
    assert!(first.is_disjoint(&second));
    assert_eq!(first.union(&second).copied().collect::<Vec<_>>(), (1..=10).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_zero_page_is_rejected() {
    let app = TestApp::spawn().await;
    expect_rejection(app.get("/products?page=0").await, "invalid page").await;
    expect_rejection(app.get("/products?count=0").await, "invalid page").await;
}

#[tokio::test]
async fn test_negative_and_duplicate_products() {
    let app = TestApp::spawn().await;
    app.create_product("Widget", 5).await;

    let resp = app
        .post("/products", &json!({ "product_name": "Gadget", "quantity": -1 }))
        .await;
    expect_rejection(resp, "negative").await;

    let resp = app
        .post("/products", &json!({ "product_name": "Widget", "quantity": 1 }))
        .await;
    expect_rejection(resp, "already exists").await;
}

#[tokio::test]
async fn test_second_read_is_served_from_cache() {
    let app = TestApp::spawn().await;
    app.create_product("Widget", 5).await;
    let reads = app.store.product_reads();

    for _ in 0..2 {
        let product = expect_json(app.get("/products/1").await, StatusCode::OK).await;
        assert_eq!(product["product_name"], "Widget");
    }

    assert_eq!(app.store.product_reads(), reads);
}

#[tokio::test]
async fn test_update_is_visible_through_cache() {
    let app = TestApp::spawn().await;
    app.create_product("Widget", 5).await;
    app.get("/products/1").await;

    let updated = expect_json(
        app.put("/products/1", &json!({ "quantity": 2 })).await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(updated["quantity"], 2);

    let fetched = expect_json(app.get("/products/1").await, StatusCode::OK).await;
    assert_eq!(fetched["quantity"], 2);
}

#[tokio::test]
async fn test_missing_product() {
    let app = TestApp::spawn().await;
    assert_eq!(app.get("/products/7").await.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        app.put("/products/7", &json!({ "quantity": 1 })).await.status(),
        StatusCode::NOT_FOUND
    );
    assert_eq!(app.delete("/products/7").await.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_health() {
    let app = TestApp::spawn().await;
    let resp = app.get("/health").await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.headers().contains_key("x-request-id"));
    assert_eq!(app.get("/health/ready").await.status(), StatusCode::OK);
}
