//! Report generation and `GET /report`.

use chrono::NaiveDate;
use reqwest::StatusCode;
use serde_json::json;

use orderly_integration_tests::{TestApp, expect_json};

#[tokio::test]
async fn test_generate_then_read() {
    let app = TestApp::spawn().await;
    app.create_user("Alex", "a@x.com").await;
    app.create_product("Widget", 5).await;
    app.create_product("Gadget", 5).await;
    app.post(
        "/orders",
        &json!({
            "user_id": 1,
            "items": [
                { "product_id": 1, "quantity": 2 },
                { "product_id": 2, "quantity": 3 }
            ]
        }),
    )
    .await;

    let date = NaiveDate::from_ymd_opt(2025, 1, 31).expect("valid date");
    // Regenerating replaces the day's rows.
    app.services.reports.generate(date).await.expect("generate");
    let rows = app.services.reports.generate(date).await.expect("generate");
    assert_eq!(rows, 1);

    let reports = expect_json(app.get("/report?date=2025-01-31").await, StatusCode::OK).await;
    assert_eq!(reports.as_array().map(Vec::len), Some(1));
    assert_eq!(reports[0]["order_id"], 1);
    assert_eq!(reports[0]["count_product"], 5);
    assert_eq!(reports[0]["report_at"], "2025-01-31");

    let other_day = expect_json(app.get("/report?date=2025-02-01").await, StatusCode::OK).await;
    assert_eq!(other_day, json!([]));
}

#[tokio::test]
async fn test_orders_without_items_are_not_reported() {
    let app = TestApp::spawn().await;
    app.create_user("Alex", "a@x.com").await;
    app.create_product("Widget", 5).await;
    for items in [json!([]), json!([{ "product_id": 1, "quantity": 1 }])] {
        let resp = app.post("/orders", &json!({ "user_id": 1, "items": items })).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
    }

    let date = NaiveDate::from_ymd_opt(2025, 1, 31).expect("valid date");
    let rows = app.services.reports.generate(date).await.expect("generate");
    assert_eq!(rows, 1);

    let reports = expect_json(app.get("/report?date=2025-01-31").await, StatusCode::OK).await;
    assert_eq!(reports[0]["order_id"], 2);
    assert_eq!(reports[0]["count_product"], 1);
}

#[tokio::test]
async fn test_date_is_required() {
    let app = TestApp::spawn().await;
    assert_eq!(app.get("/report").await.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        app.get("/report?date=yesterday").await.status(),
        StatusCode::BAD_REQUEST
    );
}
