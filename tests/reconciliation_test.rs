mod common;

use axum::http::{Method, StatusCode};
use common::TestApp;
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
async fn schema_bootstraps_on_sqlite_and_reports_ready() {
    // Table creation from the entity definitions, money columns included,
    // must work on SQLite since that is the default backend.
    let app = TestApp::new().await;
    let (status, body) = app.request(Method::GET, "/health/ready", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["database"], "up");
}

#[tokio::test]
async fn new_caterer_has_empty_summary() {
    let app = TestApp::new().await;
    let caterer = app.create_caterer("Sunrise Caterers").await;

    let (status, body) = app
        .request(
            Method::GET,
            &format!("/api/v1/caterers/{caterer}/summary"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let summary = &body["data"];
    assert_eq!(summary["total_orders"], 0);
    assert_eq!(summary["total_amount"], "0.00");
    assert_eq!(summary["balance_due"], "0.00");
    assert!(summary["last_order_date"].is_null());
}

#[tokio::test]
async fn sale_starts_pending_and_updates_summary() {
    let app = TestApp::new().await;
    let caterer = app.create_caterer("Harvest Table").await;
    let sale = app.create_sale(caterer, "250.00", 4).await;

    let (status, body) = app
        .request(Method::GET, &format!("/api/v1/sales/{sale}/status"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "pending");

    let (_, body) = app
        .request(
            Method::GET,
            &format!("/api/v1/caterers/{caterer}/summary"),
            None,
        )
        .await;
    let summary = &body["data"];
    assert_eq!(summary["total_orders"], 1);
    assert_eq!(summary["total_amount"], "1000.00");
    assert_eq!(summary["balance_due"], "1000.00");
    assert!(!summary["last_order_date"].is_null());
}

#[tokio::test]
async fn payments_walk_pending_partial_paid() {
    let app = TestApp::new().await;
    let caterer = app.create_caterer("Fig & Thyme").await;
    let sale = app.create_sale(caterer, "500.00", 2).await;

    let body = app.pay(sale, "400.00").await;
    assert_eq!(body["data"]["sale_status"], "partial");

    let body = app.pay(sale, "600.00").await;
    assert_eq!(body["data"]["sale_status"], "paid");

    let (_, body) = app
        .request(
            Method::GET,
            &format!("/api/v1/caterers/{caterer}/summary"),
            None,
        )
        .await;
    assert_eq!(body["data"]["balance_due"], "0.00");
}

#[tokio::test]
async fn overpayment_clamps_to_paid_and_goes_negative() {
    let app = TestApp::new().await;
    let caterer = app.create_caterer("Brass Kettle").await;
    let sale = app.create_sale(caterer, "100.00", 1).await;

    let body = app.pay(sale, "150.00").await;
    assert_eq!(body["data"]["sale_status"], "paid");

    let (_, body) = app
        .request(
            Method::GET,
            &format!("/api/v1/caterers/{caterer}/summary"),
            None,
        )
        .await;
    // Credit: paid more than billed.
    assert_eq!(body["data"]["balance_due"], "-50.00");
}

#[tokio::test]
async fn non_positive_or_sub_cent_payments_are_rejected() {
    let app = TestApp::new().await;
    let caterer = app.create_caterer("Olive Branch").await;
    let sale = app.create_sale(caterer, "100.00", 1).await;

    for amount in ["0.00", "-5.00", "1.005"] {
        let (status, body) = app
            .request(
                Method::POST,
                &format!("/api/v1/sales/{sale}/payments"),
                Some(json!({ "amount": amount, "payment_method": "cash" })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "accepted {amount}: {body}");
    }

    // Nothing was applied.
    let (_, body) = app
        .request(
            Method::GET,
            &format!("/api/v1/caterers/{caterer}/summary"),
            None,
        )
        .await;
    assert_eq!(body["data"]["balance_due"], "100.00");
}

#[tokio::test]
async fn payment_against_unknown_sale_is_404() {
    let app = TestApp::new().await;
    let (status, _) = app
        .request(
            Method::POST,
            &format!("/api/v1/sales/{}/payments", Uuid::new_v4()),
            Some(json!({ "amount": "10.00", "payment_method": "cash" })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn explicit_overdue_wins_over_derived_status() {
    let app = TestApp::new().await;
    let caterer = app.create_caterer("Slow Oven").await;
    let sale = app.create_sale(caterer, "300.00", 1).await;
    app.pay(sale, "100.00").await;

    let (status, body) = app
        .request(
            Method::PUT,
            &format!("/api/v1/sales/{sale}/status"),
            Some(json!({ "status": "overdue" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let (_, body) = app
        .request(Method::GET, &format!("/api/v1/sales/{sale}/status"), None)
        .await;
    assert_eq!(body["data"]["status"], "overdue");
}

#[tokio::test]
async fn payment_response_reflects_stored_explicit_status() {
    let app = TestApp::new().await;
    let caterer = app.create_caterer("Late Lunch").await;
    let sale = app.create_sale(caterer, "200.00", 1).await;

    let (status, _) = app
        .request(
            Method::PUT,
            &format!("/api/v1/sales/{sale}/status"),
            Some(json!({ "status": "overdue" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    // The explicit status, not the derived one, echoes back with the payment.
    let body = app.pay(sale, "50.00").await;
    assert_eq!(body["data"]["sale_status"], "overdue");
}

#[tokio::test]
async fn paid_sale_status_is_terminal() {
    let app = TestApp::new().await;
    let caterer = app.create_caterer("Last Course").await;
    let sale = app.create_sale(caterer, "50.00", 1).await;
    app.pay(sale, "50.00").await;

    let (status, _) = app
        .request(
            Method::PUT,
            &format!("/api/v1/sales/{sale}/status"),
            Some(json!({ "status": "overdue" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn charges_and_discounts_shape_the_grand_total() {
    let app = TestApp::new().await;
    let caterer = app.create_caterer("Copper Pot").await;

    let (status, body) = app
        .request(
            Method::POST,
            "/api/v1/sales",
            Some(json!({
                "caterer_id": caterer,
                "line_items": [
                    { "description": "buffet", "quantity": 10, "unit_price": "45.00" },
                    { "description": "staff", "quantity": 3, "unit_price": "80.00" },
                ],
                "charges": "60.00",
                "discounts": "75.50",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    // 450 + 240 + 60 - 75.50
    assert_eq!(body["data"]["grand_total"], "674.50");
}

#[tokio::test]
async fn discounts_exceeding_the_bill_are_rejected() {
    let app = TestApp::new().await;
    let caterer = app.create_caterer("Small Plates").await;

    let (status, _) = app
        .request(
            Method::POST,
            "/api/v1/sales",
            Some(json!({
                "caterer_id": caterer,
                "line_items": [
                    { "description": "tea", "quantity": 1, "unit_price": "5.00" },
                ],
                "discounts": "10.00",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn cent_payments_accumulate_exactly() {
    let app = TestApp::new().await;
    let caterer = app.create_caterer("Penny Jar").await;
    let sale = app.create_sale(caterer, "0.25", 1).await;

    for _ in 0..25 {
        app.pay(sale, "0.01").await;
    }

    let (_, body) = app
        .request(Method::GET, &format!("/api/v1/sales/{sale}/status"), None)
        .await;
    assert_eq!(body["data"]["status"], "paid");

    let (_, body) = app
        .request(
            Method::GET,
            &format!("/api/v1/caterers/{caterer}/summary?recompute=true"),
            None,
        )
        .await;
    assert_eq!(body["data"]["balance_due"], "0.00");
}

#[tokio::test]
async fn concurrent_payments_on_one_caterer_lose_nothing() {
    let app = TestApp::new().await;
    let caterer = app.create_caterer("Two Burners").await;
    let first = app.create_sale(caterer, "200.00", 1).await;
    let second = app.create_sale(caterer, "300.00", 1).await;

    let svc = app.state.services.reconciliation.clone();
    let pay = |sale_id| {
        let svc = svc.clone();
        async move {
            svc.record_payment(
                sale_id,
                serde_json::from_value(json!({
                    "amount": "50.00",
                    "payment_method": "cash",
                }))
                .unwrap(),
            )
            .await
        }
    };

    let (a, b) = tokio::join!(pay(first), pay(second));
    a.unwrap();
    b.unwrap();

    let summary = svc.get_caterer_summary(caterer, true).await.unwrap();
    assert_eq!(summary.total_amount.to_display_string(), "500.00");
    assert_eq!(summary.balance_due.to_display_string(), "400.00");
    assert_eq!(summary.total_orders, 2);
}

#[tokio::test]
async fn recompute_converges_with_cached_summary() {
    let app = TestApp::new().await;
    let caterer = app.create_caterer("Same Answer").await;
    let sale = app.create_sale(caterer, "120.00", 2).await;
    app.pay(sale, "40.00").await;

    let (_, cached) = app
        .request(
            Method::GET,
            &format!("/api/v1/caterers/{caterer}/summary"),
            None,
        )
        .await;
    let (_, fresh) = app
        .request(
            Method::GET,
            &format!("/api/v1/caterers/{caterer}/summary?recompute=true"),
            None,
        )
        .await;
    assert_eq!(cached["data"], fresh["data"]);
}

#[tokio::test]
async fn sale_listing_reports_effective_statuses() {
    let app = TestApp::new().await;
    let caterer = app.create_caterer("Mixed Bag").await;
    let paid = app.create_sale(caterer, "10.00", 1).await;
    let _open = app.create_sale(caterer, "20.00", 1).await;
    app.pay(paid, "10.00").await;

    let (status, body) = app
        .request(
            Method::GET,
            &format!("/api/v1/caterers/{caterer}/sales"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let sales = body["data"].as_array().unwrap();
    assert_eq!(sales.len(), 2);
    let statuses: Vec<&str> = sales
        .iter()
        .map(|s| s["status"].as_str().unwrap())
        .collect();
    assert!(statuses.contains(&"paid"));
    assert!(statuses.contains(&"pending"));
}
