mod common;

use axum::http::{Method, StatusCode};
use common::{parse_id, TestApp};
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
async fn create_and_fetch_caterer() {
    let app = TestApp::new().await;

    let (status, body) = app
        .request(
            Method::POST,
            "/api/v1/caterers",
            Some(json!({
                "name": "Golden Spoon",
                "contact_name": "Priya",
                "email": "priya@goldenspoon.example",
                "phone": "+91-98000-00000",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let id = parse_id(&body["data"]["id"]);
    assert_eq!(body["data"]["version"], 1);
    assert_eq!(body["data"]["balance_due"], "0.00");

    let (status, body) = app
        .request(Method::GET, &format!("/api/v1/caterers/{id}"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "Golden Spoon");
    assert_eq!(body["data"]["contact_name"], "Priya");
}

#[tokio::test]
async fn create_rejects_blank_name_and_bad_email() {
    let app = TestApp::new().await;

    let (status, _) = app
        .request(Method::POST, "/api/v1/caterers", Some(json!({ "name": "" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .request(
            Method::POST,
            "/api/v1/caterers",
            Some(json!({ "name": "Ok", "email": "not-an-email" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn get_unknown_caterer_is_404() {
    let app = TestApp::new().await;
    let (status, _) = app
        .request(
            Method::GET,
            &format!("/api/v1/caterers/{}", Uuid::new_v4()),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn list_paginates_and_searches_by_name() {
    let app = TestApp::new().await;
    for name in ["Alpha Catering", "Beta Catering", "Alpine Events"] {
        app.create_caterer(name).await;
    }

    let (status, body) = app
        .request(Method::GET, "/api/v1/caterers?page=1&per_page=2", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["caterers"].as_array().unwrap().len(), 2);
    assert_eq!(body["data"]["total"], 3);

    let (_, body) = app
        .request(Method::GET, "/api/v1/caterers?search=Alp", None)
        .await;
    assert_eq!(body["data"]["total"], 2);
}

#[tokio::test]
async fn update_bumps_version_and_detects_conflicts() {
    let app = TestApp::new().await;
    let id = app.create_caterer("Stale Bread").await;

    let (status, body) = app
        .request(
            Method::PUT,
            &format!("/api/v1/caterers/{id}"),
            Some(json!({ "name": "Fresh Bread", "version": 1 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["name"], "Fresh Bread");
    assert_eq!(body["data"]["version"], 2);

    // Replaying the old version must not clobber the newer write.
    let (status, _) = app
        .request(
            Method::PUT,
            &format!("/api/v1/caterers/{id}"),
            Some(json!({ "name": "Older Bread", "version": 1 })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, body) = app
        .request(Method::GET, &format!("/api/v1/caterers/{id}"), None)
        .await;
    assert_eq!(body["data"]["name"], "Fresh Bread");
}

#[tokio::test]
async fn delete_is_blocked_while_sales_exist() {
    let app = TestApp::new().await;
    let id = app.create_caterer("Bound Caterer").await;
    app.create_sale(id, "10.00", 1).await;

    let (status, _) = app
        .request(Method::DELETE, &format!("/api/v1/caterers/{id}"), None)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Still there.
    let (status, _) = app
        .request(Method::GET, &format!("/api/v1/caterers/{id}"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn delete_without_sales_succeeds() {
    let app = TestApp::new().await;
    let id = app.create_caterer("Free Agent").await;

    let (status, _) = app
        .request(Method::DELETE, &format!("/api/v1/caterers/{id}"), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app
        .request(Method::GET, &format!("/api/v1/caterers/{id}"), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
