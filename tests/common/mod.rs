use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use caterbill_api::{config::AppConfig, db, events, handlers::AppServices, AppState};

/// Test harness: the full application router over a fresh in-memory SQLite
/// database and a temporary receipt directory.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    _receipt_dir: tempfile::TempDir,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    pub async fn new() -> Self {
        let receipt_dir = tempfile::tempdir().expect("temp dir");

        let cfg = AppConfig {
            database_url: "sqlite::memory:".to_string(),
            // One connection so every query sees the same in-memory database.
            db_max_connections: 1,
            db_min_connections: 1,
            receipt_dir: receipt_dir.path().to_string_lossy().into_owned(),
            environment: "test".to_string(),
            ..Default::default()
        };

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("connect");
        db::create_schema(&pool).await.expect("schema");
        let pool = Arc::new(pool);

        let (event_sender, event_rx) = events::channel(64);
        let event_task = tokio::spawn(events::process_events(event_rx));

        let services = AppServices::new(pool.clone(), Arc::new(event_sender), &cfg);
        let state = AppState {
            db: pool,
            config: cfg,
            services,
        };
        let router = caterbill_api::app(state.clone());

        Self {
            router,
            state,
            _receipt_dir: receipt_dir,
            _event_task: event_task,
        }
    }

    /// Sends a JSON request and returns status plus parsed body.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).expect("request"))
            .await
            .expect("response");

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    /// Sends a raw-bytes request (used for receipt uploads).
    pub async fn request_bytes(
        &self,
        method: Method,
        uri: &str,
        content_type: &str,
        body: Vec<u8>,
    ) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, content_type)
            .body(Body::from(body))
            .expect("request");
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("response");

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    /// Fetches raw bytes (used to read receipts back).
    pub async fn get_raw(&self, uri: &str) -> (StatusCode, Vec<u8>) {
        let request = Request::builder()
            .method(Method::GET)
            .uri(uri)
            .body(Body::empty())
            .expect("request");
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("response");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        (status, bytes.to_vec())
    }

    /// Creates a caterer and returns its id.
    pub async fn create_caterer(&self, name: &str) -> Uuid {
        let (status, body) = self
            .request(
                Method::POST,
                "/api/v1/caterers",
                Some(serde_json::json!({ "name": name })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "caterer create failed: {body}");
        parse_id(&body["data"]["id"])
    }

    /// Creates a single-line sale and returns its id.
    pub async fn create_sale(&self, caterer_id: Uuid, unit_price: &str, quantity: i32) -> Uuid {
        let (status, body) = self
            .request(
                Method::POST,
                "/api/v1/sales",
                Some(serde_json::json!({
                    "caterer_id": caterer_id,
                    "line_items": [{
                        "description": "event catering",
                        "quantity": quantity,
                        "unit_price": unit_price,
                    }],
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "sale create failed: {body}");
        parse_id(&body["data"]["id"])
    }

    /// Records a payment over the API and asserts it succeeded.
    pub async fn pay(&self, sale_id: Uuid, amount: &str) -> Value {
        let (status, body) = self
            .request(
                Method::POST,
                &format!("/api/v1/sales/{sale_id}/payments"),
                Some(serde_json::json!({
                    "amount": amount,
                    "payment_method": "bank_transfer",
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "payment failed: {body}");
        body
    }
}

pub fn parse_id(value: &Value) -> Uuid {
    value
        .as_str()
        .and_then(|s| Uuid::parse_str(s).ok())
        .unwrap_or_else(|| panic!("not a uuid: {value}"))
}
