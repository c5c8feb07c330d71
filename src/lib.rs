//! CaterBill API Library
//!
//! Core functionality for the CaterBill catering/billing backend: caterer
//! accounts, sales, payments, inventory batches, receipt images and the
//! balance reconciliation engine that keeps caterer summaries consistent
//! with their transactional history.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod money;
pub mod openapi;
pub mod reconcile;
pub mod services;

use axum::Router;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;

use crate::db::DbPool;

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DbPool>,
    pub config: config::AppConfig,
    pub services: handlers::AppServices,
}

/// Envelope every successful JSON response is wrapped in.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }

    pub fn with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: Some(message.into()),
        }
    }
}

/// Assembles the full application router. Middleware layers (trace, cors,
/// compression, timeouts) are attached by the binary entry point.
pub fn app(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1/caterers", handlers::caterers::router())
        .nest("/api/v1/sales", handlers::sales::router())
        .nest("/api/v1/payments", handlers::payments::router())
        .nest("/api/v1/receipts", handlers::receipts::router())
        .nest("/api/v1/products", handlers::products::router())
        .nest("/api/v1/batches", handlers::products::batches_router())
        .nest("/health", handlers::health::router())
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", openapi::ApiDoc::openapi()))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_response_skips_absent_message() {
        let body = serde_json::to_value(ApiResponse::ok(42)).unwrap();
        assert_eq!(body["success"], true);
        assert_eq!(body["data"], 42);
        assert!(body.get("message").is_none());
    }

    #[test]
    fn api_response_keeps_message_when_set() {
        let body = serde_json::to_value(ApiResponse::with_message((), "done")).unwrap();
        assert_eq!(body["message"], "done");
    }
}
