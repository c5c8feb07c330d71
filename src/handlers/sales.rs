use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Router,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::handlers::AppState;
use crate::reconcile::PaymentStatus;
use crate::services::reconciliation::{
    CreateSaleRequest, PaymentResponse, RecordPaymentRequest, SaleResponse,
};
use crate::ApiResponse;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StatusResponse {
    pub status: PaymentStatus,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OverrideStatusRequest {
    pub status: PaymentStatus,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_sale))
        .route("/:id", get(get_sale))
        .route("/:id/status", get(get_status).put(override_status))
        .route("/:id/payments", get(list_payments).post(record_payment))
}

/// Finalize a sale for a caterer
#[utoipa::path(
    post,
    path = "/api/v1/sales",
    request_body = CreateSaleRequest,
    responses(
        (status = 201, description = "Sale created with zero payments", body = ApiResponse<SaleResponse>),
        (status = 400, description = "Invalid amounts or empty line items", body = crate::errors::ErrorResponse),
        (status = 404, description = "Unknown caterer", body = crate::errors::ErrorResponse)
    ),
    tag = "Sales"
)]
pub async fn create_sale(
    State(state): State<AppState>,
    Json(request): Json<CreateSaleRequest>,
) -> Result<(StatusCode, Json<ApiResponse<SaleResponse>>), ServiceError> {
    let sale = state.services.reconciliation.create_sale(request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(sale))))
}

/// Fetch a sale with its line items
#[utoipa::path(
    get,
    path = "/api/v1/sales/{id}",
    responses(
        (status = 200, description = "Sale", body = ApiResponse<SaleResponse>),
        (status = 404, description = "Unknown sale", body = crate::errors::ErrorResponse)
    ),
    tag = "Sales"
)]
pub async fn get_sale(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<SaleResponse>>, ServiceError> {
    let sale = state.services.reconciliation.get_sale(id).await?;
    Ok(Json(ApiResponse::ok(sale)))
}

/// Effective payment status of a sale
#[utoipa::path(
    get,
    path = "/api/v1/sales/{id}/status",
    responses(
        (status = 200, description = "Derived or explicit status", body = ApiResponse<StatusResponse>),
        (status = 404, description = "Unknown sale", body = crate::errors::ErrorResponse)
    ),
    tag = "Sales"
)]
pub async fn get_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<StatusResponse>>, ServiceError> {
    let status = state.services.reconciliation.get_bill_status(id).await?;
    Ok(Json(ApiResponse::ok(StatusResponse { status })))
}

/// Store an explicit status override (e.g. overdue)
#[utoipa::path(
    put,
    path = "/api/v1/sales/{id}/status",
    request_body = OverrideStatusRequest,
    responses(
        (status = 200, description = "Stored status", body = ApiResponse<StatusResponse>),
        (status = 400, description = "Paid sales are terminal", body = crate::errors::ErrorResponse),
        (status = 404, description = "Unknown sale", body = crate::errors::ErrorResponse)
    ),
    tag = "Sales"
)]
pub async fn override_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<OverrideStatusRequest>,
) -> Result<Json<ApiResponse<StatusResponse>>, ServiceError> {
    let status = state
        .services
        .reconciliation
        .override_status(id, request.status)
        .await?;
    Ok(Json(ApiResponse::ok(StatusResponse { status })))
}

/// Record a payment against a sale
#[utoipa::path(
    post,
    path = "/api/v1/sales/{id}/payments",
    request_body = RecordPaymentRequest,
    responses(
        (status = 201, description = "Payment recorded, summary recomputed", body = ApiResponse<PaymentResponse>),
        (status = 400, description = "Non-positive or malformed amount", body = crate::errors::ErrorResponse),
        (status = 404, description = "Unknown sale", body = crate::errors::ErrorResponse)
    ),
    tag = "Payments"
)]
pub async fn record_payment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<RecordPaymentRequest>,
) -> Result<(StatusCode, Json<ApiResponse<PaymentResponse>>), ServiceError> {
    let payment = state
        .services
        .reconciliation
        .record_payment(id, request)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(payment))))
}

/// Payment history of a sale
#[utoipa::path(
    get,
    path = "/api/v1/sales/{id}/payments",
    responses(
        (status = 200, description = "Payments oldest first", body = ApiResponse<Vec<PaymentResponse>>),
        (status = 404, description = "Unknown sale", body = crate::errors::ErrorResponse)
    ),
    tag = "Payments"
)]
pub async fn list_payments(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<PaymentResponse>>>, ServiceError> {
    let payments = state.services.reconciliation.list_payments(id).await?;
    Ok(Json(ApiResponse::ok(payments)))
}
