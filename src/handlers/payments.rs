use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use bytes::Bytes;
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::handlers::AppState;
use crate::services::reconciliation::PaymentResponse;
use crate::ApiResponse;

pub fn router() -> Router<AppState> {
    Router::new().route("/:id/receipt", post(upload_receipt))
}

/// Upload a receipt image and attach it to a payment.
///
/// The raw image is the request body; its type comes from the Content-Type
/// header. Only jpeg/png/gif/webp up to the configured size cap are accepted.
#[utoipa::path(
    post,
    path = "/api/v1/payments/{id}/receipt",
    request_body(content = Vec<u8>, content_type = "image/png"),
    responses(
        (status = 201, description = "Receipt stored and attached", body = ApiResponse<PaymentResponse>),
        (status = 404, description = "Unknown payment", body = crate::errors::ErrorResponse),
        (status = 415, description = "Wrong type or too large", body = crate::errors::ErrorResponse)
    ),
    tag = "Payments"
)]
pub async fn upload_receipt(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<ApiResponse<PaymentResponse>>), ServiceError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ServiceError::UnsupportedMedia("missing content type".to_string()))?
        .to_string();

    // Refuse before writing anything; a 404 must not leave an orphaned
    // file behind.
    state.services.reconciliation.ensure_payment(id).await?;
    let reference = state.services.receipts.store(&body, &content_type).await?;
    let payment = state
        .services
        .reconciliation
        .attach_receipt(id, reference)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(payment))))
}
