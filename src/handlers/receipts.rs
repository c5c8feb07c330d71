use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};

use crate::errors::ServiceError;
use crate::handlers::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/:file", get(fetch_receipt))
}

fn content_type_for(file: &str) -> &'static str {
    match file.rsplit('.').next() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}

/// Serve a stored receipt image by its path reference.
#[utoipa::path(
    get,
    path = "/api/v1/receipts/{file}",
    responses(
        (status = 200, description = "Receipt image bytes"),
        (status = 415, description = "Bad reference or no such receipt", body = crate::errors::ErrorResponse)
    ),
    tag = "Payments"
)]
pub async fn fetch_receipt(
    State(state): State<AppState>,
    Path(file): Path<String>,
) -> Result<Response, ServiceError> {
    let bytes = state.services.receipts.load(&file).await?;
    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, content_type_for(&file))],
        bytes,
    )
        .into_response())
}
