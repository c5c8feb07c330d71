use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Router,
};
use uuid::Uuid;

use super::common::PaginationParams;
use crate::errors::ServiceError;
use crate::handlers::AppState;
use crate::services::inventory::{
    AdjustBatchRequest, BatchResponse, CreateProductRequest, ProductListResponse,
    ProductResponse, ReceiveBatchRequest,
};
use crate::ApiResponse;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route("/:id/batches", get(list_batches).post(receive_batch))
}

pub fn batches_router() -> Router<AppState> {
    Router::new().route("/:id/adjust", post(adjust_batch))
}

/// Add a product to the catalogue
#[utoipa::path(
    post,
    path = "/api/v1/products",
    request_body = CreateProductRequest,
    responses(
        (status = 201, description = "Product created", body = ApiResponse<ProductResponse>),
        (status = 400, description = "Validation failure", body = crate::errors::ErrorResponse)
    ),
    tag = "Inventory"
)]
pub async fn create_product(
    State(state): State<AppState>,
    Json(request): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ProductResponse>>), ServiceError> {
    let product = state.services.inventory.create_product(request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(product))))
}

/// List products
#[utoipa::path(
    get,
    path = "/api/v1/products",
    params(PaginationParams),
    responses(
        (status = 200, description = "Product page", body = ApiResponse<ProductListResponse>)
    ),
    tag = "Inventory"
)]
pub async fn list_products(
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> Result<Json<ApiResponse<ProductListResponse>>, ServiceError> {
    let page = state
        .services
        .inventory
        .list_products(params.page, params.per_page)
        .await?;
    Ok(Json(ApiResponse::ok(page)))
}

/// Receive a stock batch for a product
#[utoipa::path(
    post,
    path = "/api/v1/products/{id}/batches",
    request_body = ReceiveBatchRequest,
    responses(
        (status = 201, description = "Batch received", body = ApiResponse<BatchResponse>),
        (status = 404, description = "Unknown product", body = crate::errors::ErrorResponse)
    ),
    tag = "Inventory"
)]
pub async fn receive_batch(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<ReceiveBatchRequest>,
) -> Result<(StatusCode, Json<ApiResponse<BatchResponse>>), ServiceError> {
    let batch = state.services.inventory.receive_batch(id, request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(batch))))
}

/// Stock batches of a product, oldest first
#[utoipa::path(
    get,
    path = "/api/v1/products/{id}/batches",
    responses(
        (status = 200, description = "Batches", body = ApiResponse<Vec<BatchResponse>>),
        (status = 404, description = "Unknown product", body = crate::errors::ErrorResponse)
    ),
    tag = "Inventory"
)]
pub async fn list_batches(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<BatchResponse>>>, ServiceError> {
    let batches = state.services.inventory.list_batches(id).await?;
    Ok(Json(ApiResponse::ok(batches)))
}

/// Adjust remaining quantity of a batch
#[utoipa::path(
    post,
    path = "/api/v1/batches/{id}/adjust",
    request_body = AdjustBatchRequest,
    responses(
        (status = 200, description = "Adjusted batch", body = ApiResponse<BatchResponse>),
        (status = 422, description = "Would drive stock negative", body = crate::errors::ErrorResponse)
    ),
    tag = "Inventory"
)]
pub async fn adjust_batch(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<AdjustBatchRequest>,
) -> Result<Json<ApiResponse<BatchResponse>>, ServiceError> {
    let batch = state.services.inventory.adjust_batch(id, request).await?;
    Ok(Json(ApiResponse::ok(batch)))
}
