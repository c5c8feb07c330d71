use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    routing::get,
    Router,
};
use serde::Deserialize;
use uuid::Uuid;

use super::common::PaginationParams;
use crate::errors::ServiceError;
use crate::handlers::AppState;
use crate::reconcile::CatererSummary;
use crate::services::caterers::{
    CatererListResponse, CatererResponse, CreateCatererRequest, UpdateCatererRequest,
};
use crate::services::reconciliation::SaleResponse;
use crate::ApiResponse;

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct SummaryQuery {
    /// Force a fresh recompute instead of trusting the cached summary
    #[serde(default)]
    pub recompute: bool,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_caterers).post(create_caterer))
        .route(
            "/:id",
            get(get_caterer).put(update_caterer).delete(delete_caterer),
        )
        .route("/:id/summary", get(get_summary))
        .route("/:id/sales", get(list_sales))
}

/// Create a caterer
#[utoipa::path(
    post,
    path = "/api/v1/caterers",
    request_body = CreateCatererRequest,
    responses(
        (status = 201, description = "Caterer created", body = ApiResponse<CatererResponse>),
        (status = 400, description = "Validation failure", body = crate::errors::ErrorResponse)
    ),
    tag = "Caterers"
)]
pub async fn create_caterer(
    State(state): State<AppState>,
    Json(request): Json<CreateCatererRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CatererResponse>>), ServiceError> {
    let caterer = state.services.caterers.create(request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(caterer))))
}

/// List caterers
#[utoipa::path(
    get,
    path = "/api/v1/caterers",
    params(PaginationParams),
    responses(
        (status = 200, description = "Caterer page", body = ApiResponse<CatererListResponse>)
    ),
    tag = "Caterers"
)]
pub async fn list_caterers(
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> Result<Json<ApiResponse<CatererListResponse>>, ServiceError> {
    let page = state
        .services
        .caterers
        .list(params.page, params.per_page, params.search)
        .await?;
    Ok(Json(ApiResponse::ok(page)))
}

/// Fetch one caterer
#[utoipa::path(
    get,
    path = "/api/v1/caterers/{id}",
    responses(
        (status = 200, description = "Caterer", body = ApiResponse<CatererResponse>),
        (status = 404, description = "Unknown caterer", body = crate::errors::ErrorResponse)
    ),
    tag = "Caterers"
)]
pub async fn get_caterer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<CatererResponse>>, ServiceError> {
    let caterer = state.services.caterers.get(id).await?;
    Ok(Json(ApiResponse::ok(caterer)))
}

/// Update a caterer profile (optimistic, version-checked)
#[utoipa::path(
    put,
    path = "/api/v1/caterers/{id}",
    request_body = UpdateCatererRequest,
    responses(
        (status = 200, description = "Updated caterer", body = ApiResponse<CatererResponse>),
        (status = 409, description = "Version conflict", body = crate::errors::ErrorResponse)
    ),
    tag = "Caterers"
)]
pub async fn update_caterer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateCatererRequest>,
) -> Result<Json<ApiResponse<CatererResponse>>, ServiceError> {
    let caterer = state.services.caterers.update(id, request).await?;
    Ok(Json(ApiResponse::ok(caterer)))
}

/// Delete a caterer with no sales history
#[utoipa::path(
    delete,
    path = "/api/v1/caterers/{id}",
    responses(
        (status = 204, description = "Caterer deleted"),
        (status = 409, description = "Caterer still has sales", body = crate::errors::ErrorResponse)
    ),
    tag = "Caterers"
)]
pub async fn delete_caterer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServiceError> {
    state.services.caterers.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Balance summary, cached or freshly recomputed
#[utoipa::path(
    get,
    path = "/api/v1/caterers/{id}/summary",
    params(SummaryQuery),
    responses(
        (status = 200, description = "Caterer summary", body = ApiResponse<CatererSummary>),
        (status = 404, description = "Unknown caterer", body = crate::errors::ErrorResponse)
    ),
    tag = "Caterers"
)]
pub async fn get_summary(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<SummaryQuery>,
) -> Result<Json<ApiResponse<CatererSummary>>, ServiceError> {
    let summary = state
        .services
        .reconciliation
        .get_caterer_summary(id, query.recompute)
        .await?;
    Ok(Json(ApiResponse::ok(summary)))
}

/// Sales of one caterer, newest first
#[utoipa::path(
    get,
    path = "/api/v1/caterers/{id}/sales",
    responses(
        (status = 200, description = "Sales with effective statuses", body = ApiResponse<Vec<SaleResponse>>),
        (status = 404, description = "Unknown caterer", body = crate::errors::ErrorResponse)
    ),
    tag = "Caterers"
)]
pub async fn list_sales(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<SaleResponse>>>, ServiceError> {
    let sales = state.services.reconciliation.list_sales(id).await?;
    Ok(Json(ApiResponse::ok(sales)))
}
