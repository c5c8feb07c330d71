use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::db::DbPool;
use crate::entities::{inventory_batch, product};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::money::MoneyValue;

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateProductRequest {
    #[validate(length(min = 1, max = 64, message = "SKU is required"))]
    pub sku: String,
    #[validate(length(min = 1, max = 200, message = "Name is required"))]
    pub name: String,
    pub unit_price: Decimal,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct ReceiveBatchRequest {
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: i32,
    pub unit_cost: Decimal,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AdjustBatchRequest {
    /// Signed quantity change; negative consumes stock
    pub delta: i32,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProductResponse {
    pub id: Uuid,
    pub sku: String,
    pub name: String,
    pub unit_price: MoneyValue,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<product::Model> for ProductResponse {
    type Error = ServiceError;

    fn try_from(row: product::Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            sku: row.sku,
            name: row.name,
            unit_price: MoneyValue::try_from(row.unit_price)?,
            is_active: row.is_active,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BatchResponse {
    pub id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_cost: MoneyValue,
    pub received_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl TryFrom<inventory_batch::Model> for BatchResponse {
    type Error = ServiceError;

    fn try_from(row: inventory_batch::Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            product_id: row.product_id,
            quantity: row.quantity,
            unit_cost: MoneyValue::try_from(row.unit_cost)?,
            received_at: row.received_at,
            expires_at: row.expires_at,
        })
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProductListResponse {
    pub products: Vec<ProductResponse>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

/// Product catalogue and batch-level stock tracking.
#[derive(Clone)]
pub struct InventoryService {
    db: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

impl InventoryService {
    pub fn new(db: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self { db, event_sender }
    }

    async fn emit(&self, event: Event) {
        if let Some(sender) = &self.event_sender {
            sender.send(event).await;
        }
    }

    #[instrument(skip(self, request))]
    pub async fn create_product(
        &self,
        request: CreateProductRequest,
    ) -> Result<ProductResponse, ServiceError> {
        request.validate()?;
        let unit_price = MoneyValue::try_from(request.unit_price)?;
        if unit_price.is_negative() {
            return Err(ServiceError::InvalidAmount(
                "unit price must not be negative".to_string(),
            ));
        }

        let row = product::ActiveModel {
            id: Set(Uuid::new_v4()),
            sku: Set(request.sku),
            name: Set(request.name),
            unit_price: Set(unit_price.to_decimal()),
            is_active: Set(request.is_active),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
        }
        .insert(&*self.db)
        .await?;

        info!(product_id = %row.id, sku = %row.sku, "product created");
        self.emit(Event::ProductCreated(row.id)).await;
        ProductResponse::try_from(row)
    }

    pub async fn list_products(
        &self,
        page: u64,
        per_page: u64,
    ) -> Result<ProductListResponse, ServiceError> {
        let per_page = per_page.clamp(1, 100);
        let paginator = product::Entity::find()
            .order_by_asc(product::Column::Sku)
            .paginate(&*self.db, per_page);
        let total = paginator.num_items().await?;
        let rows = paginator.fetch_page(page.saturating_sub(1)).await?;

        let mut products = Vec::with_capacity(rows.len());
        for row in rows {
            products.push(ProductResponse::try_from(row)?);
        }
        Ok(ProductListResponse {
            products,
            total,
            page,
            per_page,
        })
    }

    #[instrument(skip(self, request), fields(product_id = %product_id))]
    pub async fn receive_batch(
        &self,
        product_id: Uuid,
        request: ReceiveBatchRequest,
    ) -> Result<BatchResponse, ServiceError> {
        request.validate()?;
        let unit_cost = MoneyValue::try_from(request.unit_cost)?;
        if unit_cost.is_negative() {
            return Err(ServiceError::InvalidAmount(
                "unit cost must not be negative".to_string(),
            ));
        }

        product::Entity::find_by_id(product_id)
            .one(&*self.db)
            .await?
            .ok_or(ServiceError::ProductNotFound(product_id))?;

        let now = Utc::now();
        let row = inventory_batch::ActiveModel {
            id: Set(Uuid::new_v4()),
            product_id: Set(product_id),
            quantity: Set(request.quantity),
            unit_cost: Set(unit_cost.to_decimal()),
            received_at: Set(now),
            expires_at: Set(request.expires_at),
            created_at: Set(now),
            updated_at: Set(None),
        }
        .insert(&*self.db)
        .await?;

        info!(batch_id = %row.id, quantity = row.quantity, "batch received");
        self.emit(Event::BatchReceived {
            batch_id: row.id,
            product_id,
        })
        .await;
        BatchResponse::try_from(row)
    }

    /// Applies a signed quantity change. A batch can never go below zero
    /// remaining stock.
    #[instrument(skip(self))]
    pub async fn adjust_batch(
        &self,
        batch_id: Uuid,
        request: AdjustBatchRequest,
    ) -> Result<BatchResponse, ServiceError> {
        let row = inventory_batch::Entity::find_by_id(batch_id)
            .one(&*self.db)
            .await?
            .ok_or(ServiceError::BatchNotFound(batch_id))?;

        let next = row.quantity.checked_add(request.delta).ok_or_else(|| {
            ServiceError::ValidationError("quantity adjustment overflows".to_string())
        })?;
        if next < 0 {
            return Err(ServiceError::InsufficientStock(format!(
                "batch {batch_id} holds {} units, cannot remove {}",
                row.quantity,
                request.delta.unsigned_abs()
            )));
        }

        let mut active: inventory_batch::ActiveModel = row.into();
        active.quantity = Set(next);
        active.updated_at = Set(Some(Utc::now()));
        let updated = active.update(&*self.db).await?;

        self.emit(Event::BatchAdjusted {
            batch_id,
            delta: request.delta,
        })
        .await;
        BatchResponse::try_from(updated)
    }

    pub async fn list_batches(
        &self,
        product_id: Uuid,
    ) -> Result<Vec<BatchResponse>, ServiceError> {
        product::Entity::find_by_id(product_id)
            .one(&*self.db)
            .await?
            .ok_or(ServiceError::ProductNotFound(product_id))?;

        let rows = inventory_batch::Entity::find()
            .filter(inventory_batch::Column::ProductId.eq(product_id))
            .order_by_asc(inventory_batch::Column::ReceivedAt)
            .all(&*self.db)
            .await?;
        let mut batches = Vec::with_capacity(rows.len());
        for row in rows {
            batches.push(BatchResponse::try_from(row)?);
        }
        Ok(batches)
    }
}
