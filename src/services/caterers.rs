use chrono::{DateTime, Utc};
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
use crate::entities::{caterer, sale};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::money::MoneyValue;

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateCatererRequest {
    #[validate(length(min = 1, max = 120, message = "Name is required"))]
    pub name: String,
    pub contact_name: Option<String>,
    pub phone: Option<String>,
    #[validate(email(message = "Invalid email address"))]
    pub email: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
}

/// Profile update. `version` must match the stored row; a mismatch means
/// another writer got there first.
#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateCatererRequest {
    #[validate(length(min = 1, max = 120, message = "Name is required"))]
    pub name: Option<String>,
    pub contact_name: Option<String>,
    pub phone: Option<String>,
    #[validate(email(message = "Invalid email address"))]
    pub email: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
    pub version: i32,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CatererResponse {
    pub id: Uuid,
    pub name: String,
    pub contact_name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
    pub balance_due: MoneyValue,
    pub total_orders: i64,
    pub total_amount: MoneyValue,
    pub last_order_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub version: i32,
}

impl TryFrom<caterer::Model> for CatererResponse {
    type Error = ServiceError;

    fn try_from(row: caterer::Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            name: row.name,
            contact_name: row.contact_name,
            phone: row.phone,
            email: row.email,
            address: row.address,
            notes: row.notes,
            balance_due: MoneyValue::try_from(row.balance_due)?,
            total_orders: row.total_orders,
            total_amount: MoneyValue::try_from(row.total_amount)?,
            last_order_date: row.last_order_date,
            created_at: row.created_at,
            version: row.version,
        })
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CatererListResponse {
    pub caterers: Vec<CatererResponse>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

/// Caterer profile management. The derived summary columns on the caterer
/// row belong to the reconciliation service; this service never touches them
/// past their zero initialization.
#[derive(Clone)]
pub struct CatererService {
    db: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

impl CatererService {
    pub fn new(db: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self { db, event_sender }
    }

    async fn emit(&self, event: Event) {
        if let Some(sender) = &self.event_sender {
            sender.send(event).await;
        }
    }

    #[instrument(skip(self, request))]
    pub async fn create(
        &self,
        request: CreateCatererRequest,
    ) -> Result<CatererResponse, ServiceError> {
        request.validate()?;

        let now = Utc::now();
        let row = caterer::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(request.name),
            contact_name: Set(request.contact_name),
            phone: Set(request.phone),
            email: Set(request.email),
            address: Set(request.address),
            notes: Set(request.notes),
            balance_due: Set(MoneyValue::ZERO.to_decimal()),
            total_orders: Set(0),
            total_amount: Set(MoneyValue::ZERO.to_decimal()),
            last_order_date: Set(None),
            created_at: Set(now),
            updated_at: Set(None),
            version: Set(1),
        }
        .insert(&*self.db)
        .await?;

        info!(caterer_id = %row.id, "caterer created");
        self.emit(Event::CatererCreated(row.id)).await;
        CatererResponse::try_from(row)
    }

    pub async fn get(&self, caterer_id: Uuid) -> Result<CatererResponse, ServiceError> {
        let row = caterer::Entity::find_by_id(caterer_id)
            .one(&*self.db)
            .await?
            .ok_or(ServiceError::CatererNotFound(caterer_id))?;
        CatererResponse::try_from(row)
    }

    pub async fn list(
        &self,
        page: u64,
        per_page: u64,
        search: Option<String>,
    ) -> Result<CatererListResponse, ServiceError> {
        let mut query = caterer::Entity::find().order_by_asc(caterer::Column::Name);
        if let Some(needle) = search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            query = query.filter(caterer::Column::Name.contains(needle));
        }

        let per_page = per_page.clamp(1, 100);
        let paginator = query.paginate(&*self.db, per_page);
        let total = paginator.num_items().await?;
        let rows = paginator.fetch_page(page.saturating_sub(1)).await?;

        let mut caterers = Vec::with_capacity(rows.len());
        for row in rows {
            caterers.push(CatererResponse::try_from(row)?);
        }
        Ok(CatererListResponse {
            caterers,
            total,
            page,
            per_page,
        })
    }

    /// Compare-and-set profile update; `ConcurrentConflict` when the stored
    /// version no longer matches the one the caller read.
    #[instrument(skip(self, request), fields(caterer_id = %caterer_id))]
    pub async fn update(
        &self,
        caterer_id: Uuid,
        request: UpdateCatererRequest,
    ) -> Result<CatererResponse, ServiceError> {
        request.validate()?;

        let row = caterer::Entity::find_by_id(caterer_id)
            .one(&*self.db)
            .await?
            .ok_or(ServiceError::CatererNotFound(caterer_id))?;
        if row.version != request.version {
            return Err(ServiceError::ConcurrentConflict(caterer_id));
        }

        let current_version = row.version;
        let mut active: caterer::ActiveModel = row.into();
        if let Some(name) = request.name {
            active.name = Set(name);
        }
        if let Some(contact_name) = request.contact_name {
            active.contact_name = Set(Some(contact_name));
        }
        if let Some(phone) = request.phone {
            active.phone = Set(Some(phone));
        }
        if let Some(email) = request.email {
            active.email = Set(Some(email));
        }
        if let Some(address) = request.address {
            active.address = Set(Some(address));
        }
        if let Some(notes) = request.notes {
            active.notes = Set(Some(notes));
        }
        active.version = Set(current_version + 1);
        active.updated_at = Set(Some(Utc::now()));

        let updated = active.update(&*self.db).await?;
        self.emit(Event::CatererUpdated(caterer_id)).await;
        CatererResponse::try_from(updated)
    }

    /// Deleting a caterer is blocked while sales reference it. Sales history
    /// is never cascaded away.
    #[instrument(skip(self))]
    pub async fn delete(&self, caterer_id: Uuid) -> Result<(), ServiceError> {
        caterer::Entity::find_by_id(caterer_id)
            .one(&*self.db)
            .await?
            .ok_or(ServiceError::CatererNotFound(caterer_id))?;

        let sale_count = sale::Entity::find()
            .filter(sale::Column::CatererId.eq(caterer_id))
            .count(&*self.db)
            .await?;
        if sale_count > 0 {
            return Err(ServiceError::CatererHasSales(caterer_id));
        }

        caterer::Entity::delete_by_id(caterer_id)
            .exec(&*self.db)
            .await?;
        info!(%caterer_id, "caterer deleted");
        self.emit(Event::CatererDeleted(caterer_id)).await;
        Ok(())
    }
}
