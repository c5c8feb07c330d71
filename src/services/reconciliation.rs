use chrono::{DateTime, Utc};
use dashmap::DashMap;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::db::DbPool;
use crate::entities::{caterer, payment, sale, sale_item};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::money::MoneyValue;
use crate::reconcile::{
    BalanceAggregator, CatererSummary, PaymentStatus, PaymentStatusResolver, SaleWithPayments,
};

/// One line of a sale being created.
#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct LineItemInput {
    pub product_id: Option<Uuid>,
    #[validate(length(min = 1, max = 200, message = "Description is required"))]
    pub description: String,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: i32,
    /// Unit price, two decimal places at most
    pub unit_price: Decimal,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateSaleRequest {
    pub caterer_id: Uuid,
    pub line_items: Vec<LineItemInput>,
    /// Additional charges (delivery, service), added to the item total
    pub charges: Option<Decimal>,
    /// Discounts subtracted from the item total
    pub discounts: Option<Decimal>,
    #[validate(length(min = 1, max = 50))]
    pub sale_number: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct RecordPaymentRequest {
    /// Payment amount, must be positive
    pub amount: Decimal,
    /// How the payment arrived (cash, bank_transfer, upi, card, ...)
    #[validate(length(min = 1, max = 40, message = "Payment method is required"))]
    pub payment_method: String,
    /// Path reference previously returned by the receipt upload endpoint
    pub receipt_path: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SaleItemResponse {
    pub id: Uuid,
    pub product_id: Option<Uuid>,
    pub description: String,
    pub quantity: i32,
    pub unit_price: MoneyValue,
    pub line_total: MoneyValue,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SaleResponse {
    pub id: Uuid,
    pub sale_number: String,
    pub caterer_id: Uuid,
    pub sale_date: DateTime<Utc>,
    pub grand_total: MoneyValue,
    pub status: PaymentStatus,
    pub items: Vec<SaleItemResponse>,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PaymentResponse {
    pub id: Uuid,
    pub sale_id: Uuid,
    pub amount: MoneyValue,
    pub payment_method: String,
    pub receipt_path: Option<String>,
    pub recorded_at: DateTime<Utc>,
    /// Effective status of the sale after this payment
    pub sale_status: PaymentStatus,
}

/// Orchestrates the pure reconciliation core against persistence.
///
/// Per-caterer writes are serialized through an in-process mutex map so two
/// concurrent recomputes cannot overwrite each other with stale summaries;
/// each recompute reads the full history and writes the summary inside one
/// transaction, so a cancelled request never leaves a partial write.
#[derive(Clone)]
pub struct ReconciliationService {
    db: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
    caterer_locks: Arc<DashMap<Uuid, Arc<Mutex<()>>>>,
}

impl ReconciliationService {
    pub fn new(db: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self {
            db,
            event_sender,
            caterer_locks: Arc::new(DashMap::new()),
        }
    }

    fn caterer_lock(&self, caterer_id: Uuid) -> Arc<Mutex<()>> {
        self.caterer_locks
            .entry(caterer_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Drops a caterer's lock entry once no task holds a handle to it, so
    /// the map does not grow with every caterer ever touched.
    fn release_caterer_lock(&self, caterer_id: Uuid) {
        self.caterer_locks
            .remove_if(&caterer_id, |_, lock| Arc::strong_count(lock) == 1);
    }

    async fn emit(&self, event: Event) {
        if let Some(sender) = &self.event_sender {
            sender.send(event).await;
        }
    }

    /// Records a payment against a sale and recomputes the owning caterer's
    /// summary in the same transaction.
    #[instrument(skip(self, request), fields(sale_id = %sale_id))]
    pub async fn record_payment(
        &self,
        sale_id: Uuid,
        request: RecordPaymentRequest,
    ) -> Result<PaymentResponse, ServiceError> {
        request.validate()?;
        let amount = MoneyValue::try_from(request.amount)?;
        if !amount.is_positive() {
            return Err(ServiceError::InvalidAmount(
                "payment amount must be positive".to_string(),
            ));
        }

        let caterer_id = sale::Entity::find_by_id(sale_id)
            .one(&*self.db)
            .await?
            .ok_or(ServiceError::SaleNotFound(sale_id))?
            .caterer_id;

        let lock = self.caterer_lock(caterer_id);
        let guard = lock.lock().await;

        let txn = self.db.begin().await?;
        // Re-read under the lock; a status override may have landed since
        // the row was first fetched for its caterer id.
        let sale = sale::Entity::find_by_id(sale_id)
            .one(&txn)
            .await?
            .ok_or(ServiceError::SaleNotFound(sale_id))?;
        let stored = payment::ActiveModel {
            id: Set(Uuid::new_v4()),
            sale_id: Set(sale_id),
            amount: Set(amount.to_decimal()),
            payment_method: Set(request.payment_method),
            receipt_path: Set(request.receipt_path),
            recorded_at: Set(Utc::now()),
        }
        .insert(&txn)
        .await?;

        let sale_status = effective_status(&txn, &sale).await?;
        recompute_within(&txn, caterer_id).await?;
        txn.commit().await?;
        drop(guard);
        drop(lock);
        self.release_caterer_lock(caterer_id);

        info!(payment_id = %stored.id, %caterer_id, amount = %amount, "payment recorded");
        self.emit(Event::PaymentRecorded {
            payment_id: stored.id,
            sale_id,
            caterer_id,
        })
        .await;
        self.emit(Event::SummaryRecomputed(caterer_id)).await;

        Ok(PaymentResponse {
            id: stored.id,
            sale_id,
            amount,
            payment_method: stored.payment_method,
            receipt_path: stored.receipt_path,
            recorded_at: stored.recorded_at,
            sale_status,
        })
    }

    /// Creates a finalized sale with zero payments and recomputes the
    /// caterer's summary.
    #[instrument(skip(self, request), fields(caterer_id = %request.caterer_id))]
    pub async fn create_sale(
        &self,
        request: CreateSaleRequest,
    ) -> Result<SaleResponse, ServiceError> {
        request.validate()?;
        if request.line_items.is_empty() {
            return Err(ServiceError::ValidationError(
                "a sale needs at least one line item".to_string(),
            ));
        }

        let mut item_total = MoneyValue::ZERO;
        let mut priced_items = Vec::with_capacity(request.line_items.len());
        for item in &request.line_items {
            item.validate()?;
            let unit_price = MoneyValue::try_from(item.unit_price)?;
            if unit_price.is_negative() {
                return Err(ServiceError::InvalidAmount(
                    "unit price must not be negative".to_string(),
                ));
            }
            let line_total = unit_price.checked_mul_int(item.quantity as i64)?;
            item_total = item_total.checked_add(line_total)?;
            priced_items.push((item, unit_price, line_total));
        }

        let charges = non_negative_component(request.charges, "charges")?;
        let discounts = non_negative_component(request.discounts, "discounts")?;
        let grand_total = item_total.checked_add(charges)?.checked_sub(discounts)?;
        if grand_total.is_negative() {
            return Err(ServiceError::InvalidAmount(
                "discounts exceed the billed amount".to_string(),
            ));
        }

        let caterer_id = request.caterer_id;
        caterer::Entity::find_by_id(caterer_id)
            .one(&*self.db)
            .await?
            .ok_or(ServiceError::CatererNotFound(caterer_id))?;

        let lock = self.caterer_lock(caterer_id);
        let guard = lock.lock().await;

        let now = Utc::now();
        let sale_id = Uuid::new_v4();
        let sale_number = request
            .sale_number
            .unwrap_or_else(|| format!("S-{}", sale_id.simple()));

        let txn = self.db.begin().await?;
        let stored = sale::ActiveModel {
            id: Set(sale_id),
            sale_number: Set(sale_number),
            caterer_id: Set(caterer_id),
            sale_date: Set(now),
            grand_total: Set(grand_total.to_decimal()),
            charges: Set(charges.to_decimal()),
            discounts: Set(discounts.to_decimal()),
            status: Set(None),
            notes: Set(request.notes),
            created_at: Set(now),
            updated_at: Set(None),
        }
        .insert(&txn)
        .await?;

        let mut items = Vec::with_capacity(priced_items.len());
        for (item, unit_price, line_total) in priced_items {
            let row = sale_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                sale_id: Set(sale_id),
                product_id: Set(item.product_id),
                description: Set(item.description.clone()),
                quantity: Set(item.quantity),
                unit_price: Set(unit_price.to_decimal()),
                line_total: Set(line_total.to_decimal()),
            }
            .insert(&txn)
            .await?;
            items.push(SaleItemResponse {
                id: row.id,
                product_id: row.product_id,
                description: row.description,
                quantity: row.quantity,
                unit_price,
                line_total,
            });
        }

        recompute_within(&txn, caterer_id).await?;
        txn.commit().await?;
        drop(guard);
        drop(lock);
        self.release_caterer_lock(caterer_id);

        info!(%sale_id, %caterer_id, grand_total = %grand_total, "sale created");
        self.emit(Event::SaleCreated {
            sale_id,
            caterer_id,
        })
        .await;
        self.emit(Event::SummaryRecomputed(caterer_id)).await;

        Ok(SaleResponse {
            id: stored.id,
            sale_number: stored.sale_number,
            caterer_id,
            sale_date: stored.sale_date,
            grand_total,
            status: PaymentStatus::Pending,
            items,
            notes: stored.notes,
        })
    }

    /// Returns the cached summary, or a freshly recomputed (and persisted)
    /// one when `recompute` is set. The caller decides whether to trust the
    /// cache.
    #[instrument(skip(self))]
    pub async fn get_caterer_summary(
        &self,
        caterer_id: Uuid,
        recompute: bool,
    ) -> Result<CatererSummary, ServiceError> {
        if recompute {
            let lock = self.caterer_lock(caterer_id);
            let guard = lock.lock().await;

            let txn = self.db.begin().await?;
            let summary = recompute_within(&txn, caterer_id).await?;
            txn.commit().await?;
            drop(guard);
            drop(lock);
            self.release_caterer_lock(caterer_id);

            self.emit(Event::SummaryRecomputed(caterer_id)).await;
            return Ok(summary);
        }

        let row = caterer::Entity::find_by_id(caterer_id)
            .one(&*self.db)
            .await?
            .ok_or(ServiceError::CatererNotFound(caterer_id))?;
        Ok(CatererSummary {
            balance_due: MoneyValue::try_from(row.balance_due)?,
            total_orders: row.total_orders.max(0) as u64,
            total_amount: MoneyValue::try_from(row.total_amount)?,
            last_order_date: row.last_order_date,
        })
    }

    /// Effective status of a sale: the stored explicit status if set,
    /// otherwise derived from recorded amounts.
    #[instrument(skip(self))]
    pub async fn get_bill_status(&self, sale_id: Uuid) -> Result<PaymentStatus, ServiceError> {
        let sale = sale::Entity::find_by_id(sale_id)
            .one(&*self.db)
            .await?
            .ok_or(ServiceError::SaleNotFound(sale_id))?;
        effective_status(&*self.db, &sale).await
    }

    /// Stores an explicit status override, e.g. `overdue` from a due-date
    /// process. A sale whose outstanding amount reached zero is terminally
    /// paid and cannot be moved away from it.
    #[instrument(skip(self))]
    pub async fn override_status(
        &self,
        sale_id: Uuid,
        status: PaymentStatus,
    ) -> Result<PaymentStatus, ServiceError> {
        let sale = sale::Entity::find_by_id(sale_id)
            .one(&*self.db)
            .await?
            .ok_or(ServiceError::SaleNotFound(sale_id))?;

        let current = effective_status(&*self.db, &sale).await?;
        if current == PaymentStatus::Paid && status != PaymentStatus::Paid {
            return Err(ServiceError::ValidationError(
                "a fully paid sale cannot change status".to_string(),
            ));
        }

        let mut active: sale::ActiveModel = sale.into();
        active.status = Set(Some(status.to_string()));
        active.updated_at = Set(Some(Utc::now()));
        active.update(&*self.db).await?;

        self.emit(Event::SaleStatusOverridden {
            sale_id,
            status: status.to_string(),
        })
        .await;
        Ok(status)
    }

    /// A single sale with items and its effective status.
    pub async fn get_sale(&self, sale_id: Uuid) -> Result<SaleResponse, ServiceError> {
        let sale = sale::Entity::find_by_id(sale_id)
            .one(&*self.db)
            .await?
            .ok_or(ServiceError::SaleNotFound(sale_id))?;
        let status = effective_status(&*self.db, &sale).await?;

        let rows = sale_item::Entity::find()
            .filter(sale_item::Column::SaleId.eq(sale_id))
            .all(&*self.db)
            .await?;
        let mut items = Vec::with_capacity(rows.len());
        for row in rows {
            items.push(SaleItemResponse {
                id: row.id,
                product_id: row.product_id,
                description: row.description,
                quantity: row.quantity,
                unit_price: MoneyValue::try_from(row.unit_price)?,
                line_total: MoneyValue::try_from(row.line_total)?,
            });
        }

        Ok(SaleResponse {
            id: sale.id,
            sale_number: sale.sale_number,
            caterer_id: sale.caterer_id,
            sale_date: sale.sale_date,
            grand_total: MoneyValue::try_from(sale.grand_total)?,
            status,
            items,
            notes: sale.notes,
        })
    }

    /// All sales of a caterer, newest first, with effective statuses.
    pub async fn list_sales(&self, caterer_id: Uuid) -> Result<Vec<SaleResponse>, ServiceError> {
        caterer::Entity::find_by_id(caterer_id)
            .one(&*self.db)
            .await?
            .ok_or(ServiceError::CatererNotFound(caterer_id))?;

        let history = load_history(&*self.db, caterer_id).await?;
        let mut responses = Vec::with_capacity(history.len());
        for entry in history.into_iter().rev() {
            let explicit = PaymentStatus::from_column(entry.sale.status.as_deref());
            let status = PaymentStatusResolver::resolve(
                explicit,
                entry.grand_total()?,
                entry.total_paid()?,
            );
            responses.push(SaleResponse {
                id: entry.sale.id,
                sale_number: entry.sale.sale_number,
                caterer_id,
                sale_date: entry.sale.sale_date,
                grand_total: MoneyValue::try_from(entry.sale.grand_total)?,
                status,
                items: Vec::new(),
                notes: entry.sale.notes,
            });
        }
        Ok(responses)
    }

    /// Payment history of one sale, oldest first.
    pub async fn list_payments(
        &self,
        sale_id: Uuid,
    ) -> Result<Vec<PaymentResponse>, ServiceError> {
        let sale = sale::Entity::find_by_id(sale_id)
            .one(&*self.db)
            .await?
            .ok_or(ServiceError::SaleNotFound(sale_id))?;
        let status = effective_status(&*self.db, &sale).await?;

        let rows = payment::Entity::find()
            .filter(payment::Column::SaleId.eq(sale_id))
            .order_by_asc(payment::Column::RecordedAt)
            .all(&*self.db)
            .await?;
        let mut payments = Vec::with_capacity(rows.len());
        for row in rows {
            payments.push(PaymentResponse {
                id: row.id,
                sale_id,
                amount: MoneyValue::try_from(row.amount)?,
                payment_method: row.payment_method,
                receipt_path: row.receipt_path,
                recorded_at: row.recorded_at,
                sale_status: status,
            });
        }
        Ok(payments)
    }

    /// Attaches a previously stored receipt path to a payment.
    #[instrument(skip(self))]
    /// Confirms a payment exists. Callers use this before producing side
    /// effects, like storing an upload, that only make sense for a real
    /// payment.
    pub async fn ensure_payment(&self, payment_id: Uuid) -> Result<(), ServiceError> {
        payment::Entity::find_by_id(payment_id)
            .one(&*self.db)
            .await?
            .ok_or(ServiceError::PaymentNotFound(payment_id))?;
        Ok(())
    }

    pub async fn attach_receipt(
        &self,
        payment_id: Uuid,
        receipt_path: String,
    ) -> Result<PaymentResponse, ServiceError> {
        let row = payment::Entity::find_by_id(payment_id)
            .one(&*self.db)
            .await?
            .ok_or(ServiceError::PaymentNotFound(payment_id))?;
        let sale = sale::Entity::find_by_id(row.sale_id)
            .one(&*self.db)
            .await?
            .ok_or(ServiceError::SaleNotFound(row.sale_id))?;
        let status = effective_status(&*self.db, &sale).await?;

        let sale_id = row.sale_id;
        let mut active: payment::ActiveModel = row.into();
        active.receipt_path = Set(Some(receipt_path));
        let updated = active.update(&*self.db).await?;

        Ok(PaymentResponse {
            id: updated.id,
            sale_id,
            amount: MoneyValue::try_from(updated.amount)?,
            payment_method: updated.payment_method,
            receipt_path: updated.receipt_path,
            recorded_at: updated.recorded_at,
            sale_status: status,
        })
    }
}

fn non_negative_component(
    value: Option<Decimal>,
    what: &str,
) -> Result<MoneyValue, ServiceError> {
    let amount = match value {
        Some(raw) => MoneyValue::try_from(raw)?,
        None => MoneyValue::ZERO,
    };
    if amount.is_negative() {
        return Err(ServiceError::InvalidAmount(format!(
            "{what} must not be negative"
        )));
    }
    Ok(amount)
}

/// Loads a caterer's full sale/payment history, oldest sale first.
async fn load_history<C: ConnectionTrait>(
    conn: &C,
    caterer_id: Uuid,
) -> Result<Vec<SaleWithPayments>, ServiceError> {
    let sales = sale::Entity::find()
        .filter(sale::Column::CatererId.eq(caterer_id))
        .order_by_asc(sale::Column::SaleDate)
        .all(conn)
        .await?;
    if sales.is_empty() {
        return Ok(Vec::new());
    }

    let sale_ids: Vec<Uuid> = sales.iter().map(|s| s.id).collect();
    let payments = payment::Entity::find()
        .filter(payment::Column::SaleId.is_in(sale_ids))
        .order_by_asc(payment::Column::RecordedAt)
        .all(conn)
        .await?;

    let mut by_sale: HashMap<Uuid, Vec<payment::Model>> = HashMap::new();
    for row in payments {
        by_sale.entry(row.sale_id).or_default().push(row);
    }

    Ok(sales
        .into_iter()
        .map(|sale| SaleWithPayments {
            payments: by_sale.remove(&sale.id).unwrap_or_default(),
            sale,
        })
        .collect())
}

/// Recomputes and persists the caterer's summary on the given connection.
/// Callers run this inside a transaction and under the caterer lock.
async fn recompute_within<C: ConnectionTrait>(
    conn: &C,
    caterer_id: Uuid,
) -> Result<CatererSummary, ServiceError> {
    let row = caterer::Entity::find_by_id(caterer_id)
        .one(conn)
        .await?
        .ok_or(ServiceError::CatererNotFound(caterer_id))?;

    let history = load_history(conn, caterer_id).await?;
    let summary = BalanceAggregator::recompute(&history)?;

    let mut active: caterer::ActiveModel = row.into();
    active.balance_due = Set(summary.balance_due.to_decimal());
    active.total_orders = Set(summary.total_orders as i64);
    active.total_amount = Set(summary.total_amount.to_decimal());
    active.last_order_date = Set(summary.last_order_date);
    active.updated_at = Set(Some(Utc::now()));
    active.update(conn).await?;

    Ok(summary)
}

/// Resolves a sale's effective status from the stored column and its
/// recorded payments.
async fn effective_status<C: ConnectionTrait>(
    conn: &C,
    sale: &sale::Model,
) -> Result<PaymentStatus, ServiceError> {
    let payments = payment::Entity::find()
        .filter(payment::Column::SaleId.eq(sale.id))
        .all(conn)
        .await?;
    let entry = SaleWithPayments {
        sale: sale.clone(),
        payments,
    };
    let explicit = PaymentStatus::from_column(entry.sale.status.as_deref());
    Ok(PaymentStatusResolver::resolve(
        explicit,
        entry.grand_total()?,
        entry.total_paid()?,
    ))
}
