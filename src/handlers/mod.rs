pub mod caterers;
pub mod common;
pub mod health;
pub mod payments;
pub mod products;
pub mod receipts;
pub mod sales;

use std::sync::Arc;

use crate::config::AppConfig;
use crate::db::DbPool;
use crate::events::EventSender;
use crate::services::caterers::CatererService;
use crate::services::inventory::InventoryService;
use crate::services::receipts::{FsReceiptStore, ReceiptStore};
use crate::services::reconciliation::ReconciliationService;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer behind the HTTP handlers.
#[derive(Clone)]
pub struct AppServices {
    pub caterers: Arc<CatererService>,
    pub inventory: Arc<InventoryService>,
    pub reconciliation: Arc<ReconciliationService>,
    pub receipts: Arc<dyn ReceiptStore>,
}

impl AppServices {
    pub fn new(db: Arc<DbPool>, event_sender: Arc<EventSender>, config: &AppConfig) -> Self {
        let receipts: Arc<dyn ReceiptStore> = Arc::new(FsReceiptStore::new(
            config.receipt_dir.clone(),
            config.receipt_max_bytes,
        ));
        Self {
            caterers: Arc::new(CatererService::new(
                db.clone(),
                Some(event_sender.clone()),
            )),
            inventory: Arc::new(InventoryService::new(
                db.clone(),
                Some(event_sender.clone()),
            )),
            reconciliation: Arc::new(ReconciliationService::new(
                db.clone(),
                Some(event_sender),
            )),
            receipts,
        }
    }
}
