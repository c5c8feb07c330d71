pub mod caterers;
pub mod inventory;
pub mod receipts;
pub mod reconciliation;
