pub mod caterer;
pub mod inventory_batch;
pub mod payment;
pub mod product;
pub mod sale;
pub mod sale_item;
