//! Balance and payment-status reconciliation core.
//!
//! Pure computation only: the status resolver and the balance aggregator
//! know nothing about the database. The reconciliation service feeds them
//! loaded history and persists what they produce.

pub mod aggregate;
pub mod status;

pub use aggregate::{BalanceAggregator, CatererSummary, SaleWithPayments};
pub use status::{PaymentStatus, PaymentStatusResolver};
