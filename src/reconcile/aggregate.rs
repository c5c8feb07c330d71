use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::entities::{payment, sale};
use crate::money::{MoneyError, MoneyValue};

/// A sale together with its full payment history, as loaded for recompute.
#[derive(Debug, Clone)]
pub struct SaleWithPayments {
    pub sale: sale::Model,
    pub payments: Vec<payment::Model>,
}

impl SaleWithPayments {
    pub fn grand_total(&self) -> Result<MoneyValue, MoneyError> {
        MoneyValue::try_from(self.sale.grand_total)
    }

    pub fn total_paid(&self) -> Result<MoneyValue, MoneyError> {
        self.payments
            .iter()
            .map(|p| MoneyValue::try_from(p.amount))
            .try_fold(MoneyValue::ZERO, |acc, amount| acc.checked_add(amount?))
    }
}

/// Derived summary of a caterer's entire sale/payment history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CatererSummary {
    /// Lifetime billed minus lifetime paid. Negative means a credit.
    pub balance_due: MoneyValue,
    pub total_orders: u64,
    /// Lifetime billed amount.
    pub total_amount: MoneyValue,
    pub last_order_date: Option<DateTime<Utc>>,
}

impl CatererSummary {
    pub fn empty() -> Self {
        Self {
            balance_due: MoneyValue::ZERO,
            total_orders: 0,
            total_amount: MoneyValue::ZERO,
            last_order_date: None,
        }
    }
}

/// Recomputes a caterer's running balance and summary statistics.
pub struct BalanceAggregator;

impl BalanceAggregator {
    /// Full fold over the history. Never an incremental patch: recomputing
    /// from the same history always converges to the same summary, no matter
    /// how many writers raced before the current one.
    pub fn recompute(sales: &[SaleWithPayments]) -> Result<CatererSummary, MoneyError> {
        let mut total_amount = MoneyValue::ZERO;
        let mut total_paid = MoneyValue::ZERO;
        let mut last_order_date: Option<DateTime<Utc>> = None;

        for entry in sales {
            total_amount = total_amount.checked_add(entry.grand_total()?)?;
            total_paid = total_paid.checked_add(entry.total_paid()?)?;
            last_order_date = match last_order_date {
                Some(current) => Some(current.max(entry.sale.sale_date)),
                None => Some(entry.sale.sale_date),
            };
        }

        Ok(CatererSummary {
            balance_due: total_amount.checked_sub(total_paid)?,
            total_orders: sales.len() as u64,
            total_amount,
            last_order_date,
        })
    }
}
