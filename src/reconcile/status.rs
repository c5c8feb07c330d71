use serde::{Deserialize, Serialize};
use std::str::FromStr;
use strum::{Display, EnumString};
use utoipa::ToSchema;

use crate::money::MoneyValue;

/// Caterer-facing payment state of a sale.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PaymentStatus {
    Paid,
    Partial,
    Pending,
    Overdue,
}

impl PaymentStatus {
    /// Interprets a stored status column. `None`, empty strings and values
    /// that are not a known status all mean "derive from amounts".
    pub fn from_column(value: Option<&str>) -> Option<PaymentStatus> {
        value
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .and_then(|s| PaymentStatus::from_str(s).ok())
    }
}

/// Derives a sale's effective status from recorded versus expected amounts.
pub struct PaymentStatusResolver;

impl PaymentStatusResolver {
    /// An explicit stored status always wins; the resolver never overrides a
    /// meaningful persisted value. Otherwise the status follows the
    /// outstanding amount: zero outstanding is `Paid` (overpayment clamps
    /// here too), anything outstanding is `Partial` once money has arrived
    /// and `Pending` before it has.
    ///
    /// `Overdue` is never derived from amounts. It only ever arrives as an
    /// explicit status set by an external time-based process; the resolver
    /// has no notion of due dates.
    pub fn resolve(
        explicit: Option<PaymentStatus>,
        grand_total: MoneyValue,
        total_paid: MoneyValue,
    ) -> PaymentStatus {
        if let Some(status) = explicit {
            return status;
        }

        let outstanding = grand_total
            .saturating_sub(total_paid)
            .max(MoneyValue::ZERO);

        if outstanding.is_zero() {
            PaymentStatus::Paid
        } else if total_paid.is_positive() {
            PaymentStatus::Partial
        } else {
            PaymentStatus::Pending
        }
    }
}
