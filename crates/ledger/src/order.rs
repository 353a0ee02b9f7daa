//! Order document and creation input.

use chrono::{DateTime, Utc};
use common::{Money, OrderId, ProductId, UserId};
use serde::{Deserialize, Serialize};

use crate::error::LedgerError;
use crate::status::OrderStatus;

/// The order document owned by the ledger.
///
/// Created once per rental request and never deleted; the lifecycle is
/// tracked purely through [`OrderStatus`] transitions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub order_id: OrderId,
    pub payment_amount: Money,
    /// Payment amount divided across the rental days.
    pub daily_rate: Money,
    pub product_id: ProductId,
    /// The party who owns the product and rents it out.
    pub renter_id: UserId,
    /// The party renting (and paying for) the product.
    pub user_id: UserId,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub status: OrderStatus,
}

/// Input for creating a new order document.
#[derive(Debug, Clone, Deserialize)]
pub struct NewOrder {
    pub payment_amount: Money,
    pub product_id: ProductId,
    pub renter_id: UserId,
    pub user_id: UserId,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

impl NewOrder {
    /// Builds the order document, computing the daily rate from the
    /// rental period. A period of less than one whole day is invalid.
    pub fn into_record(self, order_id: OrderId) -> Result<OrderRecord, LedgerError> {
        let days = (self.end_date.date_naive() - self.start_date.date_naive()).num_days();
        if days <= 0 {
            return Err(LedgerError::InvalidRentalPeriod {
                start: self.start_date,
                end: self.end_date,
            });
        }

        Ok(OrderRecord {
            order_id,
            payment_amount: self.payment_amount,
            daily_rate: self.payment_amount.per_day(days),
            product_id: self.product_id,
            renter_id: self.renter_id,
            user_id: self.user_id,
            start_date: self.start_date,
            end_date: self.end_date,
            status: OrderStatus::Pending,
        })
    }
}
