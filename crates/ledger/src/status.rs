//! Order status state machine.

use serde::{Deserialize, Serialize};

/// The status of a rental order in its lifecycle.
///
/// Happy path:
/// ```text
/// pending ──► accepted ──► paid ──► shipping ──► completed
/// ```
///
/// Off-path states: `payment_failed` (from accepted), `late` (from
/// paid), and `refund` (from paid or late, covering refunds of orders
/// that went overdue). No transition skips the payment step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Order created, waiting for the renter to confirm.
    #[default]
    Pending,

    /// Renter confirmed, payment capture in progress.
    Accepted,

    /// Payment captured.
    Paid,

    /// Shipping label created and parties notified.
    Shipping,

    /// Rental completed (terminal).
    Completed,

    /// Payment capture failed (terminal).
    PaymentFailed,

    /// Rental period expired without return.
    Late,

    /// Payment was refunded (terminal).
    Refund,
}

impl OrderStatus {
    /// Returns true if the order can move from `self` to `next`.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Accepted)
                | (Accepted, Paid)
                | (Accepted, PaymentFailed)
                | (Paid, Shipping)
                | (Paid, Late)
                | (Paid, Refund)
                | (Late, Refund)
                | (Shipping, Completed)
        )
    }

    /// Returns true if no further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Completed | OrderStatus::PaymentFailed | OrderStatus::Refund
        )
    }

    /// Returns the wire-format status string.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Accepted => "accepted",
            OrderStatus::Paid => "paid",
            OrderStatus::Shipping => "shipping",
            OrderStatus::Completed => "completed",
            OrderStatus::PaymentFailed => "payment_failed",
            OrderStatus::Late => "late",
            OrderStatus::Refund => "refund",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
