//! # Order Lifecycle
//!
//! ```text
//!            complete            fully refunded
//!  pending ───────────► completed ──────────────► refunded
//!     │
//!     │ cancel
//!     ▼
//!  cancelled
//! ```
//!
//! `cancelled` and `refunded` are terminal.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::refund::is_fully_refunded;
use crate::totals::OrderTotals;
use crate::types::{OrderItem, OrderStatus};

/// Something that happens to an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum OrderEvent {
    Complete,
    Cancel,
    FullyRefund,
}

impl OrderEvent {
    /// Status the event leads to.
    pub const fn target(&self) -> OrderStatus {
        match self {
            OrderEvent::Complete => OrderStatus::Completed,
            OrderEvent::Cancel => OrderStatus::Cancelled,
            OrderEvent::FullyRefund => OrderStatus::Refunded,
        }
    }
}

impl OrderStatus {
    pub const fn can_transition_to(&self, next: OrderStatus) -> bool {
        matches!(
            (self, next),
            (OrderStatus::Pending, OrderStatus::Completed)
                | (OrderStatus::Pending, OrderStatus::Cancelled)
                | (OrderStatus::Completed, OrderStatus::Refunded)
        )
    }

    /// Validated transition. Returns the new status or `InvalidTransition`.
    pub fn transition(self, order_id: &str, next: OrderStatus) -> CoreResult<OrderStatus> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(CoreError::invalid_transition(order_id, self, next))
        }
    }

    /// Applies an event.
    pub fn apply(self, order_id: &str, event: OrderEvent) -> CoreResult<OrderStatus> {
        self.transition(order_id, event.target())
    }

    /// Refunds are recorded against completed orders only.
    pub fn ensure_refundable(self, order_id: &str) -> CoreResult<()> {
        if self == OrderStatus::Completed {
            Ok(())
        } else {
            Err(CoreError::invalid_transition(order_id, self, OrderStatus::Refunded))
        }
    }
}

/// Guards `pending → completed`: at least one line, and payment covers the
/// total. Stock is enforced by the storage transaction.
pub fn guard_completion(order_id: &str, item_count: usize, totals: &OrderTotals) -> CoreResult<()> {
    if item_count == 0 {
        return Err(CoreError::EmptyOrder(order_id.to_string()));
    }

    totals.ensure_payment_sufficient()
}

/// Status after a refund has been applied to `items`.
pub fn status_after_refund(current: OrderStatus, items: &[OrderItem]) -> OrderStatus {
    if current == OrderStatus::Completed && is_fully_refunded(items) {
        OrderStatus::Refunded
    } else {
        current
    }
}
