//! # Refund Ledger
//!
//! Pure rules for refunding order lines. Storage applies a plan with a
//! conditional update that re-checks the remaining quantity, so two
//! concurrent refunds on the same line cannot both pass.
//!
//! ## Rules
//! - `1 ≤ quantity ≤ quantity_sold − refunded_quantity`
//! - Refund amount is `unit_price × quantity`. Tax is not refunded.
//! - Reasons accumulate, joined with `"; "`.
//! - When no line has remaining quantity the order becomes `refunded`.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{OrderItem, OrderRefundSummary};

/// Separator between accumulated refund reasons (applied in storage).
pub const REASON_SEPARATOR: &str = "; ";

/// The effect of refunding part of one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RefundPlan {
    pub quantity: i64,
    pub refund_amount: Money,
    pub new_refunded_quantity: i64,
    pub remaining_after: i64,
}

/// Plans a refund of `quantity` units of `item`.
///
/// ```rust
/// # use chrono::Utc;
/// # use tally_core::types::OrderItem;
/// use tally_core::refund::plan_refund;
/// # let item = OrderItem {
/// #     id: "i1".into(), order_id: "o1".into(), product_id: "p1".into(),
/// #     product_name: "Tea".into(), sku: "TEA".into(), unit_price_cents: 1000,
/// #     quantity: 2, total_price_cents: 2000, tax_rate_bps: 1000, tax_cents: 200,
/// #     refunded_quantity: 0, refund_reason: None, refunded_by: None,
/// #     refunded_at: None, created_at: Utc::now(),
/// # };
///
/// let plan = plan_refund(&item, 1).unwrap();
/// assert_eq!(plan.refund_amount.cents(), 1000);
/// assert_eq!(plan.remaining_after, 1);
///
/// assert!(plan_refund(&item, 3).is_err());
/// ```
pub fn plan_refund(item: &OrderItem, quantity: i64) -> CoreResult<RefundPlan> {
    if quantity < 1 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        }
        .into());
    }

    let remaining = item.remaining_quantity();
    if quantity > remaining {
        return Err(CoreError::RefundExceedsRemaining {
            line_item_id: item.id.clone(),
            requested: quantity,
            max_refundable: remaining,
            max_refundable_amount: item.unit_price().multiply_quantity(remaining),
        });
    }

    Ok(RefundPlan {
        quantity,
        refund_amount: item.unit_price().multiply_quantity(quantity),
        new_refunded_quantity: item.refunded_quantity + quantity,
        remaining_after: remaining - quantity,
    })
}

/// True when every line has been refunded in full.
///
/// An empty slice is not considered refunded.
pub fn is_fully_refunded(items: &[OrderItem]) -> bool {
    !items.is_empty() && items.iter().all(OrderItem::is_fully_refunded)
}

/// Units still refundable across all lines.
pub fn remaining_units(items: &[OrderItem]) -> i64 {
    items.iter().map(OrderItem::remaining_quantity).sum()
}

/// Result of a single-line refund.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RefundReceipt {
    /// The line after the refund was applied.
    pub item: OrderItem,
    pub refunded_amount: Money,
    pub order: OrderRefundSummary,
}

/// Result of refunding every remaining unit of an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderRefundReceipt {
    pub items: Vec<OrderItem>,
    pub refunded_amount: Money,
    pub order: OrderRefundSummary,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::tests::sample_item;

    #[test]
    fn test_partial_refund_plan() {
        let item = sample_item(2, 0);
        let plan = plan_refund(&item, 1).unwrap();

        assert_eq!(plan.refund_amount, Money::from_cents(1000));
        assert_eq!(plan.new_refunded_quantity, 1);
        assert_eq!(plan.remaining_after, 1);
    }

    #[test]
    fn test_refund_up_to_remaining() {
        let item = sample_item(3, 1);
        let plan = plan_refund(&item, 2).unwrap();
        assert_eq!(plan.new_refunded_quantity, 3);
        assert_eq!(plan.remaining_after, 0);
    }

    #[test]
    fn test_refund_exceeding_remaining_is_rejected() {
        let item = sample_item(2, 1);
        match plan_refund(&item, 2) {
            Err(CoreError::RefundExceedsRemaining {
                line_item_id,
                requested,
                max_refundable,
                max_refundable_amount,
            }) => {
                assert_eq!(line_item_id, "item-1");
                assert_eq!(requested, 2);
                assert_eq!(max_refundable, 1);
                assert_eq!(max_refundable_amount, Money::from_cents(1000));
            }
            other => panic!("expected RefundExceedsRemaining, got {:?}", other),
        }
    }

    #[test]
    fn test_refund_of_fully_refunded_line_is_rejected() {
        let item = sample_item(2, 2);
        assert!(matches!(
            plan_refund(&item, 1),
            Err(CoreError::RefundExceedsRemaining { max_refundable: 0, .. })
        ));
    }

    #[test]
    fn test_zero_quantity_is_invalid_input() {
        assert!(matches!(
            plan_refund(&sample_item(2, 0), 0),
            Err(CoreError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_fully_refunded_detection() {
        let mut second = sample_item(1, 1);
        second.id = "item-2".to_string();

        assert!(is_fully_refunded(&[sample_item(2, 2), second.clone()]));
        assert!(!is_fully_refunded(&[sample_item(2, 1), second]));
        assert!(!is_fully_refunded(&[]));
        assert_eq!(remaining_units(&[sample_item(2, 1), sample_item(3, 0)]), 4);
    }
}
