//! # Refund Commands
//!
//! Line refunds and whole-order refunds against completed orders. Each
//! refund is recorded under the envelope's `actor`.

use tracing::{debug, info};

use crate::error::ApiError;
use crate::state::{ConfigState, DbState};
use tally_core::{Actor, OrderRefundReceipt, OrderRefundRequest, RefundReceipt, RefundRequest};

/// `{"line_item_id": "...", "quantity": 1, "reason": "damaged", "restock": false}`
pub async fn refund_item(
    db: &DbState,
    config: &ConfigState,
    actor: &Actor,
    request: RefundRequest,
) -> Result<RefundReceipt, ApiError> {
    debug!(line_item_id = %request.line_item_id, quantity = request.quantity, "refund_item command");

    let receipt = db.refunds().refund_item(actor, request).await?;
    info!(
        order_number = %receipt.order.order_number,
        refunded = %config.format_currency(receipt.refunded_amount.cents()),
        remaining = receipt.order.remaining_quantity,
        "refund_item command complete"
    );
    Ok(receipt)
}

/// Refunds every unit still outstanding on the order.
pub async fn refund_order(
    db: &DbState,
    config: &ConfigState,
    actor: &Actor,
    request: OrderRefundRequest,
) -> Result<OrderRefundReceipt, ApiError> {
    debug!(order_id = %request.order_id, "refund_order command");

    let receipt = db.refunds().refund_order(actor, request).await?;
    info!(
        order_number = %receipt.order.order_number,
        refunded = %config.format_currency(receipt.refunded_amount.cents()),
        "refund_order command complete"
    );
    Ok(receipt)
}
