//! # Refund Service
//!
//! Records refunds against lines of completed orders.
//!
//! ## Single-Line Refund
//! ```text
//! ┌──────────────────────────── transaction ────────────────────────────────┐
//! │ UPDATE order_items ... WHERE remaining >= qty AND order is completed    │
//! │   0 rows → LineItemNotFound | InvalidTransition | RefundExceedsRemaining│
//! │ restock (optional, tracked products only)                               │
//! │ UPDATE orders: refund_cents += unit_price × qty, status if fully done   │
//! └──────────────────────────────── COMMIT ─────────────────────────────────┘
//! ```
//!
//! Two refunds racing on the same line serialize on the conditional update;
//! the loser sees the reduced remaining quantity.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{info, warn};

use crate::error::{DbError, ServiceError, ServiceResult};
use crate::repository::order as order_store;
use crate::repository::product;
use tally_core::lifecycle::status_after_refund;
use tally_core::{
    plan_refund, Actor, CoreError, Money, OrderRefundReceipt, OrderRefundRequest,
    OrderRefundSummary, OrderStatus, RefundReceipt, RefundRequest,
};

#[derive(Debug, Clone)]
pub struct RefundService {
    pool: SqlitePool,
}

impl RefundService {
    pub fn new(pool: SqlitePool) -> Self {
        RefundService { pool }
    }

    /// Refunds `quantity` units of one line.
    pub async fn refund_item(&self, actor: &Actor, request: RefundRequest) -> ServiceResult<RefundReceipt> {
        let line_item_id = request.line_item_id.clone();
        let result = self.refund_line(actor, request).await;

        match &result {
            Ok(receipt) => info!(
                line_item_id = %line_item_id,
                order_number = %receipt.order.order_number,
                refunded_cents = receipt.refunded_amount.cents(),
                status = %receipt.order.status,
                user_id = %actor.user_id,
                "Line refunded"
            ),
            Err(err) => warn!(line_item_id = %line_item_id, user_id = %actor.user_id, error = %err, "Refund rejected"),
        }

        result
    }

    async fn refund_line(&self, actor: &Actor, request: RefundRequest) -> ServiceResult<RefundReceipt> {
        let request = request.validate()?;
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let applied = order_store::refund_item(
            &mut *tx,
            &request.line_item_id,
            request.quantity,
            &request.reason,
            &actor.user_id,
            now,
        )
        .await?;
        if !applied {
            return Err(refund_rejection(&mut *tx, &request.line_item_id, request.quantity).await);
        }

        let item = order_store::fetch_item(&mut *tx, &request.line_item_id)
            .await?
            .ok_or_else(|| CoreError::LineItemNotFound(request.line_item_id.clone()))?;
        let refunded_amount = item.unit_price().multiply_quantity(request.quantity);

        if request.restock {
            product::restock(&mut *tx, &item.product_id, request.quantity).await?;
        }

        let items = order_store::fetch_items(&mut *tx, &item.order_id).await?;
        let status = status_after_refund(OrderStatus::Completed, &items);
        let recorded = order_store::record_order_refund(
            &mut *tx,
            &item.order_id,
            refunded_amount.cents(),
            &request.reason,
            &actor.user_id,
            status,
            now,
        )
        .await?;
        if !recorded {
            return Err(DbError::QueryFailed(format!("order {} left completed mid-refund", item.order_id)).into());
        }

        let order = order_store::fetch_order(&mut *tx, &item.order_id)
            .await?
            .ok_or_else(|| CoreError::OrderNotFound(item.order_id.clone()))?;

        tx.commit().await?;

        Ok(RefundReceipt {
            order: OrderRefundSummary::from_detail(&order, &items),
            item,
            refunded_amount,
        })
    }

    /// Refunds every remaining unit of a completed order and moves it to
    /// `refunded`.
    pub async fn refund_order(
        &self,
        actor: &Actor,
        request: OrderRefundRequest,
    ) -> ServiceResult<OrderRefundReceipt> {
        let order_id = request.order_id.clone();
        let result = self.refund_all(actor, request).await;

        match &result {
            Ok(receipt) => info!(
                order_number = %receipt.order.order_number,
                refunded_cents = receipt.refunded_amount.cents(),
                user_id = %actor.user_id,
                "Order refunded"
            ),
            Err(err) => warn!(order_id = %order_id, user_id = %actor.user_id, error = %err, "Order refund rejected"),
        }

        result
    }

    async fn refund_all(&self, actor: &Actor, request: OrderRefundRequest) -> ServiceResult<OrderRefundReceipt> {
        let request = request.validate()?;
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        if !order_store::touch_completed(&mut *tx, &request.order_id, now).await? {
            let order = order_store::fetch_order(&mut *tx, &request.order_id)
                .await?
                .ok_or_else(|| CoreError::OrderNotFound(request.order_id.clone()))?;
            return Err(CoreError::invalid_transition(&order.id, order.status, OrderStatus::Refunded).into());
        }

        let mut refunded_amount = Money::zero();
        let items = order_store::fetch_items(&mut *tx, &request.order_id).await?;
        for item in items.iter().filter(|item| item.remaining_quantity() > 0) {
            let plan = plan_refund(item, item.remaining_quantity())?;

            let applied =
                order_store::refund_item(&mut *tx, &item.id, plan.quantity, &request.reason, &actor.user_id, now)
                    .await?;
            if !applied {
                return Err(refund_rejection(&mut *tx, &item.id, plan.quantity).await);
            }

            if request.restock {
                product::restock(&mut *tx, &item.product_id, plan.quantity).await?;
            }
            refunded_amount += plan.refund_amount;
        }

        let items = order_store::fetch_items(&mut *tx, &request.order_id).await?;
        let status = status_after_refund(OrderStatus::Completed, &items);
        order_store::record_order_refund(
            &mut *tx,
            &request.order_id,
            refunded_amount.cents(),
            &request.reason,
            &actor.user_id,
            status,
            now,
        )
        .await?;

        let order = order_store::fetch_order(&mut *tx, &request.order_id)
            .await?
            .ok_or_else(|| CoreError::OrderNotFound(request.order_id.clone()))?;

        tx.commit().await?;

        Ok(OrderRefundReceipt {
            order: OrderRefundSummary::from_detail(&order, &items),
            items,
            refunded_amount,
        })
    }
}

/// Explains why a conditional refund update matched no rows.
async fn refund_rejection(conn: &mut SqliteConnection, item_id: &str, quantity: i64) -> ServiceError {
    match diagnose_refund(conn, item_id, quantity).await {
        Ok(err) | Err(err) => err,
    }
}

async fn diagnose_refund(conn: &mut SqliteConnection, item_id: &str, quantity: i64) -> ServiceResult<ServiceError> {
    let item = order_store::fetch_item(&mut *conn, item_id)
        .await?
        .ok_or_else(|| CoreError::LineItemNotFound(item_id.to_string()))?;
    let order = order_store::fetch_order(&mut *conn, &item.order_id)
        .await?
        .ok_or_else(|| CoreError::OrderNotFound(item.order_id.clone()))?;

    order.status.ensure_refundable(&order.id)?;
    plan_refund(&item, quantity)?;

    Ok(DbError::QueryFailed(format!("refund of line {item_id} matched no rows")).into())
}

// =============================================================================
// Unit Tests
// =============================================================================
