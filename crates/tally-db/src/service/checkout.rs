//! # Checkout Service
//!
//! One-shot checkout: cart lines plus payment in, completed order out.
//!
//! ## Flow
//! ```text
//! CheckoutRequest
//!      │ validate()                         ─► InvalidInput
//!      ▼
//! price lines against current catalog       ─► ProductNotFound
//!      │
//!      ▼
//! compute_totals + payment check            ─► PaymentInsufficient (nothing written)
//!      │
//!      ▼
//! ┌──────────────── transaction ────────────────┐
//! │ conditional stock decrements  ─► InsufficientStock (rolled back)
//! │ next order number
//! │ INSERT order (completed) + items
//! └──────────────────── COMMIT ─────────────────┘
//!      │
//!      ▼
//! OrderDetail
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{info, warn};

use super::{allocate_stock, build_items, draft_order, price_lines};
use crate::error::ServiceResult;
use crate::repository::order as order_store;
use tally_core::request::stock_demand;
use tally_core::{check_available, compute_totals, Actor, CheckoutRequest, OrderDetail, OrderStatus};

#[derive(Debug, Clone)]
pub struct CheckoutService {
    pool: SqlitePool,
}

impl CheckoutService {
    pub fn new(pool: SqlitePool) -> Self {
        CheckoutService { pool }
    }

    /// Prices, pays for and completes an order in one call.
    ///
    /// Fails closed: if any tracked product is short, nothing is written.
    pub async fn checkout(&self, actor: &Actor, request: CheckoutRequest) -> ServiceResult<OrderDetail> {
        let result = self.run(actor, request).await;

        match &result {
            Ok(detail) => info!(
                order_number = %detail.order.order_number,
                user_id = %actor.user_id,
                lines = detail.items.len(),
                total_cents = detail.order.total_cents,
                change_cents = detail.order.change_cents,
                "Checkout completed"
            ),
            Err(err) => warn!(user_id = %actor.user_id, error = %err, "Checkout rejected"),
        }

        result
    }

    async fn run(&self, actor: &Actor, request: CheckoutRequest) -> ServiceResult<OrderDetail> {
        let request = request.validate()?;

        let priced = price_lines(&self.pool, &request.items).await?;
        let totals = compute_totals(&priced.amounts(), request.discount(), request.amount_paid())?;
        totals.ensure_payment_sufficient()?;

        let demand = stock_demand(&request.items);
        for (product_id, quantity) in demand.iter() {
            if let Some(product) = priced.products.get(product_id) {
                check_available(product, quantity)?;
            }
        }

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        allocate_stock(&mut *tx, &demand).await?;
        let order_number = order_store::next_order_number(&mut *tx, now).await?;

        let mut order = draft_order(
            actor,
            order_number,
            request.customer_id.clone(),
            request.discount,
            &totals,
            request.notes.clone(),
            now,
        );
        order.status = OrderStatus::Completed;
        order.payment_method = Some(request.payment_method);
        order.amount_paid_cents = totals.amount_paid.cents();
        order.change_cents = totals.change_amount.cents();
        order.completed_at = Some(now);

        order_store::insert_order(&mut *tx, &order).await?;
        let items = build_items(&order.id, &priced.lines, now);
        for item in &items {
            order_store::insert_item(&mut *tx, item).await?;
        }

        tx.commit().await?;

        Ok(OrderDetail { order, items })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
