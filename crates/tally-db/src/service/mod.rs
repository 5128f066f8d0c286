//! # Order Services
//!
//! Business operations that combine tally-core rules with storage. Each
//! mutating operation follows the same shape:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. validate()            typed request → InvalidInput, no I/O         │
//! │  2. read + compute        price lines, totals, guards (pool reads)     │
//! │  3. BEGIN                                                               │
//! │     first statement is a WRITE (conditional UPDATE or counter upsert)  │
//! │     so SQLite hands out the write lock before anything is read         │
//! │  4. remaining writes      any `?` drops the transaction → ROLLBACK     │
//! │  5. COMMIT                                                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! - [`checkout::CheckoutService`] - one-shot checkout
//! - [`order::OrderService`] - open / complete / cancel and lookups
//! - [`refund::RefundService`] - line and whole-order refunds

pub mod checkout;
pub mod order;
pub mod refund;

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::ServiceResult;
use crate::repository::order as order_store;
use crate::repository::product;
use tally_core::stock::insufficient;
use tally_core::{
    price_line, Actor, CheckoutLine, CoreError, Discount, LinePricing, Order, OrderItem,
    OrderStatus, OrderTotals, Product, StockDemand,
};

/// Lines priced against the current catalog.
pub(crate) struct PricedLines {
    pub lines: Vec<LinePricing>,
    pub products: HashMap<String, Product>,
}

impl PricedLines {
    pub fn amounts(&self) -> Vec<tally_core::LineAmounts> {
        self.lines.iter().map(|line| line.amounts).collect()
    }
}

/// Loads each referenced product once and prices every line.
///
/// Missing or inactive products fail with `ProductNotFound`.
pub(crate) async fn price_lines(pool: &SqlitePool, lines: &[CheckoutLine]) -> ServiceResult<PricedLines> {
    let mut conn = pool.acquire().await?;
    let mut products: HashMap<String, Product> = HashMap::new();
    let mut priced = Vec::with_capacity(lines.len());

    for line in lines {
        if !products.contains_key(&line.product_id) {
            let product = product::fetch_by_id(&mut *conn, &line.product_id)
                .await?
                .filter(|p| p.is_active)
                .ok_or_else(|| CoreError::ProductNotFound(line.product_id.clone()))?;
            products.insert(line.product_id.clone(), product);
        }

        if let Some(product) = products.get(&line.product_id) {
            priced.push(price_line(product, line.quantity)?);
        }
    }

    debug!(lines = priced.len(), products = products.len(), "Priced lines");
    Ok(PricedLines {
        lines: priced,
        products,
    })
}

/// Decrements stock for every tracked product in `demand`, in product id
/// order. Untracked products pass untouched.
///
/// Must run inside the caller's transaction: on `InsufficientStock` the
/// caller returns early, the transaction is dropped and earlier decrements
/// roll back.
pub(crate) async fn allocate_stock(conn: &mut SqliteConnection, demand: &StockDemand) -> ServiceResult<()> {
    for (product_id, quantity) in demand.iter() {
        if product::decrement_stock(&mut *conn, product_id, quantity).await? {
            continue;
        }

        match product::fetch_by_id(&mut *conn, product_id).await? {
            None => return Err(CoreError::ProductNotFound(product_id.to_string()).into()),
            Some(p) if !p.track_stock => continue,
            Some(p) => return Err(insufficient(&p, quantity).into()),
        }
    }

    Ok(())
}

/// A new pending order carrying computed totals.
pub(crate) fn draft_order(
    actor: &Actor,
    order_number: String,
    customer_id: Option<String>,
    discount: Option<Discount>,
    totals: &OrderTotals,
    notes: Option<String>,
    now: DateTime<Utc>,
) -> Order {
    let discount = discount.map(|d| d.clamped());

    Order {
        id: order_store::generate_order_id(),
        order_number,
        customer_id,
        user_id: actor.user_id.clone(),
        status: OrderStatus::Pending,
        subtotal_cents: totals.subtotal.cents(),
        tax_cents: totals.tax_amount.cents(),
        discount_type: discount.map(|d| d.kind()),
        discount_value: discount.map(|d| d.value()).unwrap_or(0),
        discount_cents: totals.discount_amount.cents(),
        total_cents: totals.total_amount.cents(),
        payment_method: None,
        amount_paid_cents: 0,
        change_cents: 0,
        refund_cents: 0,
        refund_reason: None,
        refunded_by: None,
        refunded_at: None,
        completed_at: None,
        cancelled_at: None,
        notes,
        created_at: now,
        updated_at: now,
    }
}

/// Order items snapshotting each priced line.
pub(crate) fn build_items(order_id: &str, lines: &[LinePricing], now: DateTime<Utc>) -> Vec<OrderItem> {
    lines
        .iter()
        .map(|line| OrderItem {
            id: Uuid::new_v4().to_string(),
            order_id: order_id.to_string(),
            product_id: line.product_id.clone(),
            product_name: line.product_name.clone(),
            sku: line.sku.clone(),
            unit_price_cents: line.unit_price.cents(),
            quantity: line.quantity,
            total_price_cents: line.amounts.total_price.cents(),
            tax_rate_bps: line.tax_rate.bps(),
            tax_cents: line.amounts.tax_amount.cents(),
            refunded_quantity: 0,
            refund_reason: None,
            refunded_by: None,
            refunded_at: None,
            created_at: now,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServiceError;
    use crate::testing::{memory_db, new_product, seed_product};

    #[tokio::test]
    async fn test_failed_allocation_rolls_back_earlier_decrements() {
        let db = memory_db().await;
        // Ids chosen so the plentiful product is decremented first.
        let mut plenty = new_product("PLENTY-1", 100, 0, Some(10));
        plenty.id = "a-plenty".to_string();
        let mut scarce = new_product("SCARCE-1", 100, 0, Some(1));
        scarce.id = "z-scarce".to_string();
        let plenty = db.products().insert(&plenty).await.unwrap();
        let scarce = db.products().insert(&scarce).await.unwrap();

        let demand: StockDemand = [(plenty.id.clone(), 3), (scarce.id.clone(), 2)]
            .into_iter()
            .collect();

        let mut tx = db.pool().begin().await.unwrap();
        let err = allocate_stock(&mut *tx, &demand).await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Domain(CoreError::InsufficientStock { available: 1, requested: 2, .. })
        ));
        drop(tx);

        let plenty = db.products().get_by_id(&plenty.id).await.unwrap().unwrap();
        let scarce = db.products().get_by_id(&scarce.id).await.unwrap().unwrap();
        assert_eq!(plenty.stock_quantity, 10);
        assert_eq!(scarce.stock_quantity, 1);
    }

    #[tokio::test]
    async fn test_price_lines_loads_each_product_once() {
        let db = memory_db().await;
        let tea = seed_product(&db, "TEA-1", 300, 1000, None).await;

        let lines = vec![
            CheckoutLine {
                product_id: tea.id.clone(),
                quantity: 1,
            },
            CheckoutLine {
                product_id: tea.id.clone(),
                quantity: 2,
            },
        ];
        let priced = price_lines(db.pool(), &lines).await.unwrap();

        assert_eq!(priced.lines.len(), 2);
        assert_eq!(priced.products.len(), 1);
        let amounts = priced.amounts();
        assert_eq!(amounts[1].total_price.cents(), 600);
        assert_eq!(amounts[1].tax_amount.cents(), 60);
    }
}
