//! # Order Repository
//!
//! Reads for orders and their line items, plus the statements the services
//! run inside a transaction.
//!
//! ## Order Lifecycle in SQL
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. NUMBER   next_order_number()   upsert on order_sequences(day)      │
//! │  2. INSERT   insert_order() + insert_item() × N                        │
//! │  3. COMPLETE complete_pending()    ... WHERE status = 'pending'        │
//! │     CANCEL   cancel_pending()      ... WHERE status = 'pending'        │
//! │  4. REFUND   refund_item()         ... WHERE remaining >= qty          │
//! │              record_order_refund() ... WHERE status = 'completed'      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every state change is a conditional `UPDATE`; zero rows affected means
//! the precondition no longer holds and the caller decides which error that
//! is.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use tally_core::refund::REASON_SEPARATOR;
use tally_core::{Order, OrderItem, OrderStatus, OrderTotals, PaymentMethod};

const ORDER_COLUMNS: &str = r#"
    id, order_number, customer_id, user_id, status,
    subtotal_cents, tax_cents, discount_type, discount_value, discount_cents, total_cents,
    payment_method, amount_paid_cents, change_cents,
    refund_cents, refund_reason, refunded_by, refunded_at,
    completed_at, cancelled_at, notes, created_at, updated_at
"#;

const ITEM_COLUMNS: &str = r#"
    id, order_id, product_id, product_name, sku,
    unit_price_cents, quantity, total_price_cents, tax_rate_bps, tax_cents,
    refunded_quantity, refund_reason, refunded_by, refunded_at, created_at
"#;

/// Repository for order reads.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Order>> {
        let mut conn = self.pool.acquire().await?;
        fetch_order(&mut *conn, id).await
    }

    /// Looks up an order by its human-readable number.
    pub async fn get_by_number(&self, order_number: &str) -> DbResult<Option<Order>> {
        debug!(order_number = %order_number, "Fetching order by number");

        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE order_number = ?1");
        let order = sqlx::query_as::<_, Order>(&sql)
            .bind(order_number.trim())
            .fetch_optional(&self.pool)
            .await?;

        Ok(order)
    }

    /// Line items of an order, in insertion order.
    pub async fn get_items(&self, order_id: &str) -> DbResult<Vec<OrderItem>> {
        let mut conn = self.pool.acquire().await?;
        fetch_items(&mut *conn, order_id).await
    }

    pub async fn get_item(&self, item_id: &str) -> DbResult<Option<OrderItem>> {
        let mut conn = self.pool.acquire().await?;
        fetch_item(&mut *conn, item_id).await
    }

    /// Most recent orders first.
    pub async fn list_recent(&self, limit: u32) -> DbResult<Vec<Order>> {
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM orders ORDER BY created_at DESC, rowid DESC LIMIT ?1"
        );
        let orders = sqlx::query_as::<_, Order>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        debug!(count = orders.len(), "Listed recent orders");
        Ok(orders)
    }

    /// Orders in a given status, most recent first.
    pub async fn list_by_status(&self, status: OrderStatus, limit: u32) -> DbResult<Vec<Order>> {
        let sql = format!(
            r#"
            SELECT {ORDER_COLUMNS} FROM orders
            WHERE status = ?1
            ORDER BY created_at DESC, rowid DESC
            LIMIT ?2
            "#
        );
        let orders = sqlx::query_as::<_, Order>(&sql)
            .bind(status)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(orders)
    }
}

// =============================================================================
// Reads on a Connection
// =============================================================================

pub async fn fetch_order(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Order>> {
    let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?1");
    let order = sqlx::query_as::<_, Order>(&sql)
        .bind(id)
        .fetch_optional(conn)
        .await?;

    Ok(order)
}

pub async fn fetch_items(conn: &mut SqliteConnection, order_id: &str) -> DbResult<Vec<OrderItem>> {
    let sql = format!(
        "SELECT {ITEM_COLUMNS} FROM order_items WHERE order_id = ?1 ORDER BY created_at, rowid"
    );
    let items = sqlx::query_as::<_, OrderItem>(&sql)
        .bind(order_id)
        .fetch_all(conn)
        .await?;

    Ok(items)
}

pub async fn fetch_item(conn: &mut SqliteConnection, item_id: &str) -> DbResult<Option<OrderItem>> {
    let sql = format!("SELECT {ITEM_COLUMNS} FROM order_items WHERE id = ?1");
    let item = sqlx::query_as::<_, OrderItem>(&sql)
        .bind(item_id)
        .fetch_optional(conn)
        .await?;

    Ok(item)
}

// =============================================================================
// Writes on a Transaction
// =============================================================================

/// Formats an order number, e.g. `ORD-20260131-0007`.
pub fn format_order_number(day: NaiveDate, sequence: i64) -> String {
    format!("ORD-{}-{:04}", day.format("%Y%m%d"), sequence)
}

/// Allocates the next order number for the day of `now`.
///
/// The counter row is upserted, so this is a write and takes the database
/// write lock when it is the first statement of a transaction.
pub async fn next_order_number(conn: &mut SqliteConnection, now: DateTime<Utc>) -> DbResult<String> {
    let day = now.date_naive();

    let sequence: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO order_sequences (day, last_value) VALUES (?1, 1)
        ON CONFLICT (day) DO UPDATE SET last_value = last_value + 1
        RETURNING last_value
        "#,
    )
    .bind(day.format("%Y-%m-%d").to_string())
    .fetch_one(conn)
    .await?;

    Ok(format_order_number(day, sequence))
}

pub async fn insert_order(conn: &mut SqliteConnection, order: &Order) -> DbResult<()> {
    debug!(order_number = %order.order_number, status = %order.status, "Inserting order");

    sqlx::query(
        r#"
        INSERT INTO orders (
            id, order_number, customer_id, user_id, status,
            subtotal_cents, tax_cents, discount_type, discount_value, discount_cents, total_cents,
            payment_method, amount_paid_cents, change_cents,
            refund_cents, refund_reason, refunded_by, refunded_at,
            completed_at, cancelled_at, notes, created_at, updated_at
        ) VALUES (
            ?1, ?2, ?3, ?4, ?5,
            ?6, ?7, ?8, ?9, ?10, ?11,
            ?12, ?13, ?14,
            ?15, ?16, ?17, ?18,
            ?19, ?20, ?21, ?22, ?23
        )
        "#,
    )
    .bind(&order.id)
    .bind(&order.order_number)
    .bind(&order.customer_id)
    .bind(&order.user_id)
    .bind(order.status)
    .bind(order.subtotal_cents)
    .bind(order.tax_cents)
    .bind(order.discount_type)
    .bind(order.discount_value)
    .bind(order.discount_cents)
    .bind(order.total_cents)
    .bind(order.payment_method)
    .bind(order.amount_paid_cents)
    .bind(order.change_cents)
    .bind(order.refund_cents)
    .bind(&order.refund_reason)
    .bind(&order.refunded_by)
    .bind(order.refunded_at)
    .bind(order.completed_at)
    .bind(order.cancelled_at)
    .bind(&order.notes)
    .bind(order.created_at)
    .bind(order.updated_at)
    .execute(conn)
    .await?;

    Ok(())
}

pub async fn insert_item(conn: &mut SqliteConnection, item: &OrderItem) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO order_items (
            id, order_id, product_id, product_name, sku,
            unit_price_cents, quantity, total_price_cents, tax_rate_bps, tax_cents,
            refunded_quantity, refund_reason, refunded_by, refunded_at, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
        "#,
    )
    .bind(&item.id)
    .bind(&item.order_id)
    .bind(&item.product_id)
    .bind(&item.product_name)
    .bind(&item.sku)
    .bind(item.unit_price_cents)
    .bind(item.quantity)
    .bind(item.total_price_cents)
    .bind(item.tax_rate_bps)
    .bind(item.tax_cents)
    .bind(item.refunded_quantity)
    .bind(&item.refund_reason)
    .bind(&item.refunded_by)
    .bind(item.refunded_at)
    .bind(item.created_at)
    .execute(conn)
    .await?;

    Ok(())
}

/// `pending → completed` with payment recorded. False if the order is not
/// pending (or does not exist).
pub async fn complete_pending(
    conn: &mut SqliteConnection,
    order_id: &str,
    totals: &OrderTotals,
    payment_method: PaymentMethod,
    now: DateTime<Utc>,
) -> DbResult<bool> {
    let result = sqlx::query(
        r#"
        UPDATE orders SET
            status = 'completed',
            subtotal_cents = ?2,
            tax_cents = ?3,
            discount_cents = ?4,
            total_cents = ?5,
            payment_method = ?6,
            amount_paid_cents = ?7,
            change_cents = ?8,
            completed_at = ?9,
            updated_at = ?9
        WHERE id = ?1 AND status = 'pending'
        "#,
    )
    .bind(order_id)
    .bind(totals.subtotal.cents())
    .bind(totals.tax_amount.cents())
    .bind(totals.discount_amount.cents())
    .bind(totals.total_amount.cents())
    .bind(payment_method)
    .bind(totals.amount_paid.cents())
    .bind(totals.change_amount.cents())
    .bind(now)
    .execute(conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// `pending → cancelled`. False if the order is not pending.
pub async fn cancel_pending(conn: &mut SqliteConnection, order_id: &str, now: DateTime<Utc>) -> DbResult<bool> {
    let result = sqlx::query(
        r#"
        UPDATE orders SET status = 'cancelled', cancelled_at = ?2, updated_at = ?2
        WHERE id = ?1 AND status = 'pending'
        "#,
    )
    .bind(order_id)
    .bind(now)
    .execute(conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Bumps `updated_at` on a completed order. Used as the first statement of
/// a whole-order refund so the write lock is taken before anything is read.
pub async fn touch_completed(conn: &mut SqliteConnection, order_id: &str, now: DateTime<Utc>) -> DbResult<bool> {
    let result = sqlx::query("UPDATE orders SET updated_at = ?2 WHERE id = ?1 AND status = 'completed'")
        .bind(order_id)
        .bind(now)
        .execute(conn)
        .await?;

    Ok(result.rows_affected() == 1)
}

/// Records `quantity` refunded units on a line of a completed order.
///
/// The remaining-quantity check and the increment are one statement. False
/// when the line is missing, short, or its order is not completed.
pub async fn refund_item(
    conn: &mut SqliteConnection,
    item_id: &str,
    quantity: i64,
    reason: &str,
    refunded_by: &str,
    now: DateTime<Utc>,
) -> DbResult<bool> {
    let result = sqlx::query(
        r#"
        UPDATE order_items SET
            refunded_quantity = refunded_quantity + ?2,
            refund_reason = CASE
                WHEN refund_reason IS NULL OR refund_reason = '' THEN ?3
                ELSE refund_reason || ?6 || ?3
            END,
            refunded_by = ?4,
            refunded_at = ?5
        WHERE id = ?1
          AND quantity - refunded_quantity >= ?2
          AND EXISTS (
              SELECT 1 FROM orders o
              WHERE o.id = order_items.order_id AND o.status = 'completed'
          )
        "#,
    )
    .bind(item_id)
    .bind(quantity)
    .bind(reason)
    .bind(refunded_by)
    .bind(now)
    .bind(REASON_SEPARATOR)
    .execute(conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Adds a refunded amount to a completed order and sets its new status.
pub async fn record_order_refund(
    conn: &mut SqliteConnection,
    order_id: &str,
    amount_cents: i64,
    reason: &str,
    refunded_by: &str,
    status: OrderStatus,
    now: DateTime<Utc>,
) -> DbResult<bool> {
    let result = sqlx::query(
        r#"
        UPDATE orders SET
            refund_cents = refund_cents + ?2,
            refund_reason = CASE
                WHEN refund_reason IS NULL OR refund_reason = '' THEN ?3
                ELSE refund_reason || ?7 || ?3
            END,
            refunded_by = ?4,
            refunded_at = ?5,
            status = ?6,
            updated_at = ?5
        WHERE id = ?1 AND status = 'completed'
        "#,
    )
    .bind(order_id)
    .bind(amount_cents)
    .bind(reason)
    .bind(refunded_by)
    .bind(now)
    .bind(status)
    .bind(REASON_SEPARATOR)
    .execute(conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

pub fn generate_order_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use chrono::TimeZone;

    #[test]
    fn test_format_order_number() {
        let day = NaiveDate::from_ymd_opt(2026, 1, 31).unwrap();
        assert_eq!(format_order_number(day, 7), "ORD-20260131-0007");
        assert_eq!(format_order_number(day, 12345), "ORD-20260131-12345");
    }

    #[tokio::test]
    async fn test_order_numbers_count_per_day() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut conn = db.pool().acquire().await.unwrap();

        let jan31 = Utc.with_ymd_and_hms(2026, 1, 31, 9, 0, 0).unwrap();
        let feb1 = Utc.with_ymd_and_hms(2026, 2, 1, 9, 0, 0).unwrap();

        assert_eq!(next_order_number(&mut *conn, jan31).await.unwrap(), "ORD-20260131-0001");
        assert_eq!(next_order_number(&mut *conn, jan31).await.unwrap(), "ORD-20260131-0002");
        assert_eq!(next_order_number(&mut *conn, feb1).await.unwrap(), "ORD-20260201-0001");
    }

    #[tokio::test]
    async fn test_missing_rows() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.orders();

        assert!(repo.get_by_id("missing").await.unwrap().is_none());
        assert!(repo.get_by_number("ORD-00000000-0000").await.unwrap().is_none());
        assert!(repo.get_item("missing").await.unwrap().is_none());
        assert!(repo.get_items("missing").await.unwrap().is_empty());
        assert!(repo.list_recent(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_conditional_updates_on_missing_order() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut conn = db.pool().acquire().await.unwrap();
        let now = Utc::now();

        assert!(!cancel_pending(&mut *conn, "missing", now).await.unwrap());
        assert!(!touch_completed(&mut *conn, "missing", now).await.unwrap());
        assert!(!refund_item(&mut *conn, "missing", 1, "r", "u", now).await.unwrap());
    }
}
