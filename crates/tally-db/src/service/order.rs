//! # Order Service
//!
//! Two-phase orders: open a pending order, then complete or cancel it.
//!
//! ```text
//!  open_order ──► pending ──complete_order──► completed
//!                    │
//!                    └──cancel_order──► cancelled
//! ```
//!
//! Completion re-derives totals from the stored line snapshots and the
//! stored discount, so later catalog price changes never reach an open
//! order.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{info, warn};

use super::{allocate_stock, build_items, draft_order, price_lines};
use crate::error::{ServiceError, ServiceResult};
use crate::repository::order::{self as order_store, OrderRepository};
use tally_core::totals::line_amounts_of;
use tally_core::{
    compute_totals, guard_completion, Actor, CoreError, Discount, Money, OpenOrderRequest, Order,
    OrderDetail, OrderEvent, OrderStatus, PaymentRequest, StockDemand,
};

#[derive(Debug, Clone)]
pub struct OrderService {
    pool: SqlitePool,
}

impl OrderService {
    pub fn new(pool: SqlitePool) -> Self {
        OrderService { pool }
    }

    fn repo(&self) -> OrderRepository {
        OrderRepository::new(self.pool.clone())
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Opens a pending order with snapshotted lines and computed totals.
    /// Stock is not touched until completion.
    pub async fn open_order(&self, actor: &Actor, request: OpenOrderRequest) -> ServiceResult<OrderDetail> {
        let result = self.open(actor, request).await;
        log_outcome("open_order", actor, &result, |d| &d.order);
        result
    }

    async fn open(&self, actor: &Actor, request: OpenOrderRequest) -> ServiceResult<OrderDetail> {
        let request = request.validate()?;

        let priced = price_lines(&self.pool, &request.items).await?;
        let totals = compute_totals(&priced.amounts(), request.discount(), Money::zero())?;

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let order_number = order_store::next_order_number(&mut *tx, now).await?;
        let order = draft_order(
            actor,
            order_number,
            request.customer_id.clone(),
            request.discount,
            &totals,
            request.notes.clone(),
            now,
        );
        order_store::insert_order(&mut *tx, &order).await?;

        let items = build_items(&order.id, &priced.lines, now);
        for item in &items {
            order_store::insert_item(&mut *tx, item).await?;
        }

        tx.commit().await?;

        Ok(OrderDetail { order, items })
    }

    /// Completes a pending order.
    ///
    /// Guards run before anything is written: an empty order fails with
    /// `EmptyOrder`, short payment with `PaymentInsufficient`, and in both
    /// cases the order stays `pending`. The status change and the stock
    /// decrements then commit together or not at all.
    pub async fn complete_order(
        &self,
        actor: &Actor,
        order_id: &str,
        payment: PaymentRequest,
    ) -> ServiceResult<OrderDetail> {
        let result = self.complete(order_id, payment).await;
        log_outcome("complete_order", actor, &result, |d| &d.order);
        result
    }

    async fn complete(&self, order_id: &str, payment: PaymentRequest) -> ServiceResult<OrderDetail> {
        let payment = payment.validate()?;

        let repo = self.repo();
        let order = repo
            .get_by_id(order_id)
            .await?
            .ok_or_else(|| CoreError::OrderNotFound(order_id.to_string()))?;
        order.status.apply(&order.id, OrderEvent::Complete)?;

        let items = repo.get_items(&order.id).await?;
        let discount = Discount::from_parts(order.discount_type, order.discount_value);
        let totals = compute_totals(&line_amounts_of(&items), discount, payment.amount_paid())?;
        guard_completion(&order.id, items.len(), &totals)?;

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let completed =
            order_store::complete_pending(&mut *tx, &order.id, &totals, payment.payment_method, now).await?;
        if !completed {
            // Completed or cancelled by someone else since the read above.
            let current = order_store::fetch_order(&mut *tx, &order.id)
                .await?
                .ok_or_else(|| CoreError::OrderNotFound(order.id.clone()))?;
            return Err(CoreError::invalid_transition(&order.id, current.status, OrderEvent::Complete.target()).into());
        }

        let demand: StockDemand = items
            .iter()
            .map(|item| (item.product_id.as_str(), item.quantity))
            .collect();
        allocate_stock(&mut *tx, &demand).await?;

        let order = order_store::fetch_order(&mut *tx, &order.id)
            .await?
            .ok_or_else(|| CoreError::OrderNotFound(order.id.clone()))?;

        tx.commit().await?;

        Ok(OrderDetail { order, items })
    }

    /// Cancels a pending order. Stock is untouched.
    pub async fn cancel_order(&self, actor: &Actor, order_id: &str) -> ServiceResult<Order> {
        let result = self.cancel(order_id).await;
        log_outcome("cancel_order", actor, &result, |o| o);
        result
    }

    async fn cancel(&self, order_id: &str) -> ServiceResult<Order> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let cancelled = order_store::cancel_pending(&mut *tx, order_id, now).await?;
        let order = order_store::fetch_order(&mut *tx, order_id)
            .await?
            .ok_or_else(|| CoreError::OrderNotFound(order_id.to_string()))?;

        if !cancelled {
            return Err(CoreError::invalid_transition(order_id, order.status, OrderEvent::Cancel.target()).into());
        }

        tx.commit().await?;
        Ok(order)
    }

    // =========================================================================
    // Lookups
    // =========================================================================

    pub async fn get_order(&self, order_id: &str) -> ServiceResult<OrderDetail> {
        let repo = self.repo();
        let order = repo
            .get_by_id(order_id)
            .await?
            .ok_or_else(|| CoreError::OrderNotFound(order_id.to_string()))?;
        let items = repo.get_items(&order.id).await?;

        Ok(OrderDetail { order, items })
    }

    pub async fn get_by_number(&self, order_number: &str) -> ServiceResult<OrderDetail> {
        let repo = self.repo();
        let order = repo
            .get_by_number(order_number)
            .await?
            .ok_or_else(|| CoreError::OrderNotFound(order_number.to_string()))?;
        let items = repo.get_items(&order.id).await?;

        Ok(OrderDetail { order, items })
    }

    /// Most recent orders first, optionally filtered by status.
    pub async fn list_recent(&self, status: Option<OrderStatus>, limit: u32) -> ServiceResult<Vec<Order>> {
        let repo = self.repo();
        let orders = match status {
            Some(status) => repo.list_by_status(status, limit).await?,
            None => repo.list_recent(limit).await?,
        };
        Ok(orders)
    }
}

fn log_outcome<T>(operation: &str, actor: &Actor, result: &Result<T, ServiceError>, order: impl Fn(&T) -> &Order) {
    match result {
        Ok(value) => {
            let order = order(value);
            info!(
                operation,
                order_number = %order.order_number,
                status = %order.status,
                user_id = %actor.user_id,
                total_cents = order.total_cents,
                "Order updated"
            );
        }
        Err(err) => warn!(operation, user_id = %actor.user_id, error = %err, "Order operation rejected"),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use crate::testing::{cashier, line, memory_db, seed_product};
    use tally_core::{CheckoutLine, PaymentMethod};

    fn open_request(items: Vec<CheckoutLine>) -> OpenOrderRequest {
        OpenOrderRequest {
            items,
            customer_id: None,
            discount: None,
            notes: None,
        }
    }

    fn cash(cents: i64) -> PaymentRequest {
        PaymentRequest {
            payment_method: PaymentMethod::Cash,
            amount_paid_cents: cents,
        }
    }

    #[tokio::test]
    async fn test_open_then_complete() {
        let db = memory_db().await;
        let cola = seed_product(&db, "COLA-1", 1000, 1000, Some(5)).await;
        let service = db.order_service();

        let opened = service
            .open_order(&cashier(), open_request(vec![line(&cola.id, 2)]))
            .await
            .unwrap();
        assert_eq!(opened.order.status, OrderStatus::Pending);
        assert_eq!(opened.order.total_cents, 2200);
        assert_eq!(opened.order.payment_method, None);

        // Pending orders hold no stock.
        let product = db.products().get_by_id(&cola.id).await.unwrap().unwrap();
        assert_eq!(product.stock_quantity, 5);

        let completed = service
            .complete_order(&cashier(), &opened.order.id, cash(2500))
            .await
            .unwrap();
        assert_eq!(completed.order.status, OrderStatus::Completed);
        assert_eq!(completed.order.change_cents, 300);
        assert_eq!(completed.order.payment_method, Some(PaymentMethod::Cash));
        assert!(completed.order.completed_at.is_some());

        let product = db.products().get_by_id(&cola.id).await.unwrap().unwrap();
        assert_eq!(product.stock_quantity, 3);
    }

    #[tokio::test]
    async fn test_short_payment_keeps_order_pending() {
        let db = memory_db().await;
        let cola = seed_product(&db, "COLA-1", 1000, 1000, Some(5)).await;
        let service = db.order_service();

        let opened = service
            .open_order(&cashier(), open_request(vec![line(&cola.id, 2)]))
            .await
            .unwrap();

        let err = service
            .complete_order(&cashier(), &opened.order.id, cash(2000))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Domain(CoreError::PaymentInsufficient { .. })
        ));

        let stored = service.get_order(&opened.order.id).await.unwrap();
        assert_eq!(stored.order.status, OrderStatus::Pending);
        assert_eq!(stored.order.amount_paid_cents, 0);
        let product = db.products().get_by_id(&cola.id).await.unwrap().unwrap();
        assert_eq!(product.stock_quantity, 5);
    }

    #[tokio::test]
    async fn test_empty_order_cannot_complete() {
        let db = memory_db().await;
        let service = db.order_service();

        let opened = service.open_order(&cashier(), open_request(vec![])).await.unwrap();
        assert!(opened.items.is_empty());
        assert_eq!(opened.order.total_cents, 0);

        let err = service
            .complete_order(&cashier(), &opened.order.id, cash(0))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Domain(CoreError::EmptyOrder(_))));
    }

    #[tokio::test]
    async fn test_completion_fails_closed_on_stock() {
        let db = memory_db().await;
        let tea = seed_product(&db, "TEA-1", 300, 0, Some(2)).await;
        let service = db.order_service();

        let opened = service
            .open_order(&cashier(), open_request(vec![line(&tea.id, 2)]))
            .await
            .unwrap();
        db.products().adjust_stock(&tea.id, -1).await.unwrap();

        let err = service
            .complete_order(&cashier(), &opened.order.id, cash(600))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Domain(CoreError::InsufficientStock { available: 1, .. })
        ));

        // The status update rolled back with the failed decrement.
        let stored = service.get_order(&opened.order.id).await.unwrap();
        assert_eq!(stored.order.status, OrderStatus::Pending);
    }

    #[tokio::test]
    async fn test_completion_uses_snapshot_prices() {
        let db = memory_db().await;
        let mut tea = seed_product(&db, "TEA-1", 300, 0, None).await;
        let service = db.order_service();

        let opened = service
            .open_order(&cashier(), open_request(vec![line(&tea.id, 1)]))
            .await
            .unwrap();

        tea.price_cents = 900;
        db.products().update(&tea).await.unwrap();

        let completed = service
            .complete_order(&cashier(), &opened.order.id, cash(300))
            .await
            .unwrap();
        assert_eq!(completed.order.total_cents, 300);
        assert_eq!(completed.items[0].unit_price_cents, 300);
    }

    #[tokio::test]
    async fn test_cancel_pending_order() {
        let db = memory_db().await;
        let tea = seed_product(&db, "TEA-1", 300, 0, Some(4)).await;
        let service = db.order_service();

        let opened = service
            .open_order(&cashier(), open_request(vec![line(&tea.id, 1)]))
            .await
            .unwrap();
        let cancelled = service.cancel_order(&cashier(), &opened.order.id).await.unwrap();
        assert_eq!(cancelled.status, OrderStatus::Cancelled);
        assert!(cancelled.cancelled_at.is_some());

        // Terminal: neither completion nor a second cancel is allowed.
        let err = service
            .complete_order(&cashier(), &opened.order.id, cash(300))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Domain(CoreError::InvalidTransition {
                from: OrderStatus::Cancelled,
                ..
            })
        ));
        assert!(service.cancel_order(&cashier(), &opened.order.id).await.is_err());

        let product = db.products().get_by_id(&tea.id).await.unwrap().unwrap();
        assert_eq!(product.stock_quantity, 4);
    }

    #[tokio::test]
    async fn test_completed_order_cannot_be_cancelled() {
        let db = memory_db().await;
        let tea = seed_product(&db, "TEA-1", 300, 0, None).await;
        let service = db.order_service();

        let opened = service
            .open_order(&cashier(), open_request(vec![line(&tea.id, 1)]))
            .await
            .unwrap();
        service
            .complete_order(&cashier(), &opened.order.id, cash(300))
            .await
            .unwrap();

        let err = service.cancel_order(&cashier(), &opened.order.id).await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Domain(CoreError::InvalidTransition {
                from: OrderStatus::Completed,
                to: OrderStatus::Cancelled,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_lookups() {
        let db = memory_db().await;
        let tea = seed_product(&db, "TEA-1", 300, 0, None).await;
        let service = db.order_service();

        let first = service
            .open_order(&cashier(), open_request(vec![line(&tea.id, 1)]))
            .await
            .unwrap();
        let second = service
            .open_order(&cashier(), open_request(vec![line(&tea.id, 2)]))
            .await
            .unwrap();
        service.cancel_order(&cashier(), &first.order.id).await.unwrap();

        let by_number = service.get_by_number(&second.order.order_number).await.unwrap();
        assert_eq!(by_number.order.id, second.order.id);
        assert_eq!(by_number.items.len(), 1);

        let recent = service.list_recent(None, 10).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].id, second.order.id);

        let cancelled = service.list_recent(Some(OrderStatus::Cancelled), 10).await.unwrap();
        assert_eq!(cancelled.len(), 1);
        assert_eq!(cancelled[0].id, first.order.id);

        assert!(matches!(
            service.get_order("missing").await,
            Err(ServiceError::Domain(CoreError::OrderNotFound(_)))
        ));
        assert!(matches!(
            service.cancel_order(&cashier(), "missing").await,
            Err(ServiceError::Domain(CoreError::OrderNotFound(_)))
        ));
    }

    async fn file_db(dir: &tempfile::TempDir) -> Database {
        Database::new(DbConfig::new(dir.path().join("orders.db")).max_connections(4))
            .await
            .unwrap()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_completions_of_same_order() {
        let dir = tempfile::tempdir().unwrap();
        let db = file_db(&dir).await;
        let last = seed_product(&db, "LAST-1", 500, 0, Some(1)).await;
        let opened = db
            .order_service()
            .open_order(&cashier(), open_request(vec![line(&last.id, 1)]))
            .await
            .unwrap();

        let a = db.order_service();
        let b = db.order_service();
        let actor = cashier();
        let (first, second) = tokio::join!(
            a.complete_order(&actor, &opened.order.id, cash(500)),
            b.complete_order(&actor, &opened.order.id, cash(500)),
        );

        let results = [first, second];
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert_eq!(
            results
                .iter()
                .filter(|r| matches!(
                    r,
                    Err(ServiceError::Domain(CoreError::InvalidTransition {
                        from: OrderStatus::Completed,
                        ..
                    }))
                ))
                .count(),
            1
        );

        // Stock left the shelf once.
        let product = db.products().get_by_id(&last.id).await.unwrap().unwrap();
        assert_eq!(product.stock_quantity, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_completions_compete_for_last_unit() {
        let dir = tempfile::tempdir().unwrap();
        let db = file_db(&dir).await;
        let last = seed_product(&db, "LAST-1", 500, 0, Some(1)).await;
        let service = db.order_service();
        let mine = service
            .open_order(&cashier(), open_request(vec![line(&last.id, 1)]))
            .await
            .unwrap();
        let theirs = service
            .open_order(&cashier(), open_request(vec![line(&last.id, 1)]))
            .await
            .unwrap();

        let a = db.order_service();
        let b = db.order_service();
        let actor = cashier();
        let (first, second) = tokio::join!(
            a.complete_order(&actor, &mine.order.id, cash(500)),
            b.complete_order(&actor, &theirs.order.id, cash(500)),
        );

        let results = [first, second];
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert_eq!(
            results
                .iter()
                .filter(|r| matches!(
                    r,
                    Err(ServiceError::Domain(CoreError::InsufficientStock { available: 0, .. }))
                ))
                .count(),
            1
        );

        let product = db.products().get_by_id(&last.id).await.unwrap().unwrap();
        assert_eq!(product.stock_quantity, 0);

        // The loser's status change rolled back with its decrement.
        let pending = db
            .orders()
            .list_by_status(OrderStatus::Pending, 10)
            .await
            .unwrap();
        assert_eq!(pending.len(), 1);
    }
}
