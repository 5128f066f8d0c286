//! # Order Commands
//!
//! ## Two Ways to Ring Up
//! ```text
//! checkout ───────────────────────────────────────────► completed
//!
//! open_order ──► pending ──complete_order──► completed
//!                   │
//!                   └──cancel_order──► cancelled
//! ```
//!
//! Every mutating command needs the envelope's `actor`.

use serde::Deserialize;
use tracing::{debug, info};

use crate::error::ApiError;
use crate::state::{ConfigState, DbState};
use tally_core::{Actor, CheckoutRequest, OpenOrderRequest, Order, OrderDetail, OrderStatus, PaymentRequest};

const DEFAULT_LIMIT: u32 = 20;
const MAX_LIMIT: u32 = 200;

#[derive(Debug, Clone, Deserialize)]
pub struct OrderIdArgs {
    pub order_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrderNumberArgs {
    pub order_number: String,
}

/// `{"order_id": "...", "payment_method": "cash", "amount_paid_cents": 2000}`
#[derive(Debug, Clone, Deserialize)]
pub struct CompleteOrderArgs {
    pub order_id: String,
    #[serde(flatten)]
    pub payment: PaymentRequest,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListOrdersArgs {
    #[serde(default)]
    pub status: Option<OrderStatus>,
    #[serde(default)]
    pub limit: Option<u32>,
}

/// One-shot checkout.
pub async fn checkout(
    db: &DbState,
    config: &ConfigState,
    actor: &Actor,
    request: CheckoutRequest,
) -> Result<OrderDetail, ApiError> {
    debug!(lines = request.items.len(), "checkout command");

    let detail = db.checkout().checkout(actor, request).await?;
    info!(
        order_number = %detail.order.order_number,
        total = %config.format_currency(detail.order.total_cents),
        change = %config.format_currency(detail.order.change_cents),
        "checkout command complete"
    );
    Ok(detail)
}

pub async fn open_order(db: &DbState, actor: &Actor, request: OpenOrderRequest) -> Result<OrderDetail, ApiError> {
    debug!(lines = request.items.len(), "open_order command");
    Ok(db.orders().open_order(actor, request).await?)
}

pub async fn complete_order(
    db: &DbState,
    config: &ConfigState,
    actor: &Actor,
    args: CompleteOrderArgs,
) -> Result<OrderDetail, ApiError> {
    debug!(order_id = %args.order_id, "complete_order command");

    let detail = db.orders().complete_order(actor, &args.order_id, args.payment).await?;
    info!(
        order_number = %detail.order.order_number,
        total = %config.format_currency(detail.order.total_cents),
        "complete_order command complete"
    );
    Ok(detail)
}

pub async fn cancel_order(db: &DbState, actor: &Actor, args: OrderIdArgs) -> Result<Order, ApiError> {
    debug!(order_id = %args.order_id, "cancel_order command");
    Ok(db.orders().cancel_order(actor, &args.order_id).await?)
}

pub async fn get_order(db: &DbState, args: OrderIdArgs) -> Result<OrderDetail, ApiError> {
    debug!(order_id = %args.order_id, "get_order command");
    Ok(db.orders().get_order(&args.order_id).await?)
}

pub async fn get_order_by_number(db: &DbState, args: OrderNumberArgs) -> Result<OrderDetail, ApiError> {
    debug!(order_number = %args.order_number, "get_order_by_number command");
    Ok(db.orders().get_by_number(args.order_number.trim()).await?)
}

/// Newest first, optionally filtered by status.
pub async fn list_orders(db: &DbState, args: ListOrdersArgs) -> Result<Vec<Order>, ApiError> {
    let limit = args.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    debug!(status = ?args.status, limit, "list_orders command");
    Ok(db.orders().list_recent(args.status, limit).await?)
}
