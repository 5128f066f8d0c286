//! # Domain Types
//!
//! Core domain types used throughout Tally POS.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │      Order      │   │   OrderItem     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  sku (business) │   │  order_number   │   │  order_id (FK)  │       │
//! │  │  price_cents    │   │  status         │   │  *_snapshot     │       │
//! │  │  track_stock    │   │  total_cents    │   │  refunded_qty   │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    TaxRate      │   │  OrderStatus    │   │ PaymentMethod   │       │
//! │  │  bps (u32)      │   │  Pending        │   │  Cash           │       │
//! │  │  1000 = 10%     │   │  Completed      │   │  Card           │       │
//! │  └─────────────────┘   │  Cancelled      │   │  Digital        │       │
//! │                        │  Refunded       │   │  Mixed          │       │
//! │                        └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has:
//! - `id`: UUID v4 - immutable, used for database relations
//! - Business ID: (sku, order_number) - human-readable

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::money::Money;
use crate::totals::DiscountType;

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// 1 basis point = 0.01%, so 1000 bps = 10% and 10000 bps = 100%.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Upper bound: 100%.
    pub const MAX_BPS: u32 = 10_000;

    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::zero()
    }
}

// =============================================================================
// Actor
// =============================================================================

/// Identifies who is performing an operation.
///
/// Passed explicitly into every mutating operation instead of being read
/// from ambient session state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Actor {
    /// The cashier / staff user id.
    pub user_id: String,
}

impl Actor {
    pub fn new(user_id: impl Into<String>) -> Self {
        Actor {
            user_id: user_id.into(),
        }
    }
}

// =============================================================================
// Product
// =============================================================================

/// A product available for sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Stock Keeping Unit - business identifier (unique).
    pub sku: String,

    /// Barcode (EAN-13, UPC-A, etc.).
    pub barcode: Option<String>,

    /// Display name shown to cashier and on receipt.
    pub name: String,

    pub description: Option<String>,

    /// Price in cents.
    pub price_cents: i64,

    /// Cost in cents (for margin reporting).
    pub cost_cents: Option<i64>,

    /// Tax rate in basis points (1000 = 10%).
    pub tax_rate_bps: u32,

    /// Whether inventory is tracked for this product.
    pub track_stock: bool,

    /// Current stock level. Always 0 when `track_stock` is false.
    pub stock_quantity: i64,

    /// Reorder threshold for low-stock reporting.
    pub min_stock_level: i64,

    pub max_stock_level: Option<i64>,

    /// Whether product is active (soft delete).
    pub is_active: bool,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    #[inline]
    pub fn tax_rate(&self) -> TaxRate {
        TaxRate::from_bps(self.tax_rate_bps)
    }

    /// Checks if the product can be sold in the given quantity.
    pub fn can_sell(&self, quantity: i64) -> bool {
        !self.track_stock || self.stock_quantity >= quantity
    }

    /// Tracked product at or below its reorder threshold.
    pub fn is_low_stock(&self) -> bool {
        self.track_stock && self.stock_quantity <= self.min_stock_level
    }

    /// Applies the untracked-stock invariant: untracked products hold 0.
    pub fn normalized(mut self) -> Self {
        if !self.track_stock {
            self.stock_quantity = 0;
        }
        self
    }
}

// =============================================================================
// Order Status
// =============================================================================

/// The status of an order. Transitions live in [`crate::lifecycle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Order is open; items and totals may be attached.
    Pending,
    /// Paid and stock decremented.
    Completed,
    /// Abandoned before completion.
    Cancelled,
    /// Every unit of every line has been refunded.
    Refunded,
}

impl OrderStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Refunded => "refunded",
        }
    }
}

impl Default for OrderStatus {
    fn default() -> Self {
        OrderStatus::Pending
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Payment Method
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Card,
    Digital,
    /// Split tender across several methods.
    Mixed,
}

impl PaymentMethod {
    pub const fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Card => "card",
            PaymentMethod::Digital => "digital",
            PaymentMethod::Mixed => "mixed",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Order
// =============================================================================

/// An order (sale transaction). Owns its [`OrderItem`]s.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Order {
    pub id: String,
    /// Human-readable number, e.g. `ORD-20260131-0001`.
    pub order_number: String,
    pub customer_id: Option<String>,
    /// Cashier who opened the order.
    pub user_id: String,
    pub status: OrderStatus,
    pub subtotal_cents: i64,
    pub tax_cents: i64,
    pub discount_type: Option<DiscountType>,
    /// Raw discount input: cents for numerical, basis points for percentage.
    pub discount_value: i64,
    pub discount_cents: i64,
    pub total_cents: i64,
    pub payment_method: Option<PaymentMethod>,
    pub amount_paid_cents: i64,
    pub change_cents: i64,
    /// Aggregate of all refunds recorded against this order.
    pub refund_cents: i64,
    pub refund_reason: Option<String>,
    pub refunded_by: Option<String>,
    #[ts(as = "Option<String>")]
    pub refunded_at: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub completed_at: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub cancelled_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Order {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    #[inline]
    pub fn refund_amount(&self) -> Money {
        Money::from_cents(self.refund_cents)
    }
}

// =============================================================================
// Order Item
// =============================================================================

/// A line item in an order.
///
/// Uses the snapshot pattern: name, sku, unit price and tax rate are frozen
/// at creation and never follow later product edits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct OrderItem {
    pub id: String,
    pub order_id: String,
    /// Reference only; the product may change or disappear independently.
    pub product_id: String,
    pub product_name: String,
    pub sku: String,
    pub unit_price_cents: i64,
    pub quantity: i64,
    /// unit_price × quantity.
    pub total_price_cents: i64,
    pub tax_rate_bps: u32,
    pub tax_cents: i64,
    pub refunded_quantity: i64,
    pub refund_reason: Option<String>,
    pub refunded_by: Option<String>,
    #[ts(as = "Option<String>")]
    pub refunded_at: Option<DateTime<Utc>>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl OrderItem {
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    #[inline]
    pub fn total_price(&self) -> Money {
        Money::from_cents(self.total_price_cents)
    }

    /// Quantity not yet refunded.
    #[inline]
    pub fn remaining_quantity(&self) -> i64 {
        self.quantity - self.refunded_quantity
    }

    #[inline]
    pub fn is_fully_refunded(&self) -> bool {
        self.remaining_quantity() == 0
    }
}

// =============================================================================
// Aggregates
// =============================================================================

/// An order together with its line items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderDetail {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

/// Order-level refund state returned alongside a refunded line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderRefundSummary {
    pub order_id: String,
    pub order_number: String,
    pub status: OrderStatus,
    pub total_cents: i64,
    pub refund_cents: i64,
    /// Units still refundable across all lines.
    pub remaining_quantity: i64,
}

impl OrderRefundSummary {
    pub fn from_detail(order: &Order, items: &[OrderItem]) -> Self {
        OrderRefundSummary {
            order_id: order.id.clone(),
            order_number: order.order_number.clone(),
            status: order.status,
            total_cents: order.total_cents,
            refund_cents: order.refund_cents,
            remaining_quantity: crate::refund::remaining_units(items),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
