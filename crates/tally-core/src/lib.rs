//! # tally-core: Pure Business Logic for Tally POS
//!
//! This crate holds the order arithmetic of Tally POS as pure functions
//! with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tally POS Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              apps/register (command host)                       │   │
//! │  │    checkout, complete_order, refund_item, cancel_order ...      │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               tally-db (transactions + repositories)            │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ tally-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   money ─► pricing ─► totals ─► lifecycle                       │   │
//! │  │                 │                   ▲                           │   │
//! │  │                 ▼                   │                           │   │
//! │  │               stock              refund                         │   │
//! │  │                                                                 │   │
//! │  │   request + validation: typed, checked input for every op      │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Order, OrderItem, statuses)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`pricing`] - Line-item calculator
//! - [`totals`] - Order totals engine (subtotal, tax, discount, change)
//! - [`stock`] - Stock demand aggregation and availability checks
//! - [`refund`] - Refund ledger rules
//! - [`lifecycle`] - Order status state machine
//! - [`request`] - Typed operation inputs
//! - [`error`] - Domain error types
//! - [`validation`] - Field-level validation
//!
//! ## Example Usage
//!
//! ```rust
//! use tally_core::money::Money;
//! use tally_core::pricing::calculate_line;
//! use tally_core::totals::{compute_totals, Discount};
//! use tally_core::types::TaxRate;
//!
//! let line = calculate_line(Money::from_cents(1000), 2, TaxRate::from_bps(1000)).unwrap();
//! let totals = compute_totals(&[line], Discount::Numerical(500), Money::from_cents(2000)).unwrap();
//!
//! assert_eq!(totals.total_amount.cents(), 1700);
//! assert_eq!(totals.change_amount.cents(), 300);
//! ```

pub mod error;
pub mod lifecycle;
pub mod money;
pub mod pricing;
pub mod refund;
pub mod request;
pub mod stock;
pub mod totals;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use lifecycle::{guard_completion, OrderEvent};
pub use money::Money;
pub use pricing::{calculate_line, price_line, LineAmounts, LinePricing};
pub use refund::{plan_refund, OrderRefundReceipt, RefundPlan, RefundReceipt};
pub use request::{
    CheckoutLine, CheckoutRequest, OpenOrderRequest, OrderRefundRequest, PaymentRequest,
    RefundRequest,
};
pub use stock::{check_available, StockDemand};
pub use totals::{compute_totals, Discount, DiscountType, OrderTotals};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum line items allowed in a single order.
pub const MAX_ORDER_LINES: usize = 100;

/// Maximum quantity of a single line.
///
/// Prevents accidental over-ordering (typing 1000 instead of 10).
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Maximum length of a refund reason.
pub const MAX_REASON_LENGTH: usize = 500;

/// Maximum length of free-form order notes.
pub const MAX_NOTES_LENGTH: usize = 1000;
