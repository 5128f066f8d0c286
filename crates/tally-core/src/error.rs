//! # Error Types
//!
//! Domain-specific error types for tally-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  tally-core errors (this file)                                         │
//! │  ├── CoreError        - Business rule failures                         │
//! │  └── ValidationError  - Input validation failures (InvalidInput)       │
//! │                                                                         │
//! │  tally-db errors (separate crate)                                      │
//! │  ├── DbError          - Database operation failures                    │
//! │  └── ServiceError     - CoreError | DbError from a service call        │
//! │                                                                         │
//! │  register app                                                          │
//! │  └── ApiError         - What callers see (serialized)                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every `CoreError` is recoverable: the caller corrects the input and
//! resubmits. None of them leave partial state behind.

use thiserror::Error;

use crate::money::Money;
use crate::types::OrderStatus;

// =============================================================================
// Core Error
// =============================================================================

/// Business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Malformed quantities, prices or fields. Rejected before any mutation.
    #[error("Invalid input: {0}")]
    InvalidInput(#[from] ValidationError),

    /// Stock guard failure.
    ///
    /// ## User Workflow
    /// ```text
    /// Checkout (qty: 5)
    ///      │
    ///      ▼
    /// Conditional decrement: available=3
    ///      │
    ///      ▼
    /// InsufficientStock { sku: "COKE", available: 3, requested: 5 }
    ///      │
    ///      ▼
    /// Transaction rolled back, nothing decremented
    /// ```
    #[error("Insufficient stock for {sku}: available {available}, requested {requested}")]
    InsufficientStock {
        product_id: String,
        sku: String,
        available: i64,
        requested: i64,
    },

    /// Amount paid does not cover the order total. The order stays pending.
    #[error("Payment insufficient: total {total}, paid {paid}, short by {shortfall}")]
    PaymentInsufficient {
        total: Money,
        paid: Money,
        shortfall: Money,
    },

    /// Refund would push refunded quantity past the sold quantity.
    #[error(
        "Refund of {requested} exceeds remaining quantity on line {line_item_id} (max refundable: {max_refundable}, {max_refundable_amount})"
    )]
    RefundExceedsRemaining {
        line_item_id: String,
        requested: i64,
        max_refundable: i64,
        /// `unit_price × max_refundable`.
        max_refundable_amount: Money,
    },

    /// Order is not in a state that allows the requested transition.
    #[error("Order {order_id} cannot move from {from} to {to}")]
    InvalidTransition {
        order_id: String,
        from: OrderStatus,
        to: OrderStatus,
    },

    /// An order without line items cannot be completed.
    #[error("Order {0} has no line items")]
    EmptyOrder(String),

    #[error("Product not found: {0}")]
    ProductNotFound(String),

    #[error("Order not found: {0}")]
    OrderNotFound(String),

    #[error("Order line item not found: {0}")]
    LineItemNotFound(String),
}

impl CoreError {
    /// Shorthand for an `InvalidTransition` error.
    pub fn invalid_transition(order_id: impl Into<String>, from: OrderStatus, to: OrderStatus) -> Self {
        CoreError::InvalidTransition {
            order_id: order_id.into(),
            from,
            to,
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Produced by the validation pre-step of every typed request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Invalid format (e.g., invalid UUID).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Collection must not be empty.
    #[error("{field} must contain at least one entry")]
    Empty { field: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
