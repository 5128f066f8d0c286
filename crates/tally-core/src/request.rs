//! # Typed Requests
//!
//! Inputs to every mutating operation. Each request has a `validate()`
//! step that runs before anything touches storage and returns a normalized
//! copy (trimmed ids and text, blank notes dropped) or a [`ValidationError`].
//!
//! ```rust
//! use tally_core::request::{CheckoutLine, CheckoutRequest};
//! use tally_core::types::PaymentMethod;
//!
//! let request = CheckoutRequest {
//!     items: vec![CheckoutLine { product_id: " prod-1 ".into(), quantity: 2 }],
//!     customer_id: None,
//!     payment_method: PaymentMethod::Cash,
//!     amount_paid_cents: 2000,
//!     discount: None,
//!     notes: Some("   ".into()),
//! };
//!
//! let valid = request.validate().unwrap();
//! assert_eq!(valid.items[0].product_id, "prod-1");
//! assert_eq!(valid.notes, None);
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;
use crate::stock::StockDemand;
use crate::totals::Discount;
use crate::types::PaymentMethod;
use crate::validation::{
    validate_amount_paid, validate_line_count, validate_notes, validate_quantity, validate_reason,
    validate_reference, ValidationResult,
};

// =============================================================================
// Order Lines
// =============================================================================

/// One requested cart line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CheckoutLine {
    pub product_id: String,
    pub quantity: i64,
}

impl CheckoutLine {
    fn validate(self) -> ValidationResult<Self> {
        validate_reference("product_id", &self.product_id)?;
        validate_quantity(self.quantity)?;
        Ok(CheckoutLine {
            product_id: self.product_id.trim().to_string(),
            quantity: self.quantity,
        })
    }
}

fn validate_lines(lines: Vec<CheckoutLine>, allow_empty: bool) -> ValidationResult<Vec<CheckoutLine>> {
    validate_line_count(lines.len(), allow_empty)?;
    lines.into_iter().map(CheckoutLine::validate).collect()
}

fn normalize_optional_id(field: &str, value: Option<String>) -> ValidationResult<Option<String>> {
    match value {
        None => Ok(None),
        Some(v) if v.trim().is_empty() => Ok(None),
        Some(v) => {
            validate_reference(field, &v)?;
            Ok(Some(v.trim().to_string()))
        }
    }
}

/// Per-product demand of a set of lines.
pub fn stock_demand(lines: &[CheckoutLine]) -> StockDemand {
    lines
        .iter()
        .map(|line| (line.product_id.as_str(), line.quantity))
        .collect()
}

// =============================================================================
// Checkout
// =============================================================================

/// One-shot checkout: price, pay and complete in a single call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CheckoutRequest {
    pub items: Vec<CheckoutLine>,
    #[serde(default)]
    pub customer_id: Option<String>,
    pub payment_method: PaymentMethod,
    pub amount_paid_cents: i64,
    #[serde(default)]
    pub discount: Option<Discount>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl CheckoutRequest {
    pub fn validate(self) -> ValidationResult<Self> {
        validate_amount_paid(self.amount_paid_cents)?;
        Ok(CheckoutRequest {
            items: validate_lines(self.items, false)?,
            customer_id: normalize_optional_id("customer_id", self.customer_id)?,
            payment_method: self.payment_method,
            amount_paid_cents: self.amount_paid_cents,
            discount: self.discount,
            notes: validate_notes(self.notes.as_deref())?,
        })
    }

    pub fn amount_paid(&self) -> Money {
        Money::from_cents(self.amount_paid_cents)
    }

    pub fn discount(&self) -> Discount {
        self.discount.unwrap_or_default()
    }
}

// =============================================================================
// Two-Phase Orders
// =============================================================================

/// Opens a pending order. Items may be empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OpenOrderRequest {
    #[serde(default)]
    pub items: Vec<CheckoutLine>,
    #[serde(default)]
    pub customer_id: Option<String>,
    #[serde(default)]
    pub discount: Option<Discount>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl OpenOrderRequest {
    pub fn validate(self) -> ValidationResult<Self> {
        Ok(OpenOrderRequest {
            items: validate_lines(self.items, true)?,
            customer_id: normalize_optional_id("customer_id", self.customer_id)?,
            discount: self.discount,
            notes: validate_notes(self.notes.as_deref())?,
        })
    }

    pub fn discount(&self) -> Discount {
        self.discount.unwrap_or_default()
    }
}

/// Payment used to complete a pending order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PaymentRequest {
    pub payment_method: PaymentMethod,
    pub amount_paid_cents: i64,
}

impl PaymentRequest {
    pub fn validate(self) -> ValidationResult<Self> {
        validate_amount_paid(self.amount_paid_cents)?;
        Ok(self)
    }

    pub fn amount_paid(&self) -> Money {
        Money::from_cents(self.amount_paid_cents)
    }
}

// =============================================================================
// Refunds
// =============================================================================

/// Refunds part or all of one order line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RefundRequest {
    pub line_item_id: String,
    pub quantity: i64,
    pub reason: String,
    /// Put the refunded units back on the shelf (tracked products only).
    #[serde(default)]
    pub restock: bool,
}

impl RefundRequest {
    pub fn validate(self) -> ValidationResult<Self> {
        validate_reference("line_item_id", &self.line_item_id)?;
        if self.quantity < 1 {
            return Err(ValidationError::MustBePositive {
                field: "quantity".to_string(),
            });
        }
        Ok(RefundRequest {
            line_item_id: self.line_item_id.trim().to_string(),
            quantity: self.quantity,
            reason: validate_reason(&self.reason)?,
            restock: self.restock,
        })
    }
}

/// Refunds every remaining unit of an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderRefundRequest {
    pub order_id: String,
    pub reason: String,
    #[serde(default)]
    pub restock: bool,
}

impl OrderRefundRequest {
    pub fn validate(self) -> ValidationResult<Self> {
        validate_reference("order_id", &self.order_id)?;
        Ok(OrderRefundRequest {
            order_id: self.order_id.trim().to_string(),
            reason: validate_reason(&self.reason)?,
            restock: self.restock,
        })
    }
}
