//! # Order Totals Engine
//!
//! Aggregates computed line items into order-level totals.
//!
//! ## Calculation Order
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  lines ──► subtotal = Σ total_price                                     │
//! │        └─► tax      = Σ line tax   (pre-discount, per line)             │
//! │                                                                         │
//! │  discount ──► numerical:  max(0, value)            (may exceed subtotal)│
//! │           └─► percentage: subtotal × clamp(value, 0..100%)              │
//! │                                                                         │
//! │  total  = max(0, subtotal + tax − discount)                             │
//! │  change = max(0, paid − total)                                          │
//! │  sufficient = paid ≥ total                                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The discount is a flat reduction of the tax-inclusive total. It does not
//! shrink the taxable base and is not spread across lines.

use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::{Money, BPS_SCALE};
use crate::pricing::LineAmounts;
use crate::types::OrderItem;

// =============================================================================
// Discount
// =============================================================================

/// Discount kind as stored on the order row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum DiscountType {
    Numerical,
    Percentage,
}

impl fmt::Display for DiscountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiscountType::Numerical => f.write_str("numerical"),
            DiscountType::Percentage => f.write_str("percentage"),
        }
    }
}

/// A discount specification.
///
/// Serialized as `{"type": "numerical", "value": 500}` (cents) or
/// `{"type": "percentage", "value": 5000}` (basis points, 5000 = 50%).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Discount {
    /// Flat amount in cents.
    Numerical(i64),
    /// Percentage of subtotal in basis points.
    Percentage(i64),
}

impl Discount {
    /// No discount.
    pub const fn none() -> Self {
        Discount::Numerical(0)
    }

    pub const fn kind(&self) -> DiscountType {
        match self {
            Discount::Numerical(_) => DiscountType::Numerical,
            Discount::Percentage(_) => DiscountType::Percentage,
        }
    }

    /// Raw value as supplied (cents or basis points).
    pub const fn value(&self) -> i64 {
        match self {
            Discount::Numerical(v) | Discount::Percentage(v) => *v,
        }
    }

    /// Rebuilds a discount from its stored columns.
    pub fn from_parts(kind: Option<DiscountType>, value: i64) -> Self {
        match kind {
            Some(DiscountType::Percentage) => Discount::Percentage(value),
            Some(DiscountType::Numerical) | None => Discount::Numerical(value),
        }
    }

    /// Value with the clamp rules applied: percentage to [0, 10000] bps,
    /// numerical to ≥ 0.
    pub fn clamped(&self) -> Self {
        match *self {
            Discount::Numerical(v) => Discount::Numerical(v.max(0)),
            Discount::Percentage(v) => Discount::Percentage(v.clamp(0, BPS_SCALE)),
        }
    }

    /// Discount amount against a subtotal.
    ///
    /// ```rust
    /// use tally_core::money::Money;
    /// use tally_core::totals::Discount;
    ///
    /// let subtotal = Money::from_cents(2000);
    /// assert_eq!(Discount::Percentage(5000).amount(subtotal).cents(), 1000);
    /// assert_eq!(Discount::Numerical(2500).amount(subtotal).cents(), 2500);
    /// assert_eq!(Discount::Percentage(15_000).amount(subtotal).cents(), 2000);
    /// ```
    pub fn amount(&self, subtotal: Money) -> Money {
        match self.clamped() {
            Discount::Numerical(cents) => Money::from_cents(cents),
            Discount::Percentage(bps) => subtotal.percentage_bps(bps as u32),
        }
    }
}

impl Default for Discount {
    fn default() -> Self {
        Discount::none()
    }
}

// =============================================================================
// Order Totals
// =============================================================================

/// Aggregated totals for an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderTotals {
    pub subtotal: Money,
    pub tax_amount: Money,
    pub discount_amount: Money,
    pub total_amount: Money,
    pub amount_paid: Money,
    pub change_amount: Money,
    pub is_payment_sufficient: bool,
}

impl OrderTotals {
    /// How much more the customer must pay (zero when sufficient).
    pub fn shortfall(&self) -> Money {
        (self.total_amount - self.amount_paid).floor_zero()
    }

    /// Fails with `PaymentInsufficient` when paid < total.
    pub fn ensure_payment_sufficient(&self) -> CoreResult<()> {
        if self.is_payment_sufficient {
            return Ok(());
        }

        Err(CoreError::PaymentInsufficient {
            total: self.total_amount,
            paid: self.amount_paid,
            shortfall: self.shortfall(),
        })
    }
}

/// Computes order totals from priced lines.
///
/// An empty slice produces all-zero totals; completion guards reject such
/// orders separately. Sums that leave the `i64` cent range fail with
/// `InvalidInput` instead of wrapping.
pub fn compute_totals(lines: &[LineAmounts], discount: Discount, amount_paid: Money) -> CoreResult<OrderTotals> {
    let subtotal = checked_sum(lines.iter().map(|l| l.total_price), "subtotal")?;
    let tax_amount = checked_sum(lines.iter().map(|l| l.tax_amount), "tax")?;
    let discount_amount = discount.amount(subtotal);
    let total_amount = subtotal
        .checked_add(tax_amount)
        .and_then(|gross| gross.checked_sub(discount_amount))
        .ok_or_else(|| out_of_range("total"))?
        .floor_zero();
    let change_amount = amount_paid
        .checked_sub(total_amount)
        .ok_or_else(|| out_of_range("change"))?
        .floor_zero();

    Ok(OrderTotals {
        subtotal,
        tax_amount,
        discount_amount,
        total_amount,
        amount_paid,
        change_amount,
        is_payment_sufficient: amount_paid >= total_amount,
    })
}

fn checked_sum(mut amounts: impl Iterator<Item = Money>, field: &str) -> CoreResult<Money> {
    amounts.try_fold(Money::zero(), |acc, m| acc.checked_add(m).ok_or_else(|| out_of_range(field)))
}

fn out_of_range(field: &str) -> CoreError {
    CoreError::InvalidInput(ValidationError::OutOfRange {
        field: field.to_string(),
        min: 0,
        max: i64::MAX,
    })
}

/// Line amounts of stored order items, for recomputing totals.
pub fn line_amounts_of(items: &[OrderItem]) -> Vec<LineAmounts> {
    items
        .iter()
        .map(|item| LineAmounts {
            total_price: item.total_price(),
            tax_amount: Money::from_cents(item.tax_cents),
        })
        .collect()
}

// =============================================================================
// Unit Tests
// =============================================================================
