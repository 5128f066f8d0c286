//! # Line-Item Calculator
//!
//! Computes a single order line's total and tax.
//!
//! ```text
//! unit_price ─┐
//!             ├─► total_price = unit_price × quantity        (exact, cents)
//! quantity ───┘         │
//!                       ▼
//! tax_rate ───────► tax_amount = round_half_up(total_price × rate / 100)
//! ```
//!
//! Tax is computed on the line total, not per unit, so `3 × $0.05` at 10%
//! yields 2 cents of tax rather than 3.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{Product, TaxRate};
use crate::validation::validate_tax_rate_bps;

/// Computed amounts for one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LineAmounts {
    pub total_price: Money,
    pub tax_amount: Money,
}

/// Calculates line total and tax.
///
/// Fails with `InvalidInput` if `quantity < 1`, `unit_price < 0` or the tax
/// rate is above 100%.
///
/// ```rust
/// use tally_core::money::Money;
/// use tally_core::pricing::calculate_line;
/// use tally_core::types::TaxRate;
///
/// let line = calculate_line(Money::from_cents(1000), 2, TaxRate::from_bps(1000)).unwrap();
/// assert_eq!(line.total_price.cents(), 2000);
/// assert_eq!(line.tax_amount.cents(), 200);
///
/// assert!(calculate_line(Money::from_cents(1000), 0, TaxRate::zero()).is_err());
/// ```
pub fn calculate_line(unit_price: Money, quantity: i64, tax_rate: TaxRate) -> CoreResult<LineAmounts> {
    if quantity < 1 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        }
        .into());
    }

    if unit_price.is_negative() {
        return Err(ValidationError::MustNotBeNegative {
            field: "unit_price".to_string(),
        }
        .into());
    }

    validate_tax_rate_bps(tax_rate.bps())?;

    let total_price = unit_price
        .checked_multiply_quantity(quantity)
        .ok_or_else(|| {
            CoreError::InvalidInput(ValidationError::OutOfRange {
                field: "line total".to_string(),
                min: 0,
                max: i64::MAX,
            })
        })?;

    Ok(LineAmounts {
        total_price,
        tax_amount: total_price.calculate_tax(tax_rate),
    })
}

/// A priced line with the product snapshot frozen at pricing time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LinePricing {
    pub product_id: String,
    pub product_name: String,
    pub sku: String,
    pub unit_price: Money,
    pub tax_rate: TaxRate,
    pub quantity: i64,
    pub amounts: LineAmounts,
}

/// Prices `quantity` units of `product` at its current price and tax rate.
pub fn price_line(product: &Product, quantity: i64) -> CoreResult<LinePricing> {
    let amounts = calculate_line(product.price(), quantity, product.tax_rate())?;

    Ok(LinePricing {
        product_id: product.id.clone(),
        product_name: product.name.clone(),
        sku: product.sku.clone(),
        unit_price: product.price(),
        tax_rate: product.tax_rate(),
        quantity,
        amounts,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::tests::sample_product;

    #[test]
    fn test_line_total_and_tax() {
        let line = calculate_line(Money::from_cents(1000), 2, TaxRate::from_bps(1000)).unwrap();
        assert_eq!(line.total_price, Money::from_cents(2000));
        assert_eq!(line.tax_amount, Money::from_cents(200));
    }

    #[test]
    fn test_tax_is_rounded_on_line_total() {
        // 3 × $0.05 = $0.15, 10% = 1.5 cents → 2 cents
        let line = calculate_line(Money::from_cents(5), 3, TaxRate::from_bps(1000)).unwrap();
        assert_eq!(line.total_price.cents(), 15);
        assert_eq!(line.tax_amount.cents(), 2);

        // $3.33 × 1 at 8.25% = 27.4725 cents → 27
        let line = calculate_line(Money::from_cents(333), 1, TaxRate::from_bps(825)).unwrap();
        assert_eq!(line.tax_amount.cents(), 27);
    }

    #[test]
    fn test_free_item_is_valid() {
        let line = calculate_line(Money::zero(), 4, TaxRate::from_bps(1000)).unwrap();
        assert!(line.total_price.is_zero());
        assert!(line.tax_amount.is_zero());
    }

    #[test]
    fn test_rejects_invalid_quantity_and_price() {
        assert!(matches!(
            calculate_line(Money::from_cents(100), 0, TaxRate::zero()),
            Err(CoreError::InvalidInput(ValidationError::MustBePositive { .. }))
        ));
        assert!(matches!(
            calculate_line(Money::from_cents(-1), 1, TaxRate::zero()),
            Err(CoreError::InvalidInput(ValidationError::MustNotBeNegative { .. }))
        ));
        assert!(matches!(
            calculate_line(Money::from_cents(100), 1, TaxRate::from_bps(10_001)),
            Err(CoreError::InvalidInput(ValidationError::OutOfRange { .. }))
        ));
    }

    #[test]
    fn test_rejects_overflowing_total() {
        assert!(calculate_line(Money::from_cents(i64::MAX), 2, TaxRate::zero()).is_err());
    }

    #[test]
    fn test_price_line_snapshots_product() {
        let product = sample_product(true, 10);
        let line = price_line(&product, 3).unwrap();

        assert_eq!(line.product_id, product.id);
        assert_eq!(line.sku, "COKE-330");
        assert_eq!(line.unit_price.cents(), 1000);
        assert_eq!(line.amounts.total_price.cents(), 3000);
        assert_eq!(line.amounts.tax_amount.cents(), 300);
    }
}
