//! # Stock Adjustment (pure part)
//!
//! Aggregates requested quantities per product and checks them against a
//! product snapshot. The authoritative check happens in storage, where the
//! sufficiency test and the decrement are one conditional `UPDATE`; this
//! module gives services a cheap early rejection and the error shape.
//!
//! ```text
//! lines ──► StockDemand { prod-a: 3, prod-b: 1 } ──► check_available(product, 3)
//!                    │                                        │
//!                    ▼                                        ▼
//!        one decrement per product                 InsufficientStock { .. }
//! ```

use std::collections::BTreeMap;

use crate::error::{CoreError, CoreResult};
use crate::types::Product;

/// Requested quantity per product id, summed across order lines.
///
/// Ordered by product id so that storage updates always touch rows in the
/// same order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StockDemand {
    quantities: BTreeMap<String, i64>,
}

impl StockDemand {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `quantity` units of `product_id` to the demand.
    pub fn add(&mut self, product_id: impl Into<String>, quantity: i64) {
        *self.quantities.entry(product_id.into()).or_insert(0) += quantity;
    }

    /// Total quantity requested for a product (0 when absent).
    pub fn requested(&self, product_id: &str) -> i64 {
        self.quantities.get(product_id).copied().unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, i64)> {
        self.quantities.iter().map(|(id, qty)| (id.as_str(), *qty))
    }

    pub fn len(&self) -> usize {
        self.quantities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quantities.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, i64)> for StockDemand {
    fn from_iter<I: IntoIterator<Item = (S, i64)>>(iter: I) -> Self {
        let mut demand = StockDemand::new();
        for (product_id, quantity) in iter {
            demand.add(product_id, quantity);
        }
        demand
    }
}

/// Fails with `InsufficientStock` if a tracked product holds fewer than
/// `requested` units. Untracked products always pass.
///
/// ```rust
/// # use chrono::Utc;
/// # use tally_core::types::Product;
/// use tally_core::stock::check_available;
/// # let now = Utc::now();
/// # let product = Product {
/// #     id: "p1".into(), sku: "MILK-1L".into(), barcode: None, name: "Milk".into(),
/// #     description: None, price_cents: 199, cost_cents: None, tax_rate_bps: 0,
/// #     track_stock: true, stock_quantity: 3, min_stock_level: 0, max_stock_level: None,
/// #     is_active: true, created_at: now, updated_at: now,
/// # };
///
/// assert!(check_available(&product, 3).is_ok());
/// assert!(check_available(&product, 4).is_err());
/// ```
pub fn check_available(product: &Product, requested: i64) -> CoreResult<()> {
    if product.can_sell(requested) {
        return Ok(());
    }

    Err(insufficient(product, requested))
}

/// Builds the `InsufficientStock` error for a product.
pub fn insufficient(product: &Product, requested: i64) -> CoreError {
    CoreError::InsufficientStock {
        product_id: product.id.clone(),
        sku: product.sku.clone(),
        available: product.stock_quantity,
        requested,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::tests::sample_product;

    #[test]
    fn test_demand_aggregates_duplicate_lines() {
        let demand: StockDemand = vec![("prod-b", 1), ("prod-a", 2), ("prod-a", 3)]
            .into_iter()
            .collect();

        assert_eq!(demand.len(), 2);
        assert_eq!(demand.requested("prod-a"), 5);
        assert_eq!(demand.requested("prod-b"), 1);
        assert_eq!(demand.requested("prod-z"), 0);

        let order: Vec<&str> = demand.iter().map(|(id, _)| id).collect();
        assert_eq!(order, vec!["prod-a", "prod-b"]);
    }

    #[test]
    fn test_check_available_tracked() {
        let product = sample_product(true, 3);
        assert!(check_available(&product, 3).is_ok());

        match check_available(&product, 5) {
            Err(CoreError::InsufficientStock {
                sku,
                available,
                requested,
                ..
            }) => {
                assert_eq!(sku, "COKE-330");
                assert_eq!(available, 3);
                assert_eq!(requested, 5);
            }
            other => panic!("expected InsufficientStock, got {:?}", other),
        }
    }

    #[test]
    fn test_check_available_untracked_always_passes() {
        let product = sample_product(false, 0);
        assert!(check_available(&product, 10_000).is_ok());
    }
}
