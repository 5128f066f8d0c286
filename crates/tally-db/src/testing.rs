//! Fixtures shared by the repository and service tests.

use chrono::Utc;

use crate::pool::{Database, DbConfig};
use crate::repository::product::generate_product_id;
use tally_core::{Actor, CheckoutLine, CheckoutRequest, PaymentMethod, Product};

/// A product ready for insertion. `stock: None` makes it untracked.
pub fn new_product(sku: &str, price_cents: i64, tax_rate_bps: u32, stock: Option<i64>) -> Product {
    let now = Utc::now();
    Product {
        id: generate_product_id(),
        sku: sku.to_string(),
        barcode: None,
        name: format!("Test {}", sku),
        description: None,
        price_cents,
        cost_cents: None,
        tax_rate_bps,
        track_stock: stock.is_some(),
        stock_quantity: stock.unwrap_or(0),
        min_stock_level: if stock.is_some() { 2 } else { 0 },
        max_stock_level: None,
        is_active: true,
        created_at: now,
        updated_at: now,
    }
}

pub async fn memory_db() -> Database {
    Database::new(DbConfig::in_memory()).await.unwrap()
}

pub async fn seed_product(
    db: &Database,
    sku: &str,
    price_cents: i64,
    tax_rate_bps: u32,
    stock: Option<i64>,
) -> Product {
    db.products()
        .insert(&new_product(sku, price_cents, tax_rate_bps, stock))
        .await
        .unwrap()
}

pub fn cashier() -> Actor {
    Actor::new("cashier-1")
}

pub fn line(product_id: &str, quantity: i64) -> CheckoutLine {
    CheckoutLine {
        product_id: product_id.to_string(),
        quantity,
    }
}

/// Cash checkout without discount.
pub fn checkout_request(items: Vec<CheckoutLine>, amount_paid_cents: i64) -> CheckoutRequest {
    CheckoutRequest {
        items,
        customer_id: None,
        payment_method: PaymentMethod::Cash,
        amount_paid_cents,
        discount: None,
        notes: None,
    }
}
