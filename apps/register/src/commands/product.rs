//! # Product Commands
//!
//! Catalog lookups for the register: browse, single product, low stock.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ApiError;
use crate::state::DbState;
use tally_core::Product;

const DEFAULT_LIMIT: u32 = 50;
const MAX_LIMIT: u32 = 200;

/// Product as shown at the register.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductDto {
    pub id: String,
    pub sku: String,
    pub barcode: Option<String>,
    pub name: String,
    pub price_cents: i64,
    pub tax_rate_bps: u32,
    pub track_stock: bool,
    /// Always 0 for untracked products.
    pub stock_quantity: i64,
    pub is_low_stock: bool,
    pub is_active: bool,
    pub updated_at: DateTime<Utc>,
}

impl From<Product> for ProductDto {
    fn from(p: Product) -> Self {
        ProductDto {
            is_low_stock: p.is_low_stock(),
            id: p.id,
            sku: p.sku,
            barcode: p.barcode,
            name: p.name,
            price_cents: p.price_cents,
            tax_rate_bps: p.tax_rate_bps,
            track_stock: p.track_stock,
            stock_quantity: p.stock_quantity,
            is_active: p.is_active,
            updated_at: p.updated_at,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListProductsArgs {
    #[serde(default)]
    pub limit: Option<u32>,
}

/// Lookup by id or SKU; id wins when both are given.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GetProductArgs {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub sku: Option<String>,
}

fn clamp_limit(limit: Option<u32>) -> u32 {
    limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
}

/// Active products ordered by name.
pub async fn list_products(db: &DbState, args: ListProductsArgs) -> Result<Vec<ProductDto>, ApiError> {
    let limit = clamp_limit(args.limit);
    debug!(limit, "list_products command");

    let products = db.products().list_active(limit).await?;
    Ok(products.into_iter().map(ProductDto::from).collect())
}

pub async fn get_product(db: &DbState, args: GetProductArgs) -> Result<ProductDto, ApiError> {
    debug!(id = ?args.id, sku = ?args.sku, "get_product command");

    let product = match (args.id, args.sku) {
        (Some(id), _) => db
            .products()
            .get_by_id(&id)
            .await?
            .ok_or_else(|| ApiError::not_found("Product", &id))?,
        (None, Some(sku)) => db
            .products()
            .get_by_sku(&sku)
            .await?
            .ok_or_else(|| ApiError::not_found("Product", &sku))?,
        (None, None) => return Err(ApiError::invalid_input("id or sku is required")),
    };

    Ok(ProductDto::from(product))
}

/// Tracked products at or below their reorder level.
pub async fn low_stock(db: &DbState, args: ListProductsArgs) -> Result<Vec<ProductDto>, ApiError> {
    let limit = clamp_limit(args.limit);
    debug!(limit, "low_stock command");

    let products = db.products().low_stock(limit).await?;
    Ok(products.into_iter().map(ProductDto::from).collect())
}
