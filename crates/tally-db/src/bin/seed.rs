//! # Seed Data Generator
//!
//! Fills a development database with a catalog to ring up against.
//!
//! ## Usage
//! ```bash
//! # 500 products (default)
//! cargo run -p tally-db --bin seed
//!
//! cargo run -p tally-db --bin seed -- --count 2000 --db ./data/tally.db
//! ```
//!
//! ## Generated Products
//! - Shelf goods (tracked stock, 0 - 60 units, reorder level 5)
//! - Services such as gift wrap or delivery (untracked)
//! - SKU: `{AISLE}-{NAME}-{SEQ}`
//! - Tax rates: 0%, 5%, 8.25%, 10%

use chrono::Utc;
use std::env;
use tally_core::Product;
use tally_db::{Database, DbConfig};
use uuid::Uuid;

/// Tracked aisles and the goods stocked on them.
const AISLES: &[(&str, &[&str])] = &[
    (
        "BEV",
        &[
            "Cola",
            "Lemon Soda",
            "Sparkling Water",
            "Still Water",
            "Orange Juice",
            "Apple Juice",
            "Iced Tea",
            "Cold Brew",
            "Energy Drink",
            "Oat Milk",
        ],
    ),
    (
        "SNK",
        &[
            "Salted Crisps",
            "Paprika Crisps",
            "Pretzels",
            "Trail Mix",
            "Dark Chocolate",
            "Milk Chocolate",
            "Gummy Bears",
            "Oat Cookies",
            "Rice Cakes",
            "Popcorn",
        ],
    ),
    (
        "GRO",
        &[
            "Spaghetti",
            "Penne",
            "Basmati Rice",
            "Chickpeas",
            "Tomato Passata",
            "Peanut Butter",
            "Honey",
            "Rolled Oats",
            "Flour",
            "Sea Salt",
        ],
    ),
];

/// Untracked services sold at the register.
const SERVICES: &[(&str, i64)] = &[
    ("Gift Wrap", 250),
    ("Local Delivery", 599),
    ("Bag Fee", 10),
    ("Key Cutting", 450),
];

/// Pack sizes and their price addon in cents.
const SIZES: &[(&str, i64)] = &[("Single", 0), ("Twin Pack", 120), ("Family Pack", 340), ("Case", 900)];

/// Tax rates in basis points.
const TAX_RATES: &[u32] = &[0, 500, 825, 1000];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut count: usize = 500;
    let mut db_path = String::from("./tally_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(count);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Tally POS Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of shelf products to generate (default: 500)");
                println!("  -d, --db <PATH>    Database file path (default: ./tally_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("Tally POS Seed Data Generator");
    println!("=============================");
    println!("Database: {}", db_path);
    println!("Products: {} (+{} services)", count, SERVICES.len());
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected, migrations applied");

    let existing = db.products().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products, skipping.", existing);
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let start = std::time::Instant::now();
    let mut generated = 0;

    'aisles: for (aisle_idx, (aisle, goods)) in AISLES.iter().enumerate() {
        for (good_idx, name) in goods.iter().enumerate() {
            for (size_idx, (size, addon)) in SIZES.iter().enumerate() {
                if generated >= count {
                    break 'aisles;
                }

                let seq = aisle_idx * 1000 + good_idx * 10 + size_idx;
                let product = shelf_product(aisle, name, size, *addon, seq);
                if let Err(e) = db.products().insert(&product).await {
                    eprintln!("Failed to insert {}: {}", product.sku, e);
                    continue;
                }

                generated += 1;
                if generated % 100 == 0 {
                    println!("  Generated {} products...", generated);
                }
            }
        }
    }

    for (idx, (name, price_cents)) in SERVICES.iter().enumerate() {
        let product = service_product(name, *price_cents, idx);
        if let Err(e) = db.products().insert(&product).await {
            eprintln!("Failed to insert {}: {}", product.sku, e);
        }
    }

    let elapsed = start.elapsed();
    println!();
    println!("✓ Generated {} products in {:?}", generated, elapsed);

    let low = db.products().low_stock(1000).await?;
    println!("  Low stock at start: {}", low.len());
    println!("  Total in catalog: {}", db.products().count().await?);

    db.close().await;
    println!();
    println!("✓ Seed complete!");

    Ok(())
}

/// A tracked shelf product with deterministic pseudo-random values.
fn shelf_product(aisle: &str, name: &str, size: &str, addon: i64, seq: usize) -> Product {
    let now = Utc::now();
    let code: String = name
        .chars()
        .filter(|c| c.is_ascii_alphabetic())
        .take(4)
        .collect::<String>()
        .to_uppercase();

    let price_cents = 99 + ((seq * 37) % 900) as i64 + addon;

    Product {
        id: Uuid::new_v4().to_string(),
        sku: format!("{}-{}-{:04}", aisle, code, seq),
        barcode: Some(format!("200{:010}", seq)),
        name: format!("{} {}", name, size),
        description: None,
        price_cents,
        cost_cents: Some(price_cents * (55 + (seq % 25) as i64) / 100),
        tax_rate_bps: TAX_RATES[seq % TAX_RATES.len()],
        track_stock: true,
        stock_quantity: (seq % 61) as i64,
        min_stock_level: 5,
        max_stock_level: Some(120),
        is_active: true,
        created_at: now,
        updated_at: now,
    }
}

/// An untracked service line.
fn service_product(name: &str, price_cents: i64, idx: usize) -> Product {
    let now = Utc::now();

    Product {
        id: Uuid::new_v4().to_string(),
        sku: format!("SVC-{:03}", idx + 1),
        barcode: None,
        name: name.to_string(),
        description: Some("Service, no inventory".to_string()),
        price_cents,
        cost_cents: None,
        tax_rate_bps: 1000,
        track_stock: false,
        stock_quantity: 0,
        min_stock_level: 0,
        max_stock_level: None,
        is_active: true,
        created_at: now,
        updated_at: now,
    }
}
