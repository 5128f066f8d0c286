//! # Repository Module
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Repository struct (owns a pool clone)     reads and single-statement  │
//! │  ├── ProductRepository                     catalog operations          │
//! │  └── OrderRepository                                                    │
//! │                                                                         │
//! │  Free functions (take &mut SqliteConnection)                           │
//! │  └── run inside a service's transaction: pass `&mut *tx`               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! - [`ProductRepository`](product::ProductRepository) - Catalog CRUD, stock adjustments, low-stock report
//! - [`OrderRepository`](order::OrderRepository) - Order and line item lookups

pub mod order;
pub mod product;
