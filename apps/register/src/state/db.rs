//! # Database State
//!
//! Wraps the `Database` handle shared by every command.
//!
//! The pool inside `Database` is thread-safe, so commands run concurrently
//! without explicit locking. Services are cheap to build: each holds a pool
//! clone.

use tally_db::{CheckoutService, Database, OrderService, ProductRepository, RefundService};

#[derive(Debug, Clone)]
pub struct DbState {
    db: Database,
}

impl DbState {
    pub fn new(db: Database) -> Self {
        DbState { db }
    }

    pub fn inner(&self) -> &Database {
        &self.db
    }

    pub fn products(&self) -> ProductRepository {
        self.db.products()
    }

    pub fn checkout(&self) -> CheckoutService {
        self.db.checkout()
    }

    pub fn orders(&self) -> OrderService {
        self.db.order_service()
    }

    pub fn refunds(&self) -> RefundService {
        self.db.refunds()
    }
}
