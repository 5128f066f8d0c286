//! # State Module
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Register                                                               │
//! │  ├── DbState       Database pool + service accessors (thread-safe)      │
//! │  └── ConfigState   store / currency / pool settings (read-only)         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Commands take only the state they need.

mod config;
mod db;

pub use config::ConfigState;
pub use db::DbState;
