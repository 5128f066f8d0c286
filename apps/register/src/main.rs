//! # Tally Register Entry Point
//!
//! ```bash
//! TALLY_DB_PATH=./tally_dev.db cargo run -p tally-register
//! {"command":"list_products"}
//! ```
//!
//! The command loop lives in lib.rs so it can be driven from tests.

#[tokio::main]
async fn main() {
    if let Err(e) = tally_register::run().await {
        eprintln!("tally-register: {}", e);
        std::process::exit(1);
    }
}
