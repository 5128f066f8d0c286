//! # Tally Register Library
//!
//! Headless command host for Tally POS: one JSON command per stdin line,
//! one JSON response per stdout line. Logs go to stderr.
//!
//! ## Module Organization
//! ```text
//! tally_register/
//! ├── lib.rs          ◄─── You are here (startup + command loop)
//! ├── state/
//! │   ├── db.rs       ◄─── Database state wrapper
//! │   └── config.rs   ◄─── Configuration state
//! ├── commands/       ◄─── Envelope dispatch and handlers
//! └── error.rs        ◄─── API error type for commands
//! ```
//!
//! ## Protocol
//! ```text
//! → {"command":"checkout","actor":"cashier-1","payload":{"items":[...],...}}
//! ← {"ok":true,"data":{"order":{...},"items":[...]}}
//!
//! → {"command":"refund_item","actor":"cashier-1","payload":{"line_item_id":"...","quantity":5,"reason":"x"}}
//! ← {"ok":false,"error":{"code":"REFUND_EXCEEDS_REMAINING","message":"...","details":{...}}}
//! ```

pub mod commands;
pub mod error;
pub mod state;

use directories::ProjectDirs;
use std::path::PathBuf;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, info, info_span, warn, Instrument};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use commands::{Envelope, Response};
use error::ApiError;
use state::{ConfigState, DbState};
use tally_db::{Database, DbConfig, DbError};

/// Errors that stop the register from starting or serving.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("database error: {0}")]
    Db(#[from] DbError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not determine app data directory")]
    NoDataDir,
}

/// Database plus configuration: everything a command can touch.
#[derive(Debug, Clone)]
pub struct Register {
    db: DbState,
    config: ConfigState,
}

impl Register {
    pub fn new(db: Database, config: ConfigState) -> Self {
        Register {
            db: DbState::new(db),
            config,
        }
    }

    /// Opens the configured database and applies migrations.
    pub async fn connect(config: ConfigState) -> Result<Self, HostError> {
        let db_path = match &config.db_path {
            Some(path) => path.clone(),
            None => default_database_path()?,
        };
        info!(?db_path, "Database path determined");

        let db = Database::new(DbConfig::new(db_path).max_connections(config.max_connections)).await?;
        info!("Database connected and migrations applied");

        Ok(Register::new(db, config))
    }

    pub fn db(&self) -> &DbState {
        &self.db
    }

    pub fn config(&self) -> &ConfigState {
        &self.config
    }

    /// Handles one input line and returns the response line (no newline).
    pub async fn handle_line(&self, line: &str) -> String {
        let response = match serde_json::from_str::<Envelope>(line) {
            Ok(envelope) => {
                let span = info_span!("command", request_id = %Uuid::new_v4(), command = %envelope.command);
                Response::from(
                    commands::dispatch(&self.db, &self.config, envelope)
                        .instrument(span)
                        .await,
                )
            }
            Err(e) => {
                warn!(error = %e, "Malformed command line");
                Response::failure(ApiError::invalid_input(format!("Malformed command: {}", e)))
            }
        };

        serde_json::to_string(&response).unwrap_or_else(|e| {
            format!(
                r#"{{"ok":false,"error":{{"code":"INTERNAL","message":"failed to encode response: {}","details":null}}}}"#,
                e.to_string().replace('"', "'")
            )
        })
    }

    /// Serves commands until `input` reaches EOF.
    pub async fn serve<R, W>(&self, input: R, mut output: W) -> Result<(), HostError>
    where
        R: tokio::io::AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = BufReader::new(input).lines();

        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }

            let response = self.handle_line(&line).await;
            output.write_all(response.as_bytes()).await?;
            output.write_all(b"\n").await?;
            output.flush().await?;
        }

        debug!("Input closed");
        Ok(())
    }
}

/// Runs the register on stdin/stdout.
///
/// ## Startup Sequence
/// 1. Initialize logging (stderr, `RUST_LOG` override)
/// 2. Load configuration from `TALLY_*` variables
/// 3. Open the database and run migrations
/// 4. Serve commands until stdin closes
pub async fn run() -> Result<(), HostError> {
    init_tracing();
    info!("Starting Tally POS register");

    let config = ConfigState::from_env();
    let register = Register::connect(config).await?;

    register.serve(tokio::io::stdin(), tokio::io::stdout()).await?;

    register.db().inner().close().await;
    info!("Register stopped");
    Ok(())
}

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=tally=trace` - Trace for tally crates only
/// - Default: `info,tally=debug,sqlx=warn`
fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,tally=debug,sqlx=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Platform data directory for the database file.
///
/// - **macOS**: `~/Library/Application Support/com.tally.pos/tally.db`
/// - **Windows**: `%APPDATA%\tally\pos\data\tally.db`
/// - **Linux**: `~/.local/share/pos/tally.db`
fn default_database_path() -> Result<PathBuf, HostError> {
    let proj_dirs = ProjectDirs::from("com", "tally", "pos").ok_or(HostError::NoDataDir)?;
    let data_dir = proj_dirs.data_dir();

    std::fs::create_dir_all(data_dir)?;

    Ok(data_dir.join("tally.db"))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::{json, Value};
    use tally_core::Product;

    async fn register() -> Register {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        Register::new(db, ConfigState::default())
    }

    async fn seed(register: &Register, sku: &str, price_cents: i64, tax_rate_bps: u32, stock: i64) -> String {
        let now = Utc::now();
        let product = Product {
            id: Uuid::new_v4().to_string(),
            sku: sku.to_string(),
            barcode: None,
            name: sku.to_string(),
            description: None,
            price_cents,
            cost_cents: None,
            tax_rate_bps,
            track_stock: true,
            stock_quantity: stock,
            min_stock_level: 2,
            max_stock_level: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        register.db().products().insert(&product).await.unwrap().id
    }

    async fn call(register: &Register, command: Value) -> Value {
        let line = register.handle_line(&command.to_string()).await;
        serde_json::from_str(&line).unwrap()
    }

    #[tokio::test]
    async fn test_checkout_then_partial_refund() {
        let register = register().await;
        let cola = seed(&register, "COLA-1", 1000, 1000, 10).await;

        let response = call(
            &register,
            json!({
                "command": "checkout",
                "actor": "cashier-1",
                "payload": {
                    "items": [{ "product_id": cola, "quantity": 2 }],
                    "payment_method": "cash",
                    "amount_paid_cents": 2000,
                    "discount": { "type": "numerical", "value": 500 }
                }
            }),
        )
        .await;

        assert_eq!(response["ok"], true, "{}", response);
        let order = &response["data"]["order"];
        assert_eq!(order["status"], "completed");
        assert_eq!(order["total_cents"], 1700);
        assert_eq!(order["change_cents"], 300);
        let line_id = response["data"]["items"][0]["id"].as_str().unwrap().to_string();

        let response = call(
            &register,
            json!({
                "command": "refund_item",
                "actor": "cashier-1",
                "payload": { "line_item_id": line_id, "quantity": 1, "reason": "damaged" }
            }),
        )
        .await;
        assert_eq!(response["ok"], true, "{}", response);
        assert_eq!(response["data"]["refunded_amount"], 1000);
        assert_eq!(response["data"]["order"]["status"], "completed");
        assert_eq!(response["data"]["order"]["remaining_quantity"], 1);

        let response = call(
            &register,
            json!({
                "command": "refund_item",
                "actor": "cashier-1",
                "payload": { "line_item_id": line_id, "quantity": 2, "reason": "damaged" }
            }),
        )
        .await;
        assert_eq!(response["ok"], false);
        assert_eq!(response["error"]["code"], "REFUND_EXCEEDS_REMAINING");
        assert_eq!(response["error"]["details"]["max_refundable"], 1);
    }

    #[tokio::test]
    async fn test_two_phase_order_flow() {
        let register = register().await;
        let tea = seed(&register, "TEA-1", 300, 0, 5).await;

        let opened = call(
            &register,
            json!({
                "command": "open_order",
                "actor": "cashier-2",
                "payload": { "items": [{ "product_id": tea, "quantity": 2 }] }
            }),
        )
        .await;
        assert_eq!(opened["data"]["order"]["status"], "pending");
        let order_id = opened["data"]["order"]["id"].as_str().unwrap().to_string();

        let short = call(
            &register,
            json!({
                "command": "complete_order",
                "actor": "cashier-2",
                "payload": { "order_id": order_id, "payment_method": "card", "amount_paid_cents": 100 }
            }),
        )
        .await;
        assert_eq!(short["error"]["code"], "PAYMENT_INSUFFICIENT");
        assert_eq!(short["error"]["details"]["shortfall_cents"], 500);

        let done = call(
            &register,
            json!({
                "command": "complete_order",
                "actor": "cashier-2",
                "payload": { "order_id": order_id, "payment_method": "card", "amount_paid_cents": 600 }
            }),
        )
        .await;
        assert_eq!(done["ok"], true, "{}", done);
        assert_eq!(done["data"]["order"]["status"], "completed");

        let number = done["data"]["order"]["order_number"].as_str().unwrap().to_string();
        let found = call(
            &register,
            json!({ "command": "get_order_by_number", "payload": { "order_number": number } }),
        )
        .await;
        assert_eq!(found["data"]["order"]["id"], order_id.as_str());

        let cancel = call(
            &register,
            json!({ "command": "cancel_order", "actor": "cashier-2", "payload": { "order_id": order_id } }),
        )
        .await;
        assert_eq!(cancel["error"]["code"], "INVALID_STATE");

        let listed = call(
            &register,
            json!({ "command": "list_orders", "payload": { "status": "completed" } }),
        )
        .await;
        assert_eq!(listed["data"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_stock_failure_and_product_commands() {
        let register = register().await;
        let last = seed(&register, "LAST-1", 500, 0, 1).await;

        let response = call(
            &register,
            json!({
                "command": "checkout",
                "actor": "cashier-1",
                "payload": {
                    "items": [{ "product_id": last, "quantity": 3 }],
                    "payment_method": "cash",
                    "amount_paid_cents": 5000
                }
            }),
        )
        .await;
        assert_eq!(response["error"]["code"], "INSUFFICIENT_STOCK");
        assert_eq!(response["error"]["details"]["available"], 1);

        let product = call(&register, json!({ "command": "get_product", "payload": { "sku": "LAST-1" } })).await;
        assert_eq!(product["data"]["stock_quantity"], 1);
        assert_eq!(product["data"]["is_low_stock"], true);

        let low = call(&register, json!({ "command": "low_stock" })).await;
        assert_eq!(low["data"].as_array().unwrap().len(), 1);

        let all = call(&register, json!({ "command": "list_products", "payload": { "limit": 10 } })).await;
        assert_eq!(all["data"].as_array().unwrap().len(), 1);

        let missing = call(&register, json!({ "command": "get_product", "payload": { "id": "nope" } })).await;
        assert_eq!(missing["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_envelope_errors() {
        let register = register().await;

        let line = register.handle_line("not json").await;
        let response: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(response["error"]["code"], "INVALID_INPUT");

        let response = call(&register, json!({ "command": "teleport" })).await;
        assert_eq!(response["error"]["code"], "INVALID_INPUT");

        let response = call(&register, json!({ "command": "checkout", "payload": {} })).await;
        assert_eq!(response["error"]["message"], "actor is required");

        let response = call(&register, json!({ "command": "get_config" })).await;
        assert_eq!(response["data"]["store_name"], "Tally POS Dev Store");
    }

    #[tokio::test]
    async fn test_serve_writes_one_line_per_command() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = ConfigState::default();
        config.db_path = Some(dir.path().join("register.db"));
        let register = Register::connect(config).await.unwrap();

        let input = b"{\"command\":\"get_config\"}\n\n{\"command\":\"list_orders\"}\n".to_vec();
        let mut output: Vec<u8> = Vec::new();
        register.serve(&input[..], &mut output).await.unwrap();

        let text = String::from_utf8(output).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        for line in lines {
            let response: Value = serde_json::from_str(line).unwrap();
            assert_eq!(response["ok"], true);
        }
    }
}
