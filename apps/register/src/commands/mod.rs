//! # Commands Module
//!
//! Everything the register accepts on its command stream.
//!
//! ## Command Organization
//! ```text
//! commands/
//! ├── mod.rs      ◄─── Envelope parsing and dispatch
//! ├── order.rs    ◄─── checkout, open/complete/cancel, lookups
//! ├── refund.rs   ◄─── refund_item, refund_order
//! ├── product.rs  ◄─── list_products, get_product, low_stock
//! └── config.rs   ◄─── get_config
//! ```
//!
//! ## Command Flow
//! ```text
//! {"command":"refund_item","actor":"cashier-1","payload":{...}}
//!        │
//!        ▼
//! dispatch() ── unknown command / bad payload ──► INVALID_INPUT
//!        │
//!        ▼ typed payload (serde)
//! refund::refund_item(db, config, actor, RefundRequest)
//!        │
//!        ▼
//! serde_json::Value ──► {"ok":true,"data":...}
//! ```

pub mod config;
pub mod order;
pub mod product;
pub mod refund;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ApiError;
use crate::state::{ConfigState, DbState};
use tally_core::Actor;

/// One line of input.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope {
    pub command: String,
    /// Staff user performing the command. Required by mutating commands.
    #[serde(default)]
    pub actor: Option<String>,
    #[serde(default)]
    pub payload: Value,
}

/// One line of output.
#[derive(Debug, Clone, Serialize)]
pub struct Response {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
}

impl Response {
    pub fn success(data: Value) -> Self {
        Response {
            ok: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failure(error: ApiError) -> Self {
        Response {
            ok: false,
            data: None,
            error: Some(error),
        }
    }
}

impl From<Result<Value, ApiError>> for Response {
    fn from(result: Result<Value, ApiError>) -> Self {
        match result {
            Ok(data) => Response::success(data),
            Err(err) => Response::failure(err),
        }
    }
}

/// Routes an envelope to its command.
pub async fn dispatch(db: &DbState, config: &ConfigState, envelope: Envelope) -> Result<Value, ApiError> {
    let Envelope {
        command,
        actor,
        payload,
    } = envelope;

    match command.as_str() {
        "checkout" => {
            let actor = require_actor(actor)?;
            to_value(order::checkout(db, config, &actor, parse(payload)?).await?)
        }
        "open_order" => {
            let actor = require_actor(actor)?;
            to_value(order::open_order(db, &actor, parse(payload)?).await?)
        }
        "complete_order" => {
            let actor = require_actor(actor)?;
            to_value(order::complete_order(db, config, &actor, parse(payload)?).await?)
        }
        "cancel_order" => {
            let actor = require_actor(actor)?;
            to_value(order::cancel_order(db, &actor, parse(payload)?).await?)
        }
        "refund_item" => {
            let actor = require_actor(actor)?;
            to_value(refund::refund_item(db, config, &actor, parse(payload)?).await?)
        }
        "refund_order" => {
            let actor = require_actor(actor)?;
            to_value(refund::refund_order(db, config, &actor, parse(payload)?).await?)
        }
        "get_order" => to_value(order::get_order(db, parse(payload)?).await?),
        "get_order_by_number" => to_value(order::get_order_by_number(db, parse(payload)?).await?),
        "list_orders" => to_value(order::list_orders(db, parse_or_default(payload)?).await?),
        "list_products" => to_value(product::list_products(db, parse_or_default(payload)?).await?),
        "get_product" => to_value(product::get_product(db, parse(payload)?).await?),
        "low_stock" => to_value(product::low_stock(db, parse_or_default(payload)?).await?),
        "get_config" => to_value(config::get_config(config)),
        other => Err(ApiError::invalid_input(format!("Unknown command: {}", other))),
    }
}

fn require_actor(actor: Option<String>) -> Result<Actor, ApiError> {
    match actor {
        Some(user_id) if !user_id.trim().is_empty() => Ok(Actor::new(user_id.trim())),
        _ => Err(ApiError::invalid_input("actor is required")),
    }
}

fn parse<T: DeserializeOwned>(payload: Value) -> Result<T, ApiError> {
    serde_json::from_value(payload).map_err(|e| ApiError::invalid_input(format!("Invalid payload: {}", e)))
}

/// Like [`parse`], but a missing payload means "all defaults".
fn parse_or_default<T: DeserializeOwned + Default>(payload: Value) -> Result<T, ApiError> {
    if payload.is_null() {
        return Ok(T::default());
    }
    parse(payload)
}

fn to_value<T: Serialize>(value: T) -> Result<Value, ApiError> {
    serde_json::to_value(value).map_err(|e| ApiError::internal(format!("Failed to encode response: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_defaults() {
        let envelope: Envelope = serde_json::from_str(r#"{"command":"get_config"}"#).unwrap();
        assert_eq!(envelope.command, "get_config");
        assert!(envelope.actor.is_none());
        assert!(envelope.payload.is_null());
    }

    #[test]
    fn test_actor_is_required_and_trimmed() {
        assert!(require_actor(None).is_err());
        assert!(require_actor(Some("  ".into())).is_err());
        assert_eq!(require_actor(Some(" cashier-1 ".into())).unwrap().user_id, "cashier-1");
    }

    #[test]
    fn test_payload_errors_are_invalid_input() {
        let err = parse::<order::OrderIdArgs>(json!({ "id": 1 })).unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::InvalidInput);

        let args: product::ListProductsArgs = parse_or_default(Value::Null).unwrap();
        assert!(args.limit.is_none());
    }

    #[test]
    fn test_response_shape() {
        let ok = serde_json::to_value(Response::success(json!({ "n": 1 }))).unwrap();
        assert_eq!(ok, json!({ "ok": true, "data": { "n": 1 } }));

        let err = serde_json::to_value(Response::failure(ApiError::invalid_input("bad"))).unwrap();
        assert_eq!(err["ok"], false);
        assert_eq!(err["error"]["code"], "INVALID_INPUT");
        assert!(err.get("data").is_none());
    }
}
