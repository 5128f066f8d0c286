//! # API Error Type
//!
//! Unified error type for register commands.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Command Function  →  Result<T, ApiError>                               │
//! │                                                                         │
//! │  ServiceError::Domain(CoreError) ──┐                                    │
//! │  ServiceError::Db(DbError) ────────┼──► ApiError { code, message,       │
//! │  malformed envelope / payload ─────┘               details }            │
//! │                                                                         │
//! │  stdout: {"ok":false,"error":{"code":"INSUFFICIENT_STOCK",              │
//! │           "message":"...","details":{"available":1,...}}}               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Storage failures are logged in full and reported with a generic message.

use serde::Serialize;
use serde_json::{json, Value};
use tally_core::CoreError;
use tally_db::{DbError, ServiceError};
use thiserror::Error;

/// API error returned from register commands.
///
/// ```json
/// {
///   "code": "REFUND_EXCEEDS_REMAINING",
///   "message": "Refund of 2 exceeds remaining quantity on line ...",
///   "details": { "line_item_id": "...", "requested": 2, "max_refundable": 1 }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Error)]
#[error("[{code:?}] {message}")]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,

    /// Structured context, e.g. available vs requested stock
    pub details: Option<Value>,
}

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Product, order or line item not found
    NotFound,

    /// Malformed command, payload or field values
    InvalidInput,

    InsufficientStock,

    PaymentInsufficient,

    RefundExceedsRemaining,

    /// Order status does not allow the operation
    InvalidState,

    /// Duplicate key (e.g. SKU)
    Conflict,

    /// Database operation failed
    DatabaseError,

    Internal,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn not_found(resource: &str, id: &str) -> Self {
        ApiError::new(ErrorCode::NotFound, format!("{} not found: {}", resource, id))
            .with_details(json!({ "resource": resource, "id": id }))
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::InvalidInput, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Internal, message)
    }
}

/// Converts database errors to API errors.
impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => ApiError::not_found(&entity, &id),
            DbError::UniqueViolation { field, value } => {
                ApiError::new(ErrorCode::Conflict, format!("{} '{}' already exists", field, value))
                    .with_details(json!({ "field": field, "value": value }))
            }
            DbError::InvalidRecord(e) => ApiError::invalid_input(e.to_string()),
            DbError::ForeignKeyViolation { message } => {
                tracing::error!("Foreign key violation: {}", message);
                ApiError::invalid_input("Invalid reference")
            }
            DbError::CheckViolation { message } => {
                tracing::error!("Constraint violation: {}", message);
                ApiError::invalid_input("Value violates a storage constraint")
            }
            DbError::ConnectionFailed(_) => ApiError::new(ErrorCode::DatabaseError, "Database connection failed"),
            DbError::MigrationFailed(_) => ApiError::new(ErrorCode::DatabaseError, "Database migration failed"),
            DbError::QueryFailed(e) => {
                tracing::error!("Database query failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
            DbError::Busy => ApiError::new(ErrorCode::DatabaseError, "Database is busy, retry the operation"),
            DbError::PoolExhausted => ApiError::new(ErrorCode::DatabaseError, "Database pool exhausted"),
            DbError::Internal(e) => {
                tracing::error!("Internal database error: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
        }
    }
}

/// Converts core errors to API errors.
impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        let message = err.to_string();
        match err {
            CoreError::InvalidInput(e) => ApiError::invalid_input(e.to_string()),
            CoreError::InsufficientStock {
                product_id,
                sku,
                available,
                requested,
            } => ApiError::new(ErrorCode::InsufficientStock, message).with_details(json!({
                "product_id": product_id,
                "sku": sku,
                "available": available,
                "requested": requested,
            })),
            CoreError::PaymentInsufficient { total, paid, shortfall } => {
                ApiError::new(ErrorCode::PaymentInsufficient, message).with_details(json!({
                    "total_cents": total.cents(),
                    "paid_cents": paid.cents(),
                    "shortfall_cents": shortfall.cents(),
                }))
            }
            CoreError::RefundExceedsRemaining {
                line_item_id,
                requested,
                max_refundable,
                max_refundable_amount,
            } => ApiError::new(ErrorCode::RefundExceedsRemaining, message).with_details(json!({
                "line_item_id": line_item_id,
                "requested": requested,
                "max_refundable": max_refundable,
                "max_refundable_amount_cents": max_refundable_amount.cents(),
            })),
            CoreError::InvalidTransition { order_id, from, to } => {
                ApiError::new(ErrorCode::InvalidState, message).with_details(json!({
                    "order_id": order_id,
                    "from": from,
                    "to": to,
                }))
            }
            CoreError::EmptyOrder(order_id) => {
                ApiError::new(ErrorCode::InvalidState, message).with_details(json!({ "order_id": order_id }))
            }
            CoreError::ProductNotFound(id) => ApiError::not_found("Product", &id),
            CoreError::OrderNotFound(id) => ApiError::not_found("Order", &id),
            CoreError::LineItemNotFound(id) => ApiError::not_found("Order line", &id),
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Domain(e) => e.into(),
            ServiceError::Db(e) => e.into(),
        }
    }
}
