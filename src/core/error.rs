use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use rust_decimal::Decimal;

use crate::core::money::format_amount;

/// Application-wide Result type
pub type Result<T> = std::result::Result<T, AppError>;

/// Main application error type
///
/// Every billing rejection has its own variant so callers can render a
/// distinct message per kind instead of parsing strings.
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    /// Bad numeric input on a line item (caller re-prompts)
    #[error("Invalid line item: {0}")]
    InvalidLineItem(String),

    /// Counter store unreachable or refused the increment
    #[error("Document number allocation failed: {0}")]
    AllocationFailure(String),

    /// Receipt requested for an amount that is not a full settlement
    #[error("Amount mismatch: expected {expected}, got {actual}")]
    AmountMismatch { expected: Decimal, actual: Decimal },

    /// Customer fields needed to deliver a receipt are absent
    #[error("Missing delivery info: {}", .0.join(", "))]
    MissingDeliveryInfo(Vec<String>),

    /// Validation errors for business rules
    #[error("Validation error: {0}")]
    Validation(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Operation conflicts with the current document state
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Database operation errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration errors
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Stable machine-readable identifier for the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::InvalidLineItem(_) => "INVALID_LINE_ITEM",
            AppError::AllocationFailure(_) => "ALLOCATION_FAILURE",
            AppError::AmountMismatch { .. } => "AMOUNT_MISMATCH",
            AppError::MissingDeliveryInfo(_) => "MISSING_DELIVERY_INFO",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Conflict(_) => "CONFLICT",
            AppError::Database(_) => "DATABASE_ERROR",
            AppError::Migration(_) => "MIGRATION_ERROR",
            AppError::Configuration(_) => "CONFIGURATION_ERROR",
            AppError::Json(_) => "JSON_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let status_code = self.status_code();
        let error_message = self.to_string();

        let mut body = serde_json::json!({
            "error": {
                "kind": self.kind(),
                "message": error_message,
                "code": status_code.as_u16(),
            }
        });

        match self {
            AppError::AmountMismatch { expected, actual } => {
                body["error"]["expected"] = serde_json::json!(format_amount(*expected));
                body["error"]["actual"] = serde_json::json!(format_amount(*actual));
            }
            AppError::MissingDeliveryInfo(fields) => {
                body["error"]["fields"] = serde_json::json!(fields);
            }
            _ => {}
        }

        HttpResponse::build(status_code).json(body)
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidLineItem(_) => StatusCode::BAD_REQUEST,
            AppError::AllocationFailure(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::AmountMismatch { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::MissingDeliveryInfo(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Migration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Json(_) => StatusCode::BAD_REQUEST,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

// Helper functions for common error scenarios
impl AppError {
    pub fn invalid_line_item(msg: impl Into<String>) -> Self {
        AppError::InvalidLineItem(msg.into())
    }

    pub fn allocation_failure(msg: impl Into<String>) -> Self {
        AppError::AllocationFailure(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        AppError::NotFound(resource.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        AppError::Conflict(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        AppError::Internal(msg.into())
    }
}
