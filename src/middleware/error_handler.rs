use actix_web::{error::JsonPayloadError, HttpRequest};

use crate::core::AppError;

/// Render malformed or unknown-field JSON bodies in the standard error shape
pub fn json_error_handler(err: JsonPayloadError, req: &HttpRequest) -> actix_web::Error {
    tracing::warn!(path = %req.path(), error = %err, "Rejected request body");

    let message = match &err {
        JsonPayloadError::Deserialize(e) => format!("Invalid request body: {}", e),
        JsonPayloadError::ContentType => "Expected Content-Type: application/json".to_string(),
        other => format!("Invalid request body: {}", other),
    };

    AppError::validation(message).into()
}

/// Standard JSON extractor configuration for every route
pub fn json_config() -> actix_web::web::JsonConfig {
    actix_web::web::JsonConfig::default()
        .limit(256 * 1024)
        .error_handler(json_error_handler)
}
