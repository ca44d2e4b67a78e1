use actix_web::{web, HttpResponse, Responder};
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;

use crate::config::StorageBackend;

/// Health check response structure
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub version: String,
    pub checks: HealthChecks,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthChecks {
    pub storage: String,
    pub database: String,
}

/// GET /health
///
/// Liveness plus storage check. With the MySQL backend a failed `SELECT 1`
/// turns the response into 503.
pub async fn health_check(
    backend: web::Data<StorageBackend>,
    pool: Option<web::Data<MySqlPool>>,
) -> impl Responder {
    let database = match pool {
        Some(pool) => match sqlx::query("SELECT 1").fetch_one(pool.get_ref()).await {
            Ok(_) => "healthy".to_string(),
            Err(e) => {
                tracing::error!(error = %e, "Database health check failed");
                "unhealthy".to_string()
            }
        },
        None => "not_configured".to_string(),
    };

    let healthy = database != "unhealthy";
    let response = HealthResponse {
        status: if healthy { "healthy" } else { "degraded" }.to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        checks: HealthChecks {
            storage: backend.to_string(),
            database,
        },
    };

    if healthy {
        HttpResponse::Ok().json(response)
    } else {
        HttpResponse::ServiceUnavailable().json(response)
    }
}

/// Configure health check routes
pub fn configure_health_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check));
}
