use std::env;
use std::time::Duration;

use serde::Deserialize;
use sqlx::mysql::{MySqlPool, MySqlPoolOptions};

use crate::core::{AppError, Result};

/// MySQL settings; only consulted when `STORAGE_BACKEND=mysql`
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub pool_size: u32,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
}

impl DatabaseConfig {
    pub fn from_env() -> Result<Self> {
        Ok(DatabaseConfig {
            url: env::var("DATABASE_URL").ok().filter(|url| !url.trim().is_empty()),
            pool_size: parse_var("DATABASE_POOL_SIZE", 10)?,
            max_connections: parse_var("DATABASE_MAX_CONNECTIONS", 20)?,
            acquire_timeout_secs: parse_var("DATABASE_ACQUIRE_TIMEOUT_SECS", 5)?,
        })
    }

    /// Connection target with the password masked, for logs
    pub fn redacted_url(&self) -> Option<String> {
        self.url.as_deref().map(redact)
    }

    /// Open the pool used by every MySQL repository and the counter store
    ///
    /// Counter increments hold a row lock for the length of a transaction, so
    /// a short acquire timeout surfaces an outage as `AllocationFailure`
    /// instead of queueing allocations behind it.
    pub async fn create_pool(&self) -> Result<MySqlPool> {
        let url = self
            .url
            .as_deref()
            .ok_or_else(|| AppError::Configuration("DATABASE_URL not set".to_string()))?;

        tracing::info!(
            target_db = ?self.redacted_url(),
            max_connections = self.max_connections,
            "Connecting to MySQL"
        );

        MySqlPoolOptions::new()
            .max_connections(self.max_connections)
            .min_connections(self.pool_size.min(self.max_connections))
            .acquire_timeout(Duration::from_secs(self.acquire_timeout_secs))
            .idle_timeout(Duration::from_secs(600))
            .test_before_acquire(true)
            .connect(url)
            .await
            .map_err(AppError::Database)
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> Result<T> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| AppError::Configuration(format!("Invalid {}: {}", name, raw))),
        Err(_) => Ok(default),
    }
}

fn redact(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_string();
    };
    match rest.split_once('@') {
        Some((credentials, host)) => {
            let user = credentials.split(':').next().unwrap_or_default();
            format!("{}://{}:***@{}", scheme, user, host)
        }
        None => url.to_string(),
    }
}
