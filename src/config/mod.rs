use crate::core::{AppError, Result};
use std::collections::BTreeMap;
use std::env;
use std::fmt;
use std::str::FromStr;

pub mod database;
pub mod server;

pub use database::DatabaseConfig;
pub use server::ServerConfig;

/// Main application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub billing: BillingConfig,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub env: String,
    pub log_level: String,
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(AppError::Configuration(format!("Invalid LOG_FORMAT '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Memory,
    MySql,
}

impl FromStr for StorageBackend {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(StorageBackend::Memory),
            "mysql" => Ok(StorageBackend::MySql),
            other => Err(AppError::Configuration(format!(
                "Invalid STORAGE_BACKEND '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageBackend::Memory => write!(f, "memory"),
            StorageBackend::MySql => write!(f, "mysql"),
        }
    }
}

/// Billing policy shared by the invoice, ledger and receipt services
#[derive(Debug, Clone)]
pub struct BillingConfig {
    pub storage_backend: StorageBackend,
    /// Round-off policy when a request does not say
    pub default_apply_round_off: bool,
    /// Issue flagged fallback numbers when the counter store is unreachable
    pub allow_unconfirmed_numbers: bool,
    /// Upper-cased company name → document number prefix
    pub company_prefixes: BTreeMap<String, String>,
}

impl Default for BillingConfig {
    fn default() -> Self {
        let mut company_prefixes = BTreeMap::new();
        company_prefixes.insert("WYENFOS".to_string(), "WNF".to_string());

        Self {
            storage_backend: StorageBackend::Memory,
            default_apply_round_off: false,
            allow_unconfirmed_numbers: true,
            company_prefixes,
        }
    }
}

impl BillingConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let company_prefixes = match env::var("COMPANY_PREFIXES") {
            Ok(raw) => parse_company_prefixes(&raw)?,
            Err(_) => defaults.company_prefixes,
        };

        Ok(Self {
            storage_backend: env::var("STORAGE_BACKEND")
                .unwrap_or_else(|_| "memory".to_string())
                .parse()?,
            default_apply_round_off: parse_bool("DEFAULT_APPLY_ROUND_OFF", false)?,
            allow_unconfirmed_numbers: parse_bool("ALLOW_UNCONFIRMED_NUMBERS", true)?,
            company_prefixes,
        })
    }

    /// Resolve the document prefix for a company name (case-insensitive)
    pub fn prefix_for(&self, company_name: &str) -> Option<&str> {
        self.company_prefixes
            .get(&company_name.trim().to_uppercase())
            .map(String::as_str)
    }
}

/// Parse `NAME=PREFIX,NAME=PREFIX`
pub fn parse_company_prefixes(raw: &str) -> Result<BTreeMap<String, String>> {
    let mut prefixes = BTreeMap::new();

    for pair in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (name, prefix) = pair.split_once('=').ok_or_else(|| {
            AppError::Configuration(format!("Invalid COMPANY_PREFIXES entry '{}'", pair))
        })?;

        let (name, prefix) = (name.trim(), prefix.trim());
        if name.is_empty() || prefix.is_empty() {
            return Err(AppError::Configuration(format!(
                "Invalid COMPANY_PREFIXES entry '{}'",
                pair
            )));
        }

        prefixes.insert(name.to_uppercase(), prefix.to_uppercase());
    }

    Ok(prefixes)
}

fn parse_bool(var: &str, default: bool) -> Result<bool> {
    match env::var(var) {
        Ok(value) => match value.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" => Ok(false),
            _ => Err(AppError::Configuration(format!("Invalid {}", var))),
        },
        Err(_) => Ok(default),
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present
        dotenvy::dotenv().ok();

        let config = Config {
            app: AppConfig {
                env: env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
                log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
                log_format: env::var("LOG_FORMAT")
                    .unwrap_or_else(|_| "pretty".to_string())
                    .parse()?,
            },
            database: DatabaseConfig::from_env()?,
            server: ServerConfig::from_env()?,
            billing: BillingConfig::from_env()?,
        };

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.billing.storage_backend == StorageBackend::MySql && self.database.url.is_none() {
            return Err(AppError::Configuration(
                "DATABASE_URL must be set when STORAGE_BACKEND=mysql".to_string(),
            ));
        }

        if self.database.max_connections == 0 {
            return Err(AppError::Configuration(
                "Database max connections must be greater than 0".to_string(),
            ));
        }

        if self.server.workers == 0 {
            return Err(AppError::Configuration(
                "Server workers must be greater than 0".to_string(),
            ));
        }

        if self.billing.company_prefixes.is_empty() {
            return Err(AppError::Configuration(
                "At least one company prefix must be configured".to_string(),
            ));
        }

        Ok(())
    }
}
