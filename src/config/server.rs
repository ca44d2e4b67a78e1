use crate::core::{AppError, Result};
use std::env;

/// Server configuration for HTTP server
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: usize,
}

impl ServerConfig {
    pub fn new(host: String, port: u16) -> Self {
        Self {
            host,
            port,
            workers: default_workers(),
        }
    }

    pub fn from_env() -> Result<Self> {
        let host = env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("SERVER_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .map_err(|_| AppError::Configuration("Invalid SERVER_PORT".to_string()))?;

        let workers = match env::var("SERVER_WORKERS") {
            Ok(value) => value
                .parse()
                .map_err(|_| AppError::Configuration("Invalid SERVER_WORKERS".to_string()))?,
            Err(_) => default_workers(),
        };

        Ok(Self { host, port, workers })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}
