//! Application configuration loaded from environment variables.

use std::str::FromStr;
use std::time::Duration;

use event_bus::BusConfig;

/// Where documents are persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreBackend {
    #[default]
    Memory,
    Postgres,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "memory" => Ok(StoreBackend::Memory),
            "postgres" | "postgresql" => Ok(StoreBackend::Postgres),
            other => Err(format!("unknown store backend: {other}")),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" | "pretty" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format: {other}")),
        }
    }
}

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`, `PORT`: bind address (default `0.0.0.0:3000`)
/// - `RUST_LOG`: tracing filter directive (default `info`)
/// - `LOG_FORMAT`: `text` or `json` (default `text`)
/// - `STORE_BACKEND`: `memory` or `postgres` (default `memory`)
/// - `DATABASE_URL`, `DATABASE_MAX_CONNECTIONS`: PostgreSQL connection
/// - `CONSUMER_WORKERS`: workers per subscription (default 10)
/// - `QUEUE_CAPACITY`, `MAX_DELIVERIES`, `REDELIVERY_DELAY_MS`: bus delivery
/// - `SHUTDOWN_GRACE_SECS`: graceful shutdown bound (default 30)
///
/// Unparseable values fall back to the default.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub store_backend: StoreBackend,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub consumer_workers: usize,
    pub queue_capacity: usize,
    pub max_deliveries: u32,
    pub redelivery_delay: Duration,
    pub shutdown_grace: Duration,
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: std::env::var("HOST").unwrap_or(defaults.host),
            port: env_or("PORT", defaults.port),
            log_level: std::env::var("RUST_LOG").unwrap_or(defaults.log_level),
            log_format: env_or("LOG_FORMAT", defaults.log_format),
            store_backend: env_or("STORE_BACKEND", defaults.store_backend),
            database_url: std::env::var("DATABASE_URL").ok().filter(|u| !u.is_empty()),
            database_max_connections: env_or(
                "DATABASE_MAX_CONNECTIONS",
                defaults.database_max_connections,
            ),
            consumer_workers: env_or("CONSUMER_WORKERS", defaults.consumer_workers).max(1),
            queue_capacity: env_or("QUEUE_CAPACITY", defaults.queue_capacity).max(1),
            max_deliveries: env_or("MAX_DELIVERIES", defaults.max_deliveries).max(1),
            redelivery_delay: Duration::from_millis(env_or("REDELIVERY_DELAY_MS", 500)),
            shutdown_grace: Duration::from_secs(env_or("SHUTDOWN_GRACE_SECS", 30)),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Delivery settings for the event bus.
    pub fn bus_config(&self) -> BusConfig {
        BusConfig {
            queue_capacity: self.queue_capacity,
            max_deliveries: self.max_deliveries,
            redelivery_delay: self.redelivery_delay,
            record_published: false,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            store_backend: StoreBackend::Memory,
            database_url: None,
            database_max_connections: 10,
            consumer_workers: 10,
            queue_capacity: 256,
            max_deliveries: 5,
            redelivery_delay: Duration::from_millis(500),
            shutdown_grace: Duration::from_secs(30),
        }
    }
}
