use crate::core::{AppError, Result};
use crate::modules::loans::services::BillWriteMode;
use std::env;
use std::str::FromStr;
use std::time::Duration;

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
    pub worker: WorkerConfig,
    pub billing: BillingJobConfig,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub env: String,
    pub log_level: String,
    /// `pretty` or `json`
    pub log_format: String,
}

/// Settlement worker and payment queue settings
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub queue_capacity: usize,
    /// Attempts for the compensating FAILED write after a ledger failure
    pub compensation_attempts: u32,
    pub compensation_backoff: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 1024,
            compensation_attempts: 3,
            compensation_backoff: Duration::from_millis(200),
        }
    }
}

/// Bill generation and periodic reconciliation settings
#[derive(Debug, Clone)]
pub struct BillingJobConfig {
    pub bill_write_mode: BillWriteMode,
    /// Days after its billing date that a bill stays BILLED before going OVERDUE
    pub grace_days: u32,
    pub scheduler_interval: Duration,
}

impl Default for BillingJobConfig {
    fn default() -> Self {
        Self {
            bill_write_mode: BillWriteMode::Concurrent,
            grace_days: 0,
            scheduler_interval: Duration::from_secs(60),
        }
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
                log_format: env::var("LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string()),
            },
            database: DatabaseConfig::from_env()?,
            server: ServerConfig::from_env()?,
            worker: WorkerConfig {
                queue_capacity: parse_env("PAYMENT_QUEUE_CAPACITY", 1024)?,
                compensation_attempts: parse_env("SETTLEMENT_COMPENSATION_ATTEMPTS", 3)?,
                compensation_backoff: Duration::from_millis(parse_env(
                    "SETTLEMENT_COMPENSATION_BACKOFF_MS",
                    200,
                )?),
            },
            billing: BillingJobConfig {
                bill_write_mode: env::var("BILL_WRITE_MODE")
                    .ok()
                    .map(|raw| BillWriteMode::from_str(&raw))
                    .transpose()
                    .map_err(AppError::Configuration)?
                    .unwrap_or_default(),
                grace_days: parse_env("BILL_GRACE_DAYS", 0)?,
                scheduler_interval: Duration::from_secs(parse_env(
                    "SCHEDULER_INTERVAL_SECS",
                    60,
                )?),
            },
        };

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.worker.queue_capacity == 0 {
            return Err(AppError::Configuration(
                "Payment queue capacity must be greater than 0".to_string(),
            ));
        }

        if self.worker.compensation_attempts == 0 {
            return Err(AppError::Configuration(
                "Settlement compensation attempts must be greater than 0".to_string(),
            ));
        }

        if self.billing.scheduler_interval.is_zero() {
            return Err(AppError::Configuration(
                "Scheduler interval must be greater than 0".to_string(),
            ));
        }

        if !matches!(self.app.log_format.as_str(), "pretty" | "json") {
            return Err(AppError::Configuration(format!(
                "Invalid LOG_FORMAT '{}', expected 'pretty' or 'json'",
                self.app.log_format
            )));
        }

        Ok(())
    }
}

/// Parse an optional environment variable, falling back to `default` when unset
fn parse_env<T: FromStr>(key: &str, default: T) -> Result<T> {
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| AppError::Configuration(format!("Invalid {}", key))),
        Err(_) => Ok(default),
    }
}
