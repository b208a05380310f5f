use crate::core::{AppError, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

pub mod database;

pub use database::DatabaseConfig;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub database: Option<DatabaseConfig>,
    pub reconcile: ReconcileConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub env: String,
    pub log_level: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReconcileConfig {
    /// Root directory for per-run report folders
    pub report_dir: PathBuf,
    /// Discrepancies strictly below this are handled by the minor repair pass
    pub minor_threshold: Decimal,
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
            },
            database: DatabaseConfig::from_env()?,
            reconcile: ReconcileConfig {
                report_dir: env::var("REPORT_DIR")
                    .unwrap_or_else(|_| "reports".to_string())
                    .into(),
                minor_threshold: Decimal::from_str(
                    &env::var("RECONCILE_MINOR_THRESHOLD").unwrap_or_else(|_| "30".to_string()),
                )
                .map_err(|_| {
                    AppError::Configuration("Invalid RECONCILE_MINOR_THRESHOLD".to_string())
                })?,
            },
        };

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.reconcile.minor_threshold <= Decimal::ZERO {
            return Err(AppError::Configuration(
                "Minor repair threshold must be greater than 0".to_string(),
            ));
        }

        if let Some(database) = &self.database {
            if database.pool_size == 0 || database.max_connections == 0 {
                return Err(AppError::Configuration(
                    "Database pool sizes must be greater than 0".to_string(),
                ));
            }
            if database.pool_size > database.max_connections {
                return Err(AppError::Configuration(
                    "DATABASE_POOL_SIZE cannot exceed DATABASE_MAX_CONNECTIONS".to_string(),
                ));
            }
        }

        Ok(())
    }

    /// Database settings, required when no dataset file is given
    pub fn require_database(&self) -> Result<&DatabaseConfig> {
        self.database
            .as_ref()
            .ok_or_else(|| AppError::Configuration("DATABASE_URL not set".to_string()))
    }
}
