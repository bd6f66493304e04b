//! Database module for the read-only forecast feed.

pub mod forecasts;

use std::time::Duration;

use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use secrecy::ExposeSecret;

use crate::config::ForecastDbSettings;
use crate::error::{AppError, AppResult};

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct DbPool {
    conn: DatabaseConnection,
}

impl DbPool {
    /// Connect using the forecast database settings.
    pub async fn new(settings: &ForecastDbSettings) -> AppResult<Self> {
        let mut options = ConnectOptions::new(settings.url.expose_secret().to_string());
        options
            .max_connections(settings.max_connections)
            .min_connections(1)
            .connect_timeout(Duration::from_secs(10))
            .sqlx_logging(false);

        let conn = Database::connect(options)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to forecast database: {}", e)))?;

        Ok(DbPool { conn })
    }

    /// Get access to the connection for executing queries.
    pub fn connection(&self) -> &DatabaseConnection {
        &self.conn
    }
}

/// Forecast feed handle shared with handlers; empty when no database is configured.
#[derive(Clone, Default)]
pub struct ForecastStore {
    pool: Option<DbPool>,
}

impl ForecastStore {
    pub fn new(pool: Option<DbPool>) -> Self {
        ForecastStore { pool }
    }

    pub fn disabled() -> Self {
        ForecastStore { pool: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.pool.is_some()
    }

    /// Borrow the pool or fail with 503.
    pub fn pool(&self) -> AppResult<&DbPool> {
        self.pool.as_ref().ok_or_else(|| {
            AppError::ServiceUnavailable(
                "Forecast store not configured. Set FORECAST_DATABASE_URL.".to_string(),
            )
        })
    }
}
