//! Application configuration loaded from environment variables.

use std::env;
use std::path::PathBuf;

use secrecy::SecretString;

/// HTTP header carrying the (informational) caller id on uploads.
pub const USER_ID_HEADER: &str = "user_id";

/// Default values used when a variable is not set.
pub mod defaults {
    pub const HOST: &str = "127.0.0.1";
    pub const PORT: u16 = 8000;
    pub const MODEL_PATH: &str = "./lightgbm_model.json";
    pub const UPLOADS_DIR: &str = "./uploads";
    pub const RESULTS_DIR: &str = "./results";
    pub const MAX_UPLOAD_SIZE: usize = 52_428_800; // 50MB per upload
    pub const DB_MAX_CONNECTIONS: u32 = 5;
}

/// Runtime environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    /// Parse environment from string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "development" | "dev" => Some(Self::Development),
            "production" | "prod" => Some(Self::Production),
            _ => None,
        }
    }

    /// Check if this is a development environment.
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Development => write!(f, "development"),
            Self::Production => write!(f, "production"),
        }
    }
}

/// Storage locations and limits for the upload-predict pipeline.
#[derive(Debug, Clone)]
pub struct PredictSettings {
    /// Directory where raw uploads are kept (`{job_id}.csv`)
    pub uploads_dir: PathBuf,
    /// Directory where per-job result tables are written
    pub results_dir: PathBuf,
    /// Maximum upload size in bytes (default: 50MB)
    pub max_upload_size: usize,
}

/// Read-only connection settings for the forecast feed.
#[derive(Debug, Clone)]
pub struct ForecastDbSettings {
    /// PostgreSQL connection string. Only ever sourced from the environment.
    pub url: SecretString,
    pub max_connections: u32,
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Runtime environment
    pub environment: Environment,
    /// Server host address
    pub host: String,
    /// Server port
    pub port: u16,
    /// Path of the trained model artifact
    pub model_path: PathBuf,
    /// Upload/result storage settings
    pub predict: PredictSettings,
    /// Directory for static frontend assets (optional)
    pub static_dir: Option<PathBuf>,
    /// Forecast feed database (disabled when unset)
    pub forecast_db: Option<ForecastDbSettings>,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `RUST_ENV`: Environment (development/production) - REQUIRED
    /// - `PREDICT_HOST`: Server host (default: 127.0.0.1)
    /// - `PREDICT_PORT`: Server port (default: 8000)
    /// - `MODEL_PATH`: Model artifact path (default: ./lightgbm_model.json)
    /// - `PREDICT_UPLOADS_DIR`: Raw upload directory (default: ./uploads)
    /// - `PREDICT_RESULTS_DIR`: Result table directory (default: ./results)
    /// - `PREDICT_MAX_UPLOAD_SIZE`: Max upload size in bytes (default: 50MB)
    /// - `PREDICT_STATIC_DIR`: Static frontend directory
    /// - `FORECAST_DATABASE_URL`: PostgreSQL URL for the forecast feed (optional, no default)
    /// - `FORECAST_DB_MAX_CONNECTIONS`: Pool size for the forecast feed (default: 5)
    pub fn from_env() -> Result<Self, ConfigError> {
        let env_str = env::var("RUST_ENV").map_err(|_| ConfigError::MissingEnvVar("RUST_ENV"))?;

        let environment = Environment::parse(&env_str).ok_or(ConfigError::InvalidValue(
            "RUST_ENV must be 'development' or 'production'",
        ))?;

        let host = env::var("PREDICT_HOST").unwrap_or_else(|_| defaults::HOST.to_string());

        let port = env::var("PREDICT_PORT")
            .unwrap_or_else(|_| defaults::PORT.to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidValue("PREDICT_PORT must be a valid port number"))?;

        let model_path = PathBuf::from(
            env::var("MODEL_PATH").unwrap_or_else(|_| defaults::MODEL_PATH.to_string()),
        );

        let max_upload_size = env::var("PREDICT_MAX_UPLOAD_SIZE")
            .unwrap_or_else(|_| defaults::MAX_UPLOAD_SIZE.to_string())
            .parse::<usize>()
            .map_err(|_| {
                ConfigError::InvalidValue("PREDICT_MAX_UPLOAD_SIZE must be a valid number")
            })?;

        let predict = PredictSettings {
            uploads_dir: PathBuf::from(
                env::var("PREDICT_UPLOADS_DIR").unwrap_or_else(|_| defaults::UPLOADS_DIR.to_string()),
            ),
            results_dir: PathBuf::from(
                env::var("PREDICT_RESULTS_DIR").unwrap_or_else(|_| defaults::RESULTS_DIR.to_string()),
            ),
            max_upload_size,
        };

        let static_dir = env::var("PREDICT_STATIC_DIR").ok().map(PathBuf::from);

        let forecast_db = match env::var("FORECAST_DATABASE_URL") {
            Ok(url) if !url.trim().is_empty() => {
                let max_connections = env::var("FORECAST_DB_MAX_CONNECTIONS")
                    .unwrap_or_else(|_| defaults::DB_MAX_CONNECTIONS.to_string())
                    .parse::<u32>()
                    .map_err(|_| {
                        ConfigError::InvalidValue("FORECAST_DB_MAX_CONNECTIONS must be a valid number")
                    })?;
                Some(ForecastDbSettings {
                    url: SecretString::from(url),
                    max_connections,
                })
            }
            _ => None,
        };

        let config = Config {
            environment,
            host,
            port,
            model_path,
            predict,
            static_dir,
            forecast_db,
        };

        config.validate()?;

        Ok(config)
    }

    /// Reject settings the pipeline cannot work with.
    fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        if self.predict.max_upload_size == 0 {
            errors.push("PREDICT_MAX_UPLOAD_SIZE must be greater than zero.".to_string());
        }

        if self.predict.uploads_dir == self.predict.results_dir {
            errors.push(format!(
                "PREDICT_UPLOADS_DIR and PREDICT_RESULTS_DIR must differ (both are '{}').",
                self.predict.uploads_dir.display()
            ));
        }

        if let Some(ref db) = self.forecast_db
            && db.max_connections == 0
        {
            errors.push("FORECAST_DB_MAX_CONNECTIONS must be greater than zero.".to_string());
        }

        if !errors.is_empty() {
            return Err(ConfigError::Validation(errors));
        }

        Ok(())
    }

    /// Get the server bind address.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check if running in development mode.
    pub fn is_development(&self) -> bool {
        self.environment.is_development()
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(&'static str),

    #[error("Configuration validation failed:\n{}", .0.iter().map(|e| format!("  - {}", e)).collect::<Vec<_>>().join("\n"))]
    Validation(Vec<String>),
}
