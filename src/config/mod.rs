use std::env;
use std::path::PathBuf;

use crate::error::AppError;
use crate::persona::Persona;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Remote endpoints.
    pub services: ServiceConfig,
    /// Durable store location.
    pub storage: StorageConfig,
    /// Log level and format.
    pub logging: LoggingConfig,
    /// HTTP request settings.
    pub request: RequestConfig,
    /// Chat defaults.
    pub chat: ChatConfig,
}

/// Remote service endpoints and credentials
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Chat generation service (`/api/chat/generate`).
    pub ai_service_url: String,
    /// Points service (`/api/points/calculate`).
    pub api_service_url: String,
    /// Quest and pet catalog API root.
    pub catalog_url: String,
    /// Sent as `X-API-Key` on every call.
    pub api_key: String,
}

/// Durable key/value storage configuration
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// SQLite database file.
    pub path: PathBuf,
    /// Pool size.
    pub max_connections: u32,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. `info`.
    pub level: String,
    /// Output format.
    pub format: LogFormat,
}

/// Log output format
#[derive(Debug, Clone, PartialEq)]
pub enum LogFormat {
    /// Human-readable lines.
    Pretty,
    /// One JSON object per event.
    Json,
}

/// HTTP request configuration
#[derive(Debug, Clone)]
pub struct RequestConfig {
    /// Per-request timeout in milliseconds.
    pub timeout_ms: u64,
}

/// Chat defaults
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// Persona used when none is given on the command line.
    pub persona: Persona,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, AppError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let services = ServiceConfig {
            ai_service_url: env::var("NANDI_AI_SERVICE_URL")
                .unwrap_or_else(|_| "http://localhost:8000".to_string()),
            api_service_url: env::var("NANDI_API_SERVICE_URL")
                .unwrap_or_else(|_| "http://localhost:8080".to_string()),
            catalog_url: env::var("NANDI_CATALOG_URL")
                .unwrap_or_else(|_| "http://localhost:8080/api".to_string()),
            api_key: env::var("NANDI_API_KEY").unwrap_or_else(|_| "dev_api_key".to_string()),
        };

        let storage = StorageConfig {
            path: PathBuf::from(
                env::var("STORAGE_PATH").unwrap_or_else(|_| "./data/nandi.db".to_string()),
            ),
            max_connections: env::var("STORAGE_MAX_CONNECTIONS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5),
        };

        let logging = LoggingConfig {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            format: match env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "pretty".to_string())
                .to_lowercase()
                .as_str()
            {
                "json" => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
        };

        let request = RequestConfig {
            timeout_ms: env::var("REQUEST_TIMEOUT_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10000),
        };
        if request.timeout_ms == 0 {
            return Err(AppError::Config {
                message: "REQUEST_TIMEOUT_MS must be greater than zero".to_string(),
            });
        }

        let persona = env::var("NANDI_PERSONA").unwrap_or_else(|_| "karma".to_string());
        let chat = ChatConfig {
            persona: persona.parse().map_err(|e| AppError::Config {
                message: format!("NANDI_PERSONA: {}", e),
            })?,
        };

        Ok(Config {
            services,
            storage,
            logging,
            request,
            chat,
        })
    }
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self { timeout_ms: 10000 }
    }
}
