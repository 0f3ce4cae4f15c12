//! Configuration management for the catalog server
use crate::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Main server configuration
///
/// Built once in `main` and handed to `AppContext::new`; no component
/// reads the environment after startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub service: ServiceConfig,
    pub storage: StorageConfig,
    pub upload: UploadConfig,
    pub logging: LoggingConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub host: String,
    pub port: u16,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_directory: PathBuf,
    pub database_path: PathBuf,
    pub media_directory: PathBuf,
}

/// Upload limits, enforced before untrusted image bytes are decoded
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Max size of a single uploaded file, in bytes
    pub max_file_bytes: usize,
    /// Max width/height accepted from an upload, in pixels
    pub max_source_dimension: u32,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> AppResult<Self> {
        dotenv::dotenv().ok();

        let host = env::var("JEWELKEEP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("JEWELKEEP_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .map_err(|_| AppError::Validation("Invalid port number".to_string()))?;

        let data_directory: PathBuf = env::var("JEWELKEEP_DATA_DIRECTORY")
            .unwrap_or_else(|_| "./data".to_string())
            .into();
        let database_path = env::var("JEWELKEEP_DB_LOCATION")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_directory.join("catalog.sqlite"));
        let media_directory = env::var("JEWELKEEP_MEDIA_DIRECTORY")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_directory.join("media"));

        let max_file_bytes = env::var("JEWELKEEP_MAX_UPLOAD_BYTES")
            .unwrap_or_else(|_| "2097152".to_string())
            .parse()
            .unwrap_or(2 * 1024 * 1024);
        let max_source_dimension = env::var("JEWELKEEP_MAX_UPLOAD_PX")
            .unwrap_or_else(|_| "2000".to_string())
            .parse()
            .unwrap_or(2000);

        let log_level = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        Ok(ServerConfig {
            service: ServiceConfig { host, port },
            storage: StorageConfig {
                data_directory,
                database_path,
                media_directory,
            },
            upload: UploadConfig {
                max_file_bytes,
                max_source_dimension,
            },
            logging: LoggingConfig { level: log_level },
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> AppResult<()> {
        if self.service.host.is_empty() {
            return Err(AppError::Validation("Host cannot be empty".to_string()));
        }

        if self.upload.max_file_bytes == 0 {
            return Err(AppError::Validation(
                "Upload size limit must be positive".to_string(),
            ));
        }

        if self.upload.max_source_dimension == 0 {
            return Err(AppError::Validation(
                "Upload dimension limit must be positive".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> ServerConfig {
        ServerConfig {
            service: ServiceConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
            storage: StorageConfig {
                data_directory: "./data".into(),
                database_path: "./data/catalog.sqlite".into(),
                media_directory: "./data/media".into(),
            },
            upload: UploadConfig {
                max_file_bytes: 2 * 1024 * 1024,
                max_source_dimension: 2000,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
            },
        }
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(test_config().validate().is_ok());
    }

    #[test]
    fn test_empty_host_rejected() {
        let mut config = test_config();
        config.service.host = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_upload_limit_rejected() {
        let mut config = test_config();
        config.upload.max_file_bytes = 0;
        assert!(config.validate().is_err());
    }
}
