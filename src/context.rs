//! Application context and dependency injection
use crate::{
    config::ServerConfig,
    db,
    error::{AppError, AppResult},
    media::MediaStore,
};
use sqlx::SqlitePool;
use std::sync::Arc;

/// Application context holding all shared services
///
/// Constructed once at process start from a validated config; handlers
/// receive it as axum state. No ambient globals.
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub db: SqlitePool,
    pub media: Arc<MediaStore>,
}

impl AppContext {
    /// Create a new application context from configuration
    pub async fn new(config: ServerConfig) -> AppResult<Self> {
        config.validate()?;

        Self::ensure_directories(&config).await?;

        let db = db::create_pool(&config.storage.database_path, db::DatabaseOptions::default())
            .await?;
        db::run_migrations(&db).await?;
        db::test_connection(&db).await?;

        let media = Arc::new(MediaStore::new(config.storage.media_directory.clone()));
        media.ensure_root().await?;

        Ok(Self {
            config: Arc::new(config),
            db,
            media,
        })
    }

    /// Ensure required directories exist
    async fn ensure_directories(config: &ServerConfig) -> AppResult<()> {
        for dir in [&config.storage.data_directory, &config.storage.media_directory] {
            if !dir.exists() {
                tokio::fs::create_dir_all(dir).await.map_err(|e| {
                    AppError::Internal(format!("Failed to create directory {:?}: {}", dir, e))
                })?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LoggingConfig, ServiceConfig, StorageConfig, UploadConfig};
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_context_bootstraps_directories_and_schema() {
        let dir = tempdir().unwrap();
        let data = dir.path().join("data");

        let config = ServerConfig {
            service: ServiceConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
            },
            storage: StorageConfig {
                data_directory: data.clone(),
                database_path: data.join("catalog.sqlite"),
                media_directory: data.join("media"),
            },
            upload: UploadConfig {
                max_file_bytes: 1024,
                max_source_dimension: 2000,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
            },
        };

        let ctx = AppContext::new(config).await.unwrap();
        assert!(data.join("media").is_dir());
        crate::db::test_connection(&ctx.db).await.unwrap();
    }
}
