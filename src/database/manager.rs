use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::info;

use crate::config::DatabaseConfig;

/// Errors from DatabaseManager and the repositories built on it
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Invalid database URL: {0}")]
    InvalidDatabaseUrl(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Query error: {0}")]
    QueryError(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Migration error: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

impl From<crate::filter::QueryError> for DatabaseError {
    fn from(err: crate::filter::QueryError) -> Self {
        DatabaseError::QueryError(err.to_string())
    }
}

/// Owns the SQLite pool. Cloning is cheap and shares the pool.
#[derive(Clone, Debug)]
pub struct DatabaseManager {
    pool: SqlitePool,
}

impl DatabaseManager {
    /// Opens (creating when missing) the configured database and applies migrations.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, DatabaseError> {
        let in_memory = Self::is_memory_url(&config.url);
        if !in_memory {
            if let Some(parent) = Self::file_path(&config.url).and_then(|p| Path::new(p).parent()) {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)
                        .map_err(|e| DatabaseError::ConnectionError(e.to_string()))?;
                }
            }
        }

        let options = SqliteConnectOptions::from_str(&config.url)
            .map_err(|_| DatabaseError::InvalidDatabaseUrl(config.url.clone()))?
            .create_if_missing(true)
            .foreign_keys(true);

        // Every in-memory connection is its own database, so pin the pool to one.
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(config.max_connections.max(1))
        };

        let pool = pool_options
            .acquire_timeout(Duration::from_secs(config.connection_timeout.max(1)))
            .connect_with(options)
            .await
            .map_err(|e| DatabaseError::ConnectionError(e.to_string()))?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        info!("Database ready: {}", config.url);
        Ok(Self { pool })
    }

    /// In-memory database with the schema applied.
    pub async fn in_memory() -> Result<Self, DatabaseError> {
        let config = DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            connection_timeout: 5,
            enable_slow_query_warning: false,
            slow_query_threshold_ms: 0,
        };
        Self::connect(&config).await
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Pings the pool to ensure connectivity
    pub async fn health_check(&self) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    fn is_memory_url(url: &str) -> bool {
        url.contains(":memory:") || url.contains("mode=memory")
    }

    /// Filesystem path of a `sqlite:` URL, without query string.
    fn file_path(url: &str) -> Option<&str> {
        let rest = url.strip_prefix("sqlite://").or_else(|| url.strip_prefix("sqlite:"))?;
        let path = rest.split('?').next().unwrap_or(rest);
        if path.is_empty() {
            None
        } else {
            Some(path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_memory_urls() {
        assert!(DatabaseManager::is_memory_url("sqlite::memory:"));
        assert!(DatabaseManager::is_memory_url("sqlite://file:im?mode=memory&cache=shared"));
        assert!(!DatabaseManager::is_memory_url("sqlite://db/instance_manager.db"));
    }

    #[test]
    fn extracts_file_path() {
        assert_eq!(DatabaseManager::file_path("sqlite://db/im.db?mode=rwc"), Some("db/im.db"));
        assert_eq!(DatabaseManager::file_path("sqlite:im.db"), Some("im.db"));
        assert_eq!(DatabaseManager::file_path("postgres://x/y"), None);
    }

    #[tokio::test]
    async fn in_memory_database_is_migrated() {
        let db = DatabaseManager::in_memory().await.unwrap();
        db.health_check().await.unwrap();
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM translations")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(count, 0);
    }
}
