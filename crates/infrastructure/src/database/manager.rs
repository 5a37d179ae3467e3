use telemetry_config::DatabaseConfig;
use telemetry_domain::{EventSearch, EventStore};
use telemetry_errors::{TelemetryError, TelemetryResult};
use tracing::info;

use super::postgres::{self, PostgresEventSearch, PostgresEventStore};
use super::sqlite::{self, SqliteEventSearch, SqliteEventStore};

/// Database type detection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseType {
    PostgreSQL,
    SQLite,
}

impl DatabaseType {
    pub fn from_url(url: &str) -> Self {
        if url.starts_with("postgres://") || url.starts_with("postgresql://") {
            DatabaseType::PostgreSQL
        } else {
            DatabaseType::SQLite
        }
    }
}

/// Database connection pool enum
#[derive(Clone)]
pub enum DatabasePool {
    PostgreSQL(sqlx::PgPool),
    SQLite(sqlx::SqlitePool),
}

impl DatabasePool {
    /// Create pool from config with automatic type detection
    pub async fn new(config: &DatabaseConfig) -> TelemetryResult<Self> {
        match DatabaseType::from_url(&config.url) {
            DatabaseType::PostgreSQL => {
                let pool = postgres::connect(config)
                    .await
                    .map_err(TelemetryError::Database)?;
                Ok(DatabasePool::PostgreSQL(pool))
            }
            DatabaseType::SQLite => {
                let pool = sqlite::connect(config)
                    .await
                    .map_err(TelemetryError::Database)?;
                Ok(DatabasePool::SQLite(pool))
            }
        }
    }

    pub fn database_type(&self) -> DatabaseType {
        match self {
            DatabasePool::PostgreSQL(_) => DatabaseType::PostgreSQL,
            DatabasePool::SQLite(_) => DatabaseType::SQLite,
        }
    }

    pub async fn health_check(&self) -> TelemetryResult<()> {
        match self {
            DatabasePool::PostgreSQL(pool) => {
                sqlx::query("SELECT 1")
                    .execute(pool)
                    .await
                    .map_err(TelemetryError::Database)?;
            }
            DatabasePool::SQLite(pool) => {
                sqlx::query("SELECT 1")
                    .execute(pool)
                    .await
                    .map_err(TelemetryError::Database)?;
            }
        }
        Ok(())
    }

    pub async fn close(&self) {
        match self {
            DatabasePool::PostgreSQL(pool) => pool.close().await,
            DatabasePool::SQLite(pool) => pool.close().await,
        }
    }
}

/// Unified database manager
pub struct DatabaseManager {
    pool: DatabasePool,
}

impl DatabaseManager {
    pub async fn new(config: &DatabaseConfig) -> TelemetryResult<Self> {
        let pool = DatabasePool::new(config).await?;
        info!(database_type = ?pool.database_type(), "数据库连接池已创建");
        Ok(Self { pool })
    }

    /// 使用默认连接池参数连接
    pub async fn from_url(url: &str) -> TelemetryResult<Self> {
        let config = DatabaseConfig {
            url: url.to_string(),
            ..DatabaseConfig::default()
        };
        Self::new(&config).await
    }

    pub fn database_type(&self) -> DatabaseType {
        self.pool.database_type()
    }

    pub fn pool(&self) -> &DatabasePool {
        &self.pool
    }

    pub async fn health_check(&self) -> TelemetryResult<()> {
        self.pool.health_check().await
    }

    pub async fn close(&self) {
        self.pool.close().await
    }

    /// 创建事件表及索引，可重复执行
    pub async fn create_schema(&self) -> TelemetryResult<()> {
        match &self.pool {
            DatabasePool::PostgreSQL(pool) => postgres::run_migrations(pool).await?,
            DatabasePool::SQLite(pool) => sqlite::run_migrations(pool).await?,
        }
        info!(database_type = ?self.database_type(), "事件表结构已就绪");
        Ok(())
    }

    /// Factory method for the write path
    pub fn event_store(&self) -> Box<dyn EventStore> {
        match &self.pool {
            DatabasePool::PostgreSQL(pool) => Box::new(PostgresEventStore::new(pool.clone())),
            DatabasePool::SQLite(pool) => Box::new(SqliteEventStore::new(pool.clone())),
        }
    }

    /// Factory method for the read path
    pub fn event_search(&self) -> Box<dyn EventSearch> {
        match &self.pool {
            DatabasePool::PostgreSQL(pool) => Box::new(PostgresEventSearch::new(pool.clone())),
            DatabasePool::SQLite(pool) => Box::new(SqliteEventSearch::new(pool.clone())),
        }
    }
}
