pub mod sqlite_event_search;
pub mod sqlite_event_store;

pub use sqlite_event_search::SqliteEventSearch;
pub use sqlite_event_store::SqliteEventStore;

use sqlx::query::QueryAs;
use sqlx::sqlite::{SqliteArguments, SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Sqlite, SqlitePool};
use std::str::FromStr;
use std::time::Duration;
use telemetry_config::DatabaseConfig;
use telemetry_errors::TelemetryResult;
use tracing::debug;

use super::query_builder::QueryParam;
use super::schema::SQLITE_SCHEMA;
use crate::error_handling::{RepositoryErrorHelpers, RepositoryOperation};
use crate::event_context;

/// 按配置创建 SQLite 连接池
///
/// 内存数据库只存在于单个连接中，因此固定为一个常驻连接。
pub async fn connect(config: &DatabaseConfig) -> Result<SqlitePool, sqlx::Error> {
    let in_memory = config.url.contains(":memory:") || config.url.contains("mode=memory");

    let mut connect_options = SqliteConnectOptions::from_str(&config.url)?.create_if_missing(true);
    if !in_memory {
        connect_options = connect_options.journal_mode(SqliteJournalMode::Wal);
    }

    let pool_options = SqlitePoolOptions::new()
        .acquire_timeout(Duration::from_secs(config.connection_timeout_seconds));
    let pool_options = if in_memory {
        pool_options
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        pool_options
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .idle_timeout(Duration::from_secs(config.idle_timeout_seconds))
            .max_lifetime(Duration::from_secs(1800)) // 30分钟默认生命周期
    };

    debug!(url = %config.url, in_memory, "创建SQLite连接池");
    pool_options.connect_with(connect_options).await
}

/// 创建事件表及索引（幂等）
pub async fn run_migrations(pool: &SqlitePool) -> TelemetryResult<()> {
    debug!("Running SQLite event schema migrations");
    for statement in SQLITE_SCHEMA {
        sqlx::query(statement).execute(pool).await.map_err(|e| {
            RepositoryErrorHelpers::event_database_error(
                event_context!(RepositoryOperation::Migrate, "schema"),
                e,
            )
        })?;
    }
    Ok(())
}

/// 依次绑定检索参数
pub(crate) fn bind_params<'q, O>(
    mut query: QueryAs<'q, Sqlite, O, SqliteArguments<'q>>,
    params: &'q [QueryParam],
) -> QueryAs<'q, Sqlite, O, SqliteArguments<'q>> {
    for param in params {
        query = match param {
            QueryParam::Text(value) => query.bind(value.as_str()),
            QueryParam::Integer(value) => query.bind(*value),
            QueryParam::Bool(value) => query.bind(*value),
            QueryParam::Timestamp(value) => query.bind(*value),
        };
    }
    query
}
