pub mod postgres_event_search;
pub mod postgres_event_store;

pub use postgres_event_search::PostgresEventSearch;
pub use postgres_event_store::PostgresEventStore;

use sqlx::postgres::{PgArguments, PgPoolOptions};
use sqlx::query::QueryAs;
use sqlx::{PgPool, Postgres};
use std::time::Duration;
use telemetry_config::DatabaseConfig;
use telemetry_errors::TelemetryResult;
use tracing::debug;

use super::query_builder::QueryParam;
use super::schema::POSTGRES_SCHEMA;
use crate::error_handling::{RepositoryErrorHelpers, RepositoryOperation};
use crate::event_context;

/// 按配置创建 PostgreSQL 连接池
pub async fn connect(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.connection_timeout_seconds))
        .idle_timeout(Duration::from_secs(config.idle_timeout_seconds))
        .max_lifetime(Duration::from_secs(1800)) // 30分钟默认生命周期
        .connect(&config.url)
        .await
}

/// 创建事件表及索引（幂等）
pub async fn run_migrations(pool: &PgPool) -> TelemetryResult<()> {
    debug!("Running PostgreSQL event schema migrations");
    for statement in POSTGRES_SCHEMA {
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
    mut query: QueryAs<'q, Postgres, O, PgArguments>,
    params: &'q [QueryParam],
) -> QueryAs<'q, Postgres, O, PgArguments> {
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
