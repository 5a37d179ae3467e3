pub mod manager;
pub mod postgres;
pub mod query_builder;
pub mod schema;
pub mod sqlite;

pub use manager::{DatabaseManager, DatabasePool, DatabaseType};
pub use postgres::{PostgresEventSearch, PostgresEventStore};
pub use query_builder::{QueryParam, SearchQueryBuilder};
pub use sqlite::{SqliteEventSearch, SqliteEventStore};

/// `failure_cause` 列的最大字符数
pub const FAILURE_CAUSE_MAX_CHARS: usize = 4000;

/// 按字符截断失败原因，避免超出列宽
pub fn truncate_failure_cause(cause: Option<&str>) -> Option<String> {
    cause.map(|cause| match cause.char_indices().nth(FAILURE_CAUSE_MAX_CHARS) {
        Some((end, _)) => cause[..end].to_string(),
        None => cause.to_string(),
    })
}
