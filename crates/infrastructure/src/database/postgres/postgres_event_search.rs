use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgPool};
use telemetry_domain::{
    Condition, EventSearch, EventTable, ExecutionEvent, SearchResult, StatusTraceEvent,
};
use telemetry_errors::TelemetryResult;
use tracing::{debug, instrument};

use super::bind_params;
use crate::database::query_builder::SearchQueryBuilder;
use crate::{
    error_handling::{RepositoryErrorHelpers, RepositoryOperation},
    event_context,
};

pub struct PostgresEventSearch {
    pool: PgPool,
}

impl PostgresEventSearch {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 对任意事件表执行分页检索：一次 COUNT，一次分页 SELECT
    #[instrument(skip(self, condition), fields(table = T::TABLE))]
    pub async fn search<T>(&self, condition: &Condition) -> TelemetryResult<SearchResult<T>>
    where
        T: EventTable + for<'r> FromRow<'r, PgRow> + Send + Unpin,
    {
        let plan = condition.plan::<T>();

        let (count_sql, count_params) = SearchQueryBuilder::build_count_query(&plan);
        let (total,) = bind_params(sqlx::query_as::<_, (i64,)>(&count_sql), &count_params)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                RepositoryErrorHelpers::event_database_error(
                    event_context!(RepositoryOperation::Count, T::TABLE),
                    e,
                )
            })?;

        let select_list = T::select_list();
        let (select_sql, select_params) = SearchQueryBuilder::build_select_query(&plan, &select_list);
        let rows = bind_params(sqlx::query_as::<_, T>(&select_sql), &select_params)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                RepositoryErrorHelpers::event_database_error(
                    event_context!(RepositoryOperation::Search, T::TABLE)
                        .with_additional_info(format!("page {}", plan.page_number)),
                    e,
                )
            })?;

        metrics::counter!("telemetry_searches_total", "table" => T::TABLE).increment(1);
        debug!(
            total,
            returned = rows.len(),
            page = plan.page_number,
            page_size = plan.page_size,
            "检索完成"
        );
        Ok(SearchResult::new(total, rows))
    }
}

#[async_trait]
impl EventSearch for PostgresEventSearch {
    async fn search_executions(
        &self,
        condition: &Condition,
    ) -> TelemetryResult<SearchResult<ExecutionEvent>> {
        self.search::<ExecutionEvent>(condition).await
    }

    async fn search_traces(
        &self,
        condition: &Condition,
    ) -> TelemetryResult<SearchResult<StatusTraceEvent>> {
        self.search::<StatusTraceEvent>(condition).await
    }

    #[instrument(skip(self))]
    async fn find_traces_by_task_id(&self, task_id: &str) -> TelemetryResult<Vec<StatusTraceEvent>> {
        let sql = format!(
            "SELECT {} FROM {} WHERE task_id = $1 ORDER BY id ASC",
            StatusTraceEvent::select_list(),
            StatusTraceEvent::TABLE
        );

        sqlx::query_as::<_, StatusTraceEvent>(&sql)
            .bind(task_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                RepositoryErrorHelpers::event_database_error(
                    event_context!(RepositoryOperation::Read, StatusTraceEvent::TABLE, task_id = task_id),
                    e,
                )
            })
    }
}
