use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgConnection, PgPool};
use telemetry_domain::{EventStore, ExecutionAppend, ExecutionEvent, StatusTraceEvent};
use telemetry_errors::TelemetryResult;
use tracing::instrument;

use crate::database::truncate_failure_cause;
use crate::{
    error_handling::{RepositoryErrorHelpers, RepositoryOperation},
    event_context,
};

/// 同一 `(task_id, job_name)` 的写入串行化，事务结束时自动释放
const LOCK_EXECUTION_KEY: &str = "SELECT pg_advisory_xact_lock(hashtext($1), hashtext($2))";

/// 仅在不存在未完成行时插入开始事件
const INSERT_START_IF_ABSENT: &str = r#"
    INSERT INTO job_execution_log (hostname, ip, task_id, job_name, execution_source,
                                   sharding_item, start_time, is_success)
    SELECT $1, $2, $3, $4, $5, $6, $7, FALSE
    WHERE NOT EXISTS (
        SELECT 1 FROM job_execution_log
        WHERE task_id = $3 AND job_name = $4 AND is_success = FALSE AND complete_time IS NULL
    )
    RETURNING id
"#;

const SELECT_OPEN_ROW: &str = r#"
    SELECT id FROM job_execution_log
    WHERE task_id = $1 AND job_name = $2 AND is_success = FALSE AND complete_time IS NULL
    ORDER BY id DESC LIMIT 1
"#;

const COMPLETE_OPEN_ROW: &str = r#"
    UPDATE job_execution_log
    SET is_success = $1, complete_time = $2, failure_cause = $3
    WHERE id = (
        SELECT id FROM job_execution_log
        WHERE task_id = $4 AND job_name = $5 AND is_success = FALSE AND complete_time IS NULL
        ORDER BY id DESC LIMIT 1
    )
    RETURNING id
"#;

const INSERT_EXECUTION: &str = r#"
    INSERT INTO job_execution_log (hostname, ip, task_id, job_name, execution_source,
                                   sharding_item, start_time, is_success, complete_time, failure_cause)
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
    RETURNING id
"#;

const INSERT_TRACE: &str = r#"
    INSERT INTO job_status_trace_log (job_name, original_task_id, task_id, slave_id, source,
                                      execution_type, sharding_item, state, message, creation_time)
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
    RETURNING id
"#;

pub struct PostgresEventStore {
    pool: PgPool,
}

impl PostgresEventStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// 事务内执行：先取 `(task_id, job_name)` 上的事务级咨询锁，再查找未完成行
    async fn upsert_execution(
        conn: &mut PgConnection,
        event: &ExecutionEvent,
    ) -> Result<ExecutionAppend, sqlx::Error> {
        sqlx::query(LOCK_EXECUTION_KEY)
            .bind(&event.task_id)
            .bind(&event.job_name)
            .execute(&mut *conn)
            .await?;

        let failure_cause = truncate_failure_cause(event.failure_cause.as_deref());

        if !event.is_completion() {
            let inserted = sqlx::query_scalar::<_, i64>(INSERT_START_IF_ABSENT)
                .bind(&event.hostname)
                .bind(&event.ip)
                .bind(&event.task_id)
                .bind(&event.job_name)
                .bind(event.execution_source)
                .bind(event.sharding_item)
                .bind(event.start_time)
                .fetch_optional(&mut *conn)
                .await?;

            if let Some(id) = inserted {
                return Ok(ExecutionAppend::Inserted { id });
            }

            let id = sqlx::query_scalar::<_, i64>(SELECT_OPEN_ROW)
                .bind(&event.task_id)
                .bind(&event.job_name)
                .fetch_one(&mut *conn)
                .await?;
            return Ok(ExecutionAppend::Duplicate { id });
        }

        let complete_time = event.complete_time.unwrap_or_else(Utc::now);
        let completed = sqlx::query_scalar::<_, i64>(COMPLETE_OPEN_ROW)
            .bind(event.is_success)
            .bind(complete_time)
            .bind(&failure_cause)
            .bind(&event.task_id)
            .bind(&event.job_name)
            .fetch_optional(&mut *conn)
            .await?;

        if let Some(id) = completed {
            return Ok(ExecutionAppend::Completed { id });
        }

        let id = sqlx::query_scalar::<_, i64>(INSERT_EXECUTION)
            .bind(&event.hostname)
            .bind(&event.ip)
            .bind(&event.task_id)
            .bind(&event.job_name)
            .bind(event.execution_source)
            .bind(event.sharding_item)
            .bind(event.start_time)
            .bind(event.is_success)
            .bind(complete_time)
            .bind(&failure_cause)
            .fetch_one(&mut *conn)
            .await?;
        Ok(ExecutionAppend::Inserted { id })
    }
}

#[async_trait]
impl EventStore for PostgresEventStore {
    #[instrument(skip(self, event), fields(
        task_id = %event.task_id,
        job_name = %event.job_name,
        completion = event.is_completion(),
    ))]
    async fn append_execution(&self, event: &ExecutionEvent) -> TelemetryResult<ExecutionAppend> {
        let operation = if event.is_completion() {
            RepositoryOperation::Complete
        } else {
            RepositoryOperation::Append
        };
        let context = event_context!(
            operation,
            "job_execution_log",
            task_id = event.task_id.as_str(),
            job_name = event.job_name.as_str()
        );

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RepositoryErrorHelpers::event_database_error(context.clone(), e))?;
        let outcome = Self::upsert_execution(&mut *tx, event)
            .await
            .map_err(|e| RepositoryErrorHelpers::event_database_error(context.clone(), e))?;
        tx.commit()
            .await
            .map_err(|e| RepositoryErrorHelpers::event_database_error(context.clone(), e))?;

        if event.is_completion() && matches!(outcome, ExecutionAppend::Inserted { .. }) {
            RepositoryErrorHelpers::log_operation_warning(
                &context,
                "未找到未完成的执行记录，已按完成状态插入",
            );
        }
        metrics::counter!("telemetry_execution_appends_total", "outcome" => outcome.outcome())
            .increment(1);
        RepositoryErrorHelpers::log_operation_success(
            &context,
            Some(&format!("{} (ID: {})", outcome.outcome(), outcome.id())),
        );
        Ok(outcome)
    }

    #[instrument(skip(self, event), fields(
        task_id = %event.task_id,
        job_name = %event.job_name,
        state = %event.state,
    ))]
    async fn append_trace(&self, event: &StatusTraceEvent) -> TelemetryResult<i64> {
        let context = event_context!(
            RepositoryOperation::Append,
            "job_status_trace_log",
            task_id = event.task_id.as_str(),
            job_name = event.job_name.as_str()
        );

        let id = sqlx::query_scalar::<_, i64>(INSERT_TRACE)
            .bind(&event.job_name)
            .bind(&event.original_task_id)
            .bind(&event.task_id)
            .bind(&event.slave_id)
            .bind(event.source)
            .bind(&event.execution_type)
            .bind(&event.sharding_item)
            .bind(event.state)
            .bind(&event.message)
            .bind(event.creation_time)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| RepositoryErrorHelpers::event_database_error(context.clone(), e))?;

        metrics::counter!("telemetry_trace_appends_total").increment(1);
        RepositoryErrorHelpers::log_operation_success(&context, Some(&format!("ID: {id}")));
        Ok(id)
    }
}
