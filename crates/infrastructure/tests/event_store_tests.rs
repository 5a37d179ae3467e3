mod common;

use anyhow::Result;
use futures::future::join_all;
use telemetry_config::DatabaseConfig;
use telemetry_domain::{Condition, ExecutionAppend, TaskState};
use telemetry_infrastructure::{DatabaseManager, FAILURE_CAUSE_MAX_CHARS};
use tempfile::TempDir;
use tracing_test::traced_test;

use common::{failover_trace, memory_manager, start_event};

#[tokio::test]
#[traced_test]
async fn test_start_then_success_updates_single_row() -> Result<()> {
    let manager = memory_manager().await?;
    let store = manager.event_store();
    let search = manager.event_search();

    let start = start_event("task-1", "job_a");
    let inserted = store.append_execution(&start).await?;
    assert!(matches!(inserted, ExecutionAppend::Inserted { .. }));

    let completed = store.append_execution(&start.execution_success()).await?;
    assert_eq!(completed, ExecutionAppend::Completed { id: inserted.id() });

    let result = search.search_executions(&Condition::default()).await?;
    assert_eq!(result.total, 1);
    let row = &result.rows[0];
    assert!(row.is_success);
    assert!(row.complete_time.is_some());
    assert!(row.failure_cause.is_none());
    assert_eq!(row.hostname, "localhost");
    assert_eq!(row.start_time, start.start_time);

    Ok(())
}

#[tokio::test]
#[traced_test]
async fn test_failure_records_cause_in_place() -> Result<()> {
    let manager = memory_manager().await?;
    let store = manager.event_store();

    let start = start_event("task-1", "job_a");
    store.append_execution(&start).await?;
    store
        .append_execution(&start.execution_failure("java.lang.RuntimeException: boom"))
        .await?;

    let result = manager
        .event_search()
        .search_executions(&Condition::default())
        .await?;
    assert_eq!(result.total, 1);
    assert!(!result.rows[0].is_success);
    assert!(result.rows[0].complete_time.is_some());
    assert_eq!(
        result.rows[0].failure_cause.as_deref(),
        Some("java.lang.RuntimeException: boom")
    );

    Ok(())
}

#[tokio::test]
#[traced_test]
async fn test_completion_without_open_row_is_inserted() -> Result<()> {
    let manager = memory_manager().await?;
    let store = manager.event_store();

    let completion = start_event("task-orphan", "job_a").execution_success();
    let outcome = store.append_execution(&completion).await?;
    assert!(matches!(outcome, ExecutionAppend::Inserted { .. }));

    let result = manager
        .event_search()
        .search_executions(&Condition::default())
        .await?;
    assert_eq!(result.total, 1);
    assert!(result.rows[0].is_success);
    assert!(!result.rows[0].is_open());

    Ok(())
}

#[tokio::test]
#[traced_test]
async fn test_redelivered_start_is_duplicate() -> Result<()> {
    let manager = memory_manager().await?;
    let store = manager.event_store();

    let start = start_event("task-1", "job_a");
    let first = store.append_execution(&start).await?;
    let second = store.append_execution(&start).await?;
    assert_eq!(second, ExecutionAppend::Duplicate { id: first.id() });

    let result = manager
        .event_search()
        .search_executions(&Condition::default())
        .await?;
    assert_eq!(result.total, 1);

    Ok(())
}

#[tokio::test]
#[traced_test]
async fn test_rerun_after_completion_opens_new_row() -> Result<()> {
    let manager = memory_manager().await?;
    let store = manager.event_store();

    let first = start_event("task-1", "job_a");
    let first_id = store.append_execution(&first).await?.id();
    store.append_execution(&first.execution_success()).await?;

    let second = start_event("task-1", "job_a");
    let second_outcome = store.append_execution(&second).await?;
    assert!(matches!(second_outcome, ExecutionAppend::Inserted { .. }));
    assert!(second_outcome.id() > first_id);

    // 同一 task_id 下不同作业互不影响
    let other = store.append_execution(&start_event("task-1", "job_b")).await?;
    assert!(matches!(other, ExecutionAppend::Inserted { .. }));

    let result = manager
        .event_search()
        .search_executions(&Condition::default())
        .await?;
    assert_eq!(result.total, 3);

    Ok(())
}

#[tokio::test]
#[traced_test]
async fn test_long_failure_cause_is_truncated() -> Result<()> {
    let manager = memory_manager().await?;
    let store = manager.event_store();

    let start = start_event("task-1", "job_a");
    store.append_execution(&start).await?;
    let cause = "栈".repeat(FAILURE_CAUSE_MAX_CHARS * 2);
    store.append_execution(&start.execution_failure(cause)).await?;

    let result = manager
        .event_search()
        .search_executions(&Condition::default())
        .await?;
    let stored = result.rows[0].failure_cause.as_deref().unwrap_or_default();
    assert_eq!(stored.chars().count(), FAILURE_CAUSE_MAX_CHARS);

    Ok(())
}

#[tokio::test]
#[traced_test]
async fn test_traces_are_append_only() -> Result<()> {
    let manager = memory_manager().await?;
    let store = manager.event_store();

    let trace = failover_trace("job_a").with_original_task_id("original-task");
    let mut ids = Vec::new();
    for _ in 0..5 {
        ids.push(store.append_trace(&trace).await?);
    }
    assert!(ids.windows(2).all(|pair| pair[0] < pair[1]));

    let traces = manager
        .event_search()
        .find_traces_by_task_id("fake_failed_failover_task_id")
        .await?;
    assert_eq!(traces.len(), 5);
    assert!(traces.iter().all(|t| t.state == TaskState::TaskFailed));
    assert!(traces.iter().all(|t| t.original_task_id == "original-task"));

    Ok(())
}

#[tokio::test]
#[traced_test]
async fn test_concurrent_appends_keep_one_open_row() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("telemetry_concurrency.db");
    let config = DatabaseConfig {
        url: format!("sqlite:{}", db_path.display()),
        max_connections: 8,
        ..DatabaseConfig::default()
    };
    let manager = DatabaseManager::new(&config).await?;
    manager.create_schema().await?;
    let store = manager.event_store();

    let start = start_event("task-1", "job_a");
    let outcomes = join_all((0..8).map(|_| store.append_execution(&start))).await;
    let outcomes = outcomes.into_iter().collect::<Result<Vec<_>, _>>()?;
    assert_eq!(
        outcomes
            .iter()
            .filter(|o| matches!(o, ExecutionAppend::Inserted { .. }))
            .count(),
        1
    );

    let success = start.execution_success();
    let outcomes = join_all((0..4).map(|_| store.append_execution(&success))).await;
    let outcomes = outcomes.into_iter().collect::<Result<Vec<_>, _>>()?;
    assert_eq!(
        outcomes
            .iter()
            .filter(|o| matches!(o, ExecutionAppend::Completed { .. }))
            .count(),
        1
    );

    let search = manager.event_search();
    let open = search
        .search_executions(&Condition::default().with_field("isSuccess", false))
        .await?;
    assert_eq!(open.total, 0);

    manager.close().await;
    Ok(())
}
