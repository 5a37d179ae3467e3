mod common;

use anyhow::Result;
use chrono::{Duration, Utc};
use telemetry_domain::{Condition, EventSearch, ExecutionEvent, StatusTraceEvent};
use telemetry_infrastructure::{DatabaseManager, DatabasePool, SqliteEventSearch};
use tracing_test::traced_test;

use common::{failover_trace, memory_manager, seed_five_hundred_jobs, start_event};

async fn seeded_manager() -> Result<DatabaseManager> {
    let manager = memory_manager().await?;
    seed_five_hundred_jobs(manager.event_store().as_ref()).await?;
    Ok(manager)
}

#[tokio::test]
#[traced_test]
async fn test_find_executions_with_page_size_and_number() -> Result<()> {
    let manager = seeded_manager().await?;
    let search = manager.event_search();

    for (page_size, page_number, expected_rows) in [(10, 1, 10), (50, 1, 50), (100, 5, 100), (100, 6, 0)] {
        let result = search
            .search_executions(&Condition::new(page_size, page_number))
            .await?;
        assert_eq!(result.total, 500);
        assert_eq!(result.rows.len(), expected_rows);
    }

    Ok(())
}

#[tokio::test]
#[traced_test]
async fn test_last_page_is_partial() -> Result<()> {
    let manager = seeded_manager().await?;
    let search = manager.event_search();

    // 500 = 16 * 30 + 20
    for (page_number, expected_rows) in [(16, 30), (17, 20), (18, 0)] {
        let executions = search
            .search_executions(&Condition::new(30, page_number))
            .await?;
        assert_eq!(executions.total, 500);
        assert_eq!(executions.rows.len(), expected_rows);

        let traces = search.search_traces(&Condition::new(30, page_number)).await?;
        assert_eq!(traces.total, 500);
        assert_eq!(traces.rows.len(), expected_rows);
    }

    Ok(())
}

#[tokio::test]
#[traced_test]
async fn test_find_executions_with_invalid_paging_uses_defaults() -> Result<()> {
    let manager = seeded_manager().await?;

    let result = manager
        .event_search()
        .search_executions(&Condition::new(-1, -1))
        .await?;
    assert_eq!(result.total, 500);
    assert_eq!(result.rows.len(), 10);
    assert_eq!(result.rows[0].job_name, "test_job_1");

    Ok(())
}

#[tokio::test]
#[traced_test]
async fn test_find_executions_with_sort() -> Result<()> {
    let manager = seeded_manager().await?;
    let search = manager.event_search();

    let result = search
        .search_executions(&Condition::new(10, 1).with_sort("jobName", "ASC"))
        .await?;
    assert_eq!(result.total, 500);
    assert_eq!(result.rows.len(), 10);
    assert_eq!(result.rows[0].job_name, "test_job_1");

    let result = search
        .search_executions(&Condition::new(10, 1).with_sort("jobName", "DESC"))
        .await?;
    assert_eq!(result.total, 500);
    assert_eq!(result.rows.len(), 10);
    assert_eq!(result.rows[0].job_name, "test_job_99");

    Ok(())
}

#[tokio::test]
#[traced_test]
async fn test_find_executions_with_invalid_sort() -> Result<()> {
    let manager = seeded_manager().await?;
    let search = manager.event_search();

    let result = search
        .search_executions(&Condition::new(10, 1).with_sort("jobName", "ERROR_SORT"))
        .await?;
    assert_eq!(result.total, 500);
    assert_eq!(result.rows.len(), 10);
    assert_eq!(result.rows[0].job_name, "test_job_1");

    let result = search
        .search_executions(&Condition::new(10, 1).with_sort("notExistField", "ASC"))
        .await?;
    assert_eq!(result.total, 500);
    assert_eq!(result.rows.len(), 10);

    // 小写的排序方向不被接受，退化为升序
    let result = search
        .search_executions(&Condition::new(10, 1).with_sort("jobName", "desc"))
        .await?;
    assert_eq!(result.rows[0].job_name, "test_job_1");

    Ok(())
}

#[tokio::test]
#[traced_test]
async fn test_find_executions_with_time_range() -> Result<()> {
    let manager = seeded_manager().await?;
    let search = manager.event_search();

    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let now = Utc::now();
    let ten_minutes_before = now - Duration::minutes(10);

    let cases = [
        (Some(ten_minutes_before), None, 500, 10),
        (Some(now), None, 0, 0),
        (None, Some(ten_minutes_before), 0, 0),
        (None, Some(now), 500, 10),
        (Some(ten_minutes_before), Some(now), 500, 10),
    ];

    for (start_time, end_time, expected_total, expected_rows) in cases {
        let mut condition = Condition::new(10, 1);
        condition.start_time = start_time;
        condition.end_time = end_time;

        let result = search.search_executions(&condition).await?;
        assert_eq!(result.total, expected_total);
        assert_eq!(result.rows.len(), expected_rows);
    }

    Ok(())
}

#[tokio::test]
#[traced_test]
async fn test_time_bounds_are_inclusive() -> Result<()> {
    let manager = memory_manager().await?;
    let store = manager.event_store();
    let search = manager.event_search();

    let start = start_event("task-1", "job_a");
    store.append_execution(&start).await?;
    let trace = failover_trace("job_a");
    store.append_trace(&trace).await?;

    let exact = Condition::new(10, 1)
        .with_start_time(start.start_time)
        .with_end_time(start.start_time);
    let result = search.search_executions(&exact).await?;
    assert_eq!(result.total, 1);
    assert_eq!(result.rows[0].start_time, start.start_time);

    let exact = Condition::new(10, 1)
        .with_start_time(trace.creation_time)
        .with_end_time(trace.creation_time);
    let result = search.search_traces(&exact).await?;
    assert_eq!(result.total, 1);
    assert_eq!(result.rows[0].creation_time, trace.creation_time);

    let just_after = start.start_time + Duration::milliseconds(1);
    let result = search
        .search_executions(&Condition::new(10, 1).with_start_time(just_after))
        .await?;
    assert_eq!(result.total, 0);

    let just_before = trace.creation_time - Duration::milliseconds(1);
    let result = search
        .search_traces(&Condition::new(10, 1).with_end_time(just_before))
        .await?;
    assert_eq!(result.total, 0);

    Ok(())
}

#[tokio::test]
#[traced_test]
async fn test_find_executions_with_fields() -> Result<()> {
    let manager = seeded_manager().await?;
    let search = manager.event_search();

    let result = search
        .search_executions(&Condition::new(10, 1).with_field("isSuccess", "1"))
        .await?;
    assert_eq!(result.total, 250);
    assert_eq!(result.rows.len(), 10);
    assert!(result.rows.iter().all(|row| row.is_success));

    let condition = Condition::new(10, 1)
        .with_null_field("isSuccess")
        .with_field("jobName", "test_job_1");
    let result = search.search_executions(&condition).await?;
    assert_eq!(result.total, 1);
    assert_eq!(result.rows.len(), 1);
    assert!(result.rows[0].is_open());

    let result = search
        .search_executions(&Condition::new(10, 1).with_field("is_success", false))
        .await?;
    assert_eq!(result.total, 250);

    Ok(())
}

#[tokio::test]
#[traced_test]
async fn test_find_executions_with_invalid_fields() -> Result<()> {
    let manager = seeded_manager().await?;
    let search = manager.event_search();

    let result = search
        .search_executions(&Condition::new(10, 1).with_field("notExistField", "some value"))
        .await?;
    assert_eq!(result.total, 500);
    assert_eq!(result.rows.len(), 10);

    // 无法转换为布尔值的过滤值被忽略
    let result = search
        .search_executions(&Condition::new(10, 1).with_field("isSuccess", "maybe"))
        .await?;
    assert_eq!(result.total, 500);

    Ok(())
}

#[tokio::test]
#[traced_test]
async fn test_find_traces_with_page_size_and_number() -> Result<()> {
    let manager = seeded_manager().await?;
    let search = manager.event_search();

    for (page_size, page_number, expected_rows) in [(10, 1, 10), (50, 1, 50), (100, 5, 100), (100, 6, 0)] {
        let result = search
            .search_traces(&Condition::new(page_size, page_number))
            .await?;
        assert_eq!(result.total, 500);
        assert_eq!(result.rows.len(), expected_rows);
    }

    let result = search.search_traces(&Condition::new(-1, -1)).await?;
    assert_eq!(result.total, 500);
    assert_eq!(result.rows.len(), 10);

    Ok(())
}

#[tokio::test]
#[traced_test]
async fn test_find_traces_with_sort_time_and_fields() -> Result<()> {
    let manager = seeded_manager().await?;
    let search = manager.event_search();

    let result = search
        .search_traces(&Condition::new(10, 1).with_sort("jobName", "DESC"))
        .await?;
    assert_eq!(result.rows[0].job_name, "test_job_99");

    let result = search
        .search_traces(&Condition::new(10, 1).with_sort("jobName", "ERROR_SORT"))
        .await?;
    assert_eq!(result.rows[0].job_name, "test_job_1");

    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let now = Utc::now();
    let result = search
        .search_traces(&Condition::new(10, 1).with_start_time(now))
        .await?;
    assert_eq!(result.total, 0);
    assert!(result.rows.is_empty());

    let result = search
        .search_traces(&Condition::new(10, 1).with_end_time(now))
        .await?;
    assert_eq!(result.total, 500);

    let result = search
        .search_traces(&Condition::new(10, 1).with_field("jobName", "test_job_1"))
        .await?;
    assert_eq!(result.total, 1);
    assert_eq!(result.rows[0].message, "message is empty.");

    let result = search
        .search_traces(&Condition::new(10, 1).with_field("notExistField", "some value"))
        .await?;
    assert_eq!(result.total, 500);

    Ok(())
}

#[tokio::test]
#[traced_test]
async fn test_pages_do_not_overlap() -> Result<()> {
    let manager = seeded_manager().await?;
    let search = manager.event_search();

    let first = search
        .search_executions(&Condition::new(100, 1).with_sort("isSuccess", "DESC"))
        .await?;
    let second = search
        .search_executions(&Condition::new(100, 2).with_sort("isSuccess", "DESC"))
        .await?;

    let first_ids: Vec<i64> = first.rows.iter().map(|row| row.id).collect();
    assert!(second.rows.iter().all(|row| !first_ids.contains(&row.id)));
    assert!(first.rows.iter().all(|row| row.is_success));

    Ok(())
}

#[tokio::test]
#[traced_test]
async fn test_injection_attempts_are_ignored() -> Result<()> {
    let manager = seeded_manager().await?;
    let search = manager.event_search();

    let injection = "job_name; DROP TABLE job_execution_log; --";
    let condition = Condition::new(10, 1)
        .with_sort(injection, "DESC; DELETE FROM job_status_trace_log")
        .with_field(injection, "1")
        .with_field("hostname", "localhost' OR '1'='1");

    let result = search.search_executions(&condition).await?;
    assert_eq!(result.total, 0);
    assert!(result.rows.is_empty());

    let result = search.search_traces(&condition).await?;
    assert_eq!(result.total, 500);

    // 两张表仍然完好
    let executions = search.search_executions(&Condition::default()).await?;
    let traces = search.search_traces(&Condition::default()).await?;
    assert_eq!(executions.total, 500);
    assert_eq!(traces.total, 500);

    Ok(())
}

#[tokio::test]
#[traced_test]
async fn test_generic_search_matches_trait_api() -> Result<()> {
    let manager = seeded_manager().await?;
    let DatabasePool::SQLite(pool) = manager.pool() else {
        panic!("expected sqlite pool");
    };
    let search = SqliteEventSearch::new(pool.clone());

    let condition = Condition::new(20, 3).with_sort("jobName", "ASC");
    let generic = search.search::<ExecutionEvent>(&condition).await?;
    let via_trait = search.search_executions(&condition).await?;
    assert_eq!(generic, via_trait);

    let traces = search.search::<StatusTraceEvent>(&Condition::default()).await?;
    assert_eq!(traces.total, 500);

    Ok(())
}

#[tokio::test]
#[traced_test]
async fn test_find_traces_by_task_id() -> Result<()> {
    let manager = seeded_manager().await?;
    let search = manager.event_search();

    let traces = search
        .find_traces_by_task_id("fake_failed_failover_task_id")
        .await?;
    assert_eq!(traces.len(), 500);
    assert!(traces.windows(2).all(|pair| pair[0].id < pair[1].id));
    assert_eq!(traces[0].job_name, "test_job_1");

    assert!(search.find_traces_by_task_id("unknown").await?.is_empty());

    Ok(())
}
