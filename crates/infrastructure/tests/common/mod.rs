#![allow(dead_code)]

use anyhow::Result;
use telemetry_domain::{
    EventStore, ExecutionEvent, ExecutionSource, StatusTraceEvent, TaskState, TraceSource,
};
use telemetry_infrastructure::DatabaseManager;

/// 创建带表结构的内存数据库
pub async fn memory_manager() -> Result<DatabaseManager> {
    let manager = DatabaseManager::from_url("sqlite::memory:").await?;
    manager.create_schema().await?;
    Ok(manager)
}

pub fn start_event(task_id: &str, job_name: &str) -> ExecutionEvent {
    ExecutionEvent::new(
        "localhost",
        "127.0.0.1",
        task_id,
        job_name,
        ExecutionSource::NormalTrigger,
        0,
    )
}

pub fn failover_trace(job_name: &str) -> StatusTraceEvent {
    StatusTraceEvent::new(
        job_name,
        "fake_failed_failover_task_id",
        "fake_slave_id",
        TraceSource::LiteExecutor,
        "FAILOVER",
        "0",
        TaskState::TaskFailed,
        "message is empty.",
    )
}

/// 写入 500 个作业：偶数作业成功完成，每个作业一条失效转移轨迹
pub async fn seed_five_hundred_jobs(store: &dyn EventStore) -> Result<()> {
    for i in 1..=500 {
        let job_name = format!("test_job_{}", i);
        let start = start_event("fake_task_id", &job_name);
        store.append_execution(&start).await?;
        if i % 2 == 0 {
            store.append_execution(&start.execution_success()).await?;
        }
        store.append_trace(&failover_trace(&job_name)).await?;
    }
    Ok(())
}
