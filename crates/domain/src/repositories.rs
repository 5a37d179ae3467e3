use async_trait::async_trait;
use telemetry_errors::TelemetryResult;

use crate::entities::{ExecutionEvent, StatusTraceEvent};
use crate::search::{Condition, SearchResult};

/// `append_execution` 对存储产生的实际影响
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionAppend {
    /// 新插入一行（开始事件，或找不到未完成行的完成事件）
    Inserted { id: i64 },
    /// 原地补全了未完成的行
    Completed { id: i64 },
    /// 重复投递的开始事件，已存在未完成的行
    Duplicate { id: i64 },
}

impl ExecutionAppend {
    pub fn id(&self) -> i64 {
        match self {
            ExecutionAppend::Inserted { id }
            | ExecutionAppend::Completed { id }
            | ExecutionAppend::Duplicate { id } => *id,
        }
    }

    pub fn outcome(&self) -> &'static str {
        match self {
            ExecutionAppend::Inserted { .. } => "inserted",
            ExecutionAppend::Completed { .. } => "completed",
            ExecutionAppend::Duplicate { .. } => "duplicate",
        }
    }
}

#[async_trait]
pub trait EventStore: Send + Sync {
    async fn append_execution(&self, event: &ExecutionEvent) -> TelemetryResult<ExecutionAppend>;
    async fn append_trace(&self, event: &StatusTraceEvent) -> TelemetryResult<i64>;
}

#[async_trait]
pub trait EventSearch: Send + Sync {
    async fn search_executions(
        &self,
        condition: &Condition,
    ) -> TelemetryResult<SearchResult<ExecutionEvent>>;
    async fn search_traces(
        &self,
        condition: &Condition,
    ) -> TelemetryResult<SearchResult<StatusTraceEvent>>;
    async fn find_traces_by_task_id(&self, task_id: &str)
        -> TelemetryResult<Vec<StatusTraceEvent>>;
}
