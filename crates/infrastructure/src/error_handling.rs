//! Error handling for event repository operations
//!
//! Storage failures are enriched with the operation, table and event identity,
//! logged once here, and surfaced to the caller as `TelemetryError`.

use chrono::{DateTime, Utc};
use sqlx::error::ErrorKind;
use sqlx::Error as SqlxError;
use std::fmt;
use telemetry_errors::TelemetryError;
use tracing::{debug, error, instrument, warn};

/// Operation context for repository operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepositoryOperation {
    Append,
    Complete,
    Search,
    Count,
    Read,
    Migrate,
}

impl fmt::Display for RepositoryOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RepositoryOperation::Append => write!(f, "写入"),
            RepositoryOperation::Complete => write!(f, "补全"),
            RepositoryOperation::Search => write!(f, "检索"),
            RepositoryOperation::Count => write!(f, "统计"),
            RepositoryOperation::Read => write!(f, "查询"),
            RepositoryOperation::Migrate => write!(f, "初始化"),
        }
    }
}

/// Context information for event repository operations
#[derive(Debug, Clone)]
pub struct EventOperationContext {
    pub operation: RepositoryOperation,
    pub table: &'static str,
    pub task_id: Option<String>,
    pub job_name: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub additional_info: Option<String>,
}

impl EventOperationContext {
    pub fn new(operation: RepositoryOperation, table: &'static str) -> Self {
        Self {
            operation,
            table,
            task_id: None,
            job_name: None,
            timestamp: Utc::now(),
            additional_info: None,
        }
    }

    pub fn with_task_id(mut self, task_id: impl Into<String>) -> Self {
        self.task_id = Some(task_id.into());
        self
    }

    pub fn with_job_name(mut self, job_name: impl Into<String>) -> Self {
        self.job_name = Some(job_name.into());
        self
    }

    pub fn with_additional_info(mut self, info: impl Into<String>) -> Self {
        self.additional_info = Some(info.into());
        self
    }

    pub fn entity_description(&self) -> String {
        match (&self.job_name, &self.task_id) {
            (Some(job), Some(task)) => format!("表 {} 中作业 '{}' (任务ID: {})", self.table, job, task),
            (Some(job), None) => format!("表 {} 中作业 '{}'", self.table, job),
            (None, Some(task)) => format!("表 {} 中任务 '{}'", self.table, task),
            (None, None) => format!("表 {}", self.table),
        }
    }
}

pub struct RepositoryErrorHelpers;

impl RepositoryErrorHelpers {
    /// Create a database error with event context
    #[instrument(skip_all, fields(
        operation = %context.operation,
        table = context.table,
        task_id = ?context.task_id,
        job_name = ?context.job_name,
        timestamp = %context.timestamp,
    ))]
    pub fn event_database_error(context: EventOperationContext, error: SqlxError) -> TelemetryError {
        let entity_desc = context.entity_description();
        let operation_desc = context.operation.to_string();

        let error_msg = match &error {
            // SQLite 不提供约束名，按错误类别判断
            SqlxError::Database(db_error) if !matches!(db_error.kind(), ErrorKind::Other) => {
                format!(
                    "{}{}时发生数据库约束冲突: {}",
                    operation_desc,
                    entity_desc,
                    db_error.constraint().unwrap_or_else(|| db_error.message())
                )
            }
            SqlxError::Database(db_error) => {
                format!("{}{}时发生数据库错误: {}", operation_desc, entity_desc, db_error)
            }
            SqlxError::PoolClosed => {
                format!("{}{}时数据库连接池已关闭", operation_desc, entity_desc)
            }
            SqlxError::PoolTimedOut => {
                format!("{}{}时数据库连接池超时", operation_desc, entity_desc)
            }
            SqlxError::Io(io_error) => {
                format!("{}{}时发生I/O错误: {}", operation_desc, entity_desc, io_error)
            }
            SqlxError::ColumnDecode { index, source } => {
                format!(
                    "{}{}时无法解码列 {}: {}",
                    operation_desc, entity_desc, index, source
                )
            }
            _ => {
                format!("{}{}时发生未知数据库错误: {}", operation_desc, entity_desc, error)
            }
        };

        let retryable = TelemetryError::is_transient(&error);
        match &context.additional_info {
            Some(info) => error!(error = %error, retryable, info = %info, "{}", error_msg),
            None => error!(error = %error, retryable, "{}", error_msg),
        }
        TelemetryError::database_error(error_msg, &error)
    }

    pub fn log_operation_success(context: &EventOperationContext, additional_info: Option<&str>) {
        let base_msg = format!("{}{}成功", context.operation, context.entity_description());

        if let Some(info) = additional_info {
            debug!("{}: {}", base_msg, info);
        } else {
            debug!("{}", base_msg);
        }
    }

    pub fn log_operation_warning(context: &EventOperationContext, warning: &str) {
        warn!(
            "{}{}时警告: {}",
            context.operation,
            context.entity_description(),
            warning
        );
    }
}

/// Macro for creating event operation context easily
#[macro_export]
macro_rules! event_context {
    ($operation:expr, $table:expr) => {
        $crate::error_handling::EventOperationContext::new($operation, $table)
    };
    ($operation:expr, $table:expr, task_id = $task_id:expr) => {
        $crate::error_handling::EventOperationContext::new($operation, $table)
            .with_task_id($task_id)
    };
    ($operation:expr, $table:expr, task_id = $task_id:expr, job_name = $job_name:expr) => {
        $crate::error_handling::EventOperationContext::new($operation, $table)
            .with_task_id($task_id)
            .with_job_name($job_name)
    };
}
