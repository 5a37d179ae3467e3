use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 为以文本形式存储的枚举实现 SQLite / PostgreSQL 的编解码
macro_rules! text_column_enum {
    ($ty:ty) => {
        impl sqlx::Type<sqlx::Postgres> for $ty {
            fn type_info() -> sqlx::postgres::PgTypeInfo {
                <str as sqlx::Type<sqlx::Postgres>>::type_info()
            }

            fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
                <str as sqlx::Type<sqlx::Postgres>>::compatible(ty)
            }
        }

        impl sqlx::Type<sqlx::Sqlite> for $ty {
            fn type_info() -> sqlx::sqlite::SqliteTypeInfo {
                <str as sqlx::Type<sqlx::Sqlite>>::type_info()
            }

            fn compatible(ty: &sqlx::sqlite::SqliteTypeInfo) -> bool {
                <str as sqlx::Type<sqlx::Sqlite>>::compatible(ty)
            }
        }

        impl<'r> sqlx::Decode<'r, sqlx::Postgres> for $ty {
            fn decode(
                value: sqlx::postgres::PgValueRef<'r>,
            ) -> Result<Self, sqlx::error::BoxDynError> {
                let s = <&str as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
                Ok(s.parse::<$ty>()?)
            }
        }

        impl<'r> sqlx::Decode<'r, sqlx::Sqlite> for $ty {
            fn decode(
                value: sqlx::sqlite::SqliteValueRef<'r>,
            ) -> Result<Self, sqlx::error::BoxDynError> {
                let s = <&str as sqlx::Decode<sqlx::Sqlite>>::decode(value)?;
                Ok(s.parse::<$ty>()?)
            }
        }

        impl<'q> sqlx::Encode<'q, sqlx::Postgres> for $ty {
            fn encode_by_ref(
                &self,
                buf: &mut sqlx::postgres::PgArgumentBuffer,
            ) -> Result<sqlx::encode::IsNull, Box<dyn std::error::Error + Send + Sync>> {
                <&str as sqlx::Encode<sqlx::Postgres>>::encode(self.as_str(), buf)
            }
        }

        impl<'q> sqlx::Encode<'q, sqlx::Sqlite> for $ty {
            fn encode_by_ref(
                &self,
                buf: &mut Vec<sqlx::sqlite::SqliteArgumentValue<'q>>,
            ) -> Result<sqlx::encode::IsNull, Box<dyn std::error::Error + Send + Sync>> {
                <&str as sqlx::Encode<sqlx::Sqlite>>::encode(self.as_str(), buf)
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

/// 作业执行的触发来源
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ExecutionSource {
    #[serde(rename = "NORMAL_TRIGGER")]
    NormalTrigger,
    #[serde(rename = "MISFIRE")]
    Misfire,
    #[serde(rename = "FAILOVER")]
    Failover,
}

impl ExecutionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionSource::NormalTrigger => "NORMAL_TRIGGER",
            ExecutionSource::Misfire => "MISFIRE",
            ExecutionSource::Failover => "FAILOVER",
        }
    }
}

impl FromStr for ExecutionSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NORMAL_TRIGGER" => Ok(ExecutionSource::NormalTrigger),
            "MISFIRE" => Ok(ExecutionSource::Misfire),
            "FAILOVER" => Ok(ExecutionSource::Failover),
            _ => Err(format!("Invalid execution source: {s}")),
        }
    }
}

text_column_enum!(ExecutionSource);

/// 状态轨迹事件的产生方
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum TraceSource {
    #[serde(rename = "CLOUD_SCHEDULER")]
    CloudScheduler,
    #[serde(rename = "CLOUD_EXECUTOR")]
    CloudExecutor,
    #[serde(rename = "LITE_EXECUTOR")]
    LiteExecutor,
}

impl TraceSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            TraceSource::CloudScheduler => "CLOUD_SCHEDULER",
            TraceSource::CloudExecutor => "CLOUD_EXECUTOR",
            TraceSource::LiteExecutor => "LITE_EXECUTOR",
        }
    }
}

impl FromStr for TraceSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CLOUD_SCHEDULER" => Ok(TraceSource::CloudScheduler),
            "CLOUD_EXECUTOR" => Ok(TraceSource::CloudExecutor),
            "LITE_EXECUTOR" => Ok(TraceSource::LiteExecutor),
            _ => Err(format!("Invalid trace source: {s}")),
        }
    }
}

text_column_enum!(TraceSource);

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskState {
    TaskStaging,
    TaskRunning,
    TaskFinished,
    TaskKilled,
    TaskLost,
    TaskFailed,
    TaskError,
    TaskDropped,
    TaskGone,
    TaskGoneByOperator,
    TaskUnreachable,
    TaskUnknown,
}

impl TaskState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskState::TaskStaging => "TASK_STAGING",
            TaskState::TaskRunning => "TASK_RUNNING",
            TaskState::TaskFinished => "TASK_FINISHED",
            TaskState::TaskKilled => "TASK_KILLED",
            TaskState::TaskLost => "TASK_LOST",
            TaskState::TaskFailed => "TASK_FAILED",
            TaskState::TaskError => "TASK_ERROR",
            TaskState::TaskDropped => "TASK_DROPPED",
            TaskState::TaskGone => "TASK_GONE",
            TaskState::TaskGoneByOperator => "TASK_GONE_BY_OPERATOR",
            TaskState::TaskUnreachable => "TASK_UNREACHABLE",
            TaskState::TaskUnknown => "TASK_UNKNOWN",
        }
    }
}

impl FromStr for TaskState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "TASK_STAGING" => Ok(TaskState::TaskStaging),
            "TASK_RUNNING" => Ok(TaskState::TaskRunning),
            "TASK_FINISHED" => Ok(TaskState::TaskFinished),
            "TASK_KILLED" => Ok(TaskState::TaskKilled),
            "TASK_LOST" => Ok(TaskState::TaskLost),
            "TASK_FAILED" => Ok(TaskState::TaskFailed),
            "TASK_ERROR" => Ok(TaskState::TaskError),
            "TASK_DROPPED" => Ok(TaskState::TaskDropped),
            "TASK_GONE" => Ok(TaskState::TaskGone),
            "TASK_GONE_BY_OPERATOR" => Ok(TaskState::TaskGoneByOperator),
            "TASK_UNREACHABLE" => Ok(TaskState::TaskUnreachable),
            "TASK_UNKNOWN" => Ok(TaskState::TaskUnknown),
            _ => Err(format!("Invalid task state: {s}")),
        }
    }
}

text_column_enum!(TaskState);

/// 一次作业分片执行的生命周期记录。
///
/// 开始事件与其后的完成事件是同一条逻辑记录：完成事件按
/// `(task_id, job_name)` 找到尚未完成的行并原地更新。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionEvent {
    pub id: i64,
    pub hostname: String,
    pub ip: String,
    pub task_id: String,
    pub job_name: String,
    pub execution_source: ExecutionSource,
    pub sharding_item: i32,
    pub start_time: DateTime<Utc>,
    pub is_success: bool,
    pub complete_time: Option<DateTime<Utc>>,
    pub failure_cause: Option<String>,
}

impl ExecutionEvent {
    /// 构造开始事件
    pub fn new(
        hostname: impl Into<String>,
        ip: impl Into<String>,
        task_id: impl Into<String>,
        job_name: impl Into<String>,
        execution_source: ExecutionSource,
        sharding_item: i32,
    ) -> Self {
        Self {
            id: 0, // 将由数据库生成
            hostname: hostname.into(),
            ip: ip.into(),
            task_id: task_id.into(),
            job_name: job_name.into(),
            execution_source,
            sharding_item,
            start_time: Utc::now(),
            is_success: false,
            complete_time: None,
            failure_cause: None,
        }
    }

    pub fn execution_success(&self) -> Self {
        Self {
            is_success: true,
            complete_time: Some(Utc::now()),
            failure_cause: None,
            ..self.clone()
        }
    }

    pub fn execution_failure(&self, cause: impl Into<String>) -> Self {
        Self {
            is_success: false,
            complete_time: Some(Utc::now()),
            failure_cause: Some(cause.into()),
            ..self.clone()
        }
    }

    /// 完成事件：成功标记或完成时间任一存在
    pub fn is_completion(&self) -> bool {
        self.is_success || self.complete_time.is_some()
    }

    pub fn is_open(&self) -> bool {
        !self.is_success && self.complete_time.is_none()
    }
}

/// 作业状态变迁的审计记录，只追加、从不更新
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct StatusTraceEvent {
    pub id: i64,
    pub job_name: String,
    pub original_task_id: String,
    pub task_id: String,
    pub slave_id: String,
    pub source: TraceSource,
    pub execution_type: String,
    pub sharding_item: String,
    pub state: TaskState,
    pub message: String,
    pub creation_time: DateTime<Utc>,
}

impl StatusTraceEvent {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        job_name: impl Into<String>,
        task_id: impl Into<String>,
        slave_id: impl Into<String>,
        source: TraceSource,
        execution_type: impl Into<String>,
        sharding_item: impl Into<String>,
        state: TaskState,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: 0,
            job_name: job_name.into(),
            original_task_id: String::new(),
            task_id: task_id.into(),
            slave_id: slave_id.into(),
            source,
            execution_type: execution_type.into(),
            sharding_item: sharding_item.into(),
            state,
            message: message.into(),
            creation_time: Utc::now(),
        }
    }

    /// 失效转移时记录被转移的原任务
    pub fn with_original_task_id(mut self, original_task_id: impl Into<String>) -> Self {
        self.original_task_id = original_task_id.into();
        self
    }
}
