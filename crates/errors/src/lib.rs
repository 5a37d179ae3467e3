use thiserror::Error;

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),
    #[error("数据库操作错误: {message}")]
    DatabaseOperation { message: String, retryable: bool },
}

pub type TelemetryResult<T> = Result<T, TelemetryError>;

impl TelemetryError {
    /// 保留原始错误的可重试判断，只替换消息
    pub fn database_error<S: Into<String>>(message: S, source: &sqlx::Error) -> Self {
        Self::DatabaseOperation {
            message: message.into(),
            retryable: Self::is_transient(source),
        }
    }

    /// 连接类故障与锁冲突可重试；约束冲突、表缺失、解码失败不可重试
    pub fn is_transient(error: &sqlx::Error) -> bool {
        match error {
            sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) | sqlx::Error::WorkerCrashed => true,
            sqlx::Error::Database(db_error) => {
                if let Some(pg_error) = db_error.try_downcast_ref::<sqlx::postgres::PgDatabaseError>() {
                    // 40: 事务回滚/死锁, 08: 连接异常, 53: 资源不足, 57P: 服务端关闭
                    let code = pg_error.code();
                    ["40", "08", "53", "57P"]
                        .iter()
                        .any(|class| code.starts_with(class))
                } else {
                    // SQLite 扩展错误码，低 8 位为 SQLITE_BUSY(5) / SQLITE_LOCKED(6)
                    db_error
                        .code()
                        .and_then(|code| code.parse::<i32>().ok())
                        .is_some_and(|code| matches!(code & 0xff, 5 | 6))
                }
            }
            _ => false,
        }
    }

    /// 存储层错误（连接、约束冲突等），总是原样抛给调用方
    pub fn is_storage(&self) -> bool {
        matches!(
            self,
            TelemetryError::Database(_) | TelemetryError::DatabaseOperation { .. }
        )
    }

    /// 存储层不做内部重试，是否重试由调用方根据此判断决定
    pub fn is_retryable(&self) -> bool {
        match self {
            TelemetryError::DatabaseOperation { retryable, .. } => *retryable,
            TelemetryError::Database(err) => Self::is_transient(err),
        }
    }

    pub fn user_message(&self) -> &str {
        if self.is_retryable() {
            "事件存储暂不可用，请稍后重试"
        } else {
            "事件存储操作失败"
        }
    }
}
