//! DDL for the two event tables, one statement list per backend.

pub const SQLITE_SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS job_execution_log (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        hostname TEXT NOT NULL,
        ip TEXT NOT NULL,
        task_id TEXT NOT NULL,
        job_name TEXT NOT NULL,
        execution_source TEXT NOT NULL,
        sharding_item INTEGER NOT NULL,
        start_time DATETIME NOT NULL,
        is_success BOOLEAN NOT NULL DEFAULT 0,
        complete_time DATETIME,
        failure_cause TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS job_status_trace_log (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        job_name TEXT NOT NULL,
        original_task_id TEXT NOT NULL DEFAULT '',
        task_id TEXT NOT NULL,
        slave_id TEXT NOT NULL,
        source TEXT NOT NULL,
        execution_type TEXT NOT NULL,
        sharding_item TEXT NOT NULL,
        state TEXT NOT NULL,
        message TEXT NOT NULL,
        creation_time DATETIME NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_job_execution_log_task_job ON job_execution_log(task_id, job_name)",
    "CREATE INDEX IF NOT EXISTS idx_job_execution_log_start_time ON job_execution_log(start_time)",
    "CREATE INDEX IF NOT EXISTS idx_job_status_trace_log_task_state ON job_status_trace_log(task_id, state)",
    "CREATE INDEX IF NOT EXISTS idx_job_status_trace_log_creation_time ON job_status_trace_log(creation_time)",
];

pub const POSTGRES_SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS job_execution_log (
        id BIGSERIAL PRIMARY KEY,
        hostname VARCHAR(255) NOT NULL,
        ip VARCHAR(50) NOT NULL,
        task_id VARCHAR(255) NOT NULL,
        job_name VARCHAR(100) NOT NULL,
        execution_source VARCHAR(20) NOT NULL,
        sharding_item INTEGER NOT NULL,
        start_time TIMESTAMPTZ NOT NULL,
        is_success BOOLEAN NOT NULL DEFAULT FALSE,
        complete_time TIMESTAMPTZ,
        failure_cause VARCHAR(4000)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS job_status_trace_log (
        id BIGSERIAL PRIMARY KEY,
        job_name VARCHAR(100) NOT NULL,
        original_task_id VARCHAR(255) NOT NULL DEFAULT '',
        task_id VARCHAR(255) NOT NULL,
        slave_id VARCHAR(1000) NOT NULL,
        source VARCHAR(50) NOT NULL,
        execution_type VARCHAR(20) NOT NULL,
        sharding_item VARCHAR(100) NOT NULL,
        state VARCHAR(30) NOT NULL,
        message TEXT NOT NULL,
        creation_time TIMESTAMPTZ NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_job_execution_log_task_job ON job_execution_log(task_id, job_name)",
    "CREATE INDEX IF NOT EXISTS idx_job_execution_log_start_time ON job_execution_log(start_time)",
    "CREATE INDEX IF NOT EXISTS idx_job_status_trace_log_task_state ON job_status_trace_log(task_id, state)",
    "CREATE INDEX IF NOT EXISTS idx_job_status_trace_log_creation_time ON job_status_trace_log(creation_time)",
];
