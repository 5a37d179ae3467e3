use anyhow::{Context, Result};
use clap::Parser;
use telemetry_config::{AppConfig, LogFormat};
use telemetry_errors::TelemetryError;
use telemetry_infrastructure::DatabaseManager;
use tracing::{debug, error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod cli;

use cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 加载配置
    let config = AppConfig::load(cli.config.as_deref()).with_context(|| match &cli.config {
        Some(path) => format!("加载配置文件失败: {path}"),
        None => "加载配置失败".to_string(),
    })?;

    // 命令行参数优先于配置文件
    let log_level = cli.log_level.unwrap_or(config.observability.log_level);
    let log_format = cli.log_format.unwrap_or(config.observability.log_format);
    init_logging(&log_level.to_string(), log_format)?;

    debug!("命令: {:?}", cli.command);
    let manager = DatabaseManager::new(&config.database)
        .await
        .context("连接数据库失败")?;
    info!(database_type = ?manager.database_type(), "已连接事件存储");

    let result = cli.command.run(&manager).await;
    manager.close().await;

    if let Err(e) = &result {
        match e.downcast_ref::<TelemetryError>() {
            Some(telemetry_error) => {
                error!(retryable = telemetry_error.is_retryable(), "{}: {e:#}", telemetry_error.user_message())
            }
            None => error!("{e:#}"),
        }
    }
    result
}

/// 初始化日志系统，日志输出到 stderr，stdout 保留给检索结果
fn init_logging(log_level: &str, log_format: LogFormat) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let registry = tracing_subscriber::registry().with(env_filter);

    match log_format {
        LogFormat::Json => {
            registry
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .try_init()
                .context("初始化JSON日志格式失败")?;
        }
        LogFormat::Pretty => {
            registry
                .with(tracing_subscriber::fmt::layer().pretty().with_writer(std::io::stderr))
                .try_init()
                .context("初始化Pretty日志格式失败")?;
        }
        LogFormat::Text => {
            registry
                .with(tracing_subscriber::fmt::layer().compact().with_writer(std::io::stderr))
                .try_init()
                .context("初始化Text日志格式失败")?;
        }
    }

    Ok(())
}
