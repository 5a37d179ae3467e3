use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use telemetry_config::{LogFormat, LogLevel};
use telemetry_domain::{Condition, FieldValue};
use telemetry_infrastructure::DatabaseManager;
use tracing::info;

/// 作业执行轨迹的命令行检索工具
#[derive(Parser, Debug)]
#[command(name = "job-telemetry")]
#[command(version = "1.0.0")]
#[command(about = "作业执行轨迹存储 - 命令行检索工具")]
#[command(long_about = "初始化事件表，按条件分页检索作业执行记录与状态轨迹，结果以JSON输出")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 配置文件路径
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// 日志级别，覆盖配置文件
    #[arg(short, long, global = true)]
    pub log_level: Option<LogLevel>,

    /// 日志格式 (json, pretty, text)，覆盖配置文件
    #[arg(long, global = true)]
    pub log_format: Option<LogFormat>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// 创建事件表及索引
    Init,
    /// 检索作业执行记录
    Executions(SearchArgs),
    /// 检索作业状态轨迹
    Traces(SearchArgs),
    /// 列出某个任务的全部状态轨迹
    TaskTraces {
        /// 任务ID
        task_id: String,
    },
}

#[derive(Args, Debug, Clone)]
pub struct SearchArgs {
    /// 每页条数
    #[arg(long, default_value_t = 10, allow_negative_numbers = true)]
    pub page_size: i64,
    /// 页码，从1开始
    #[arg(long, default_value_t = 1, allow_negative_numbers = true)]
    pub page: i64,
    /// 排序字段，例如 jobName
    #[arg(long)]
    pub sort: Option<String>,
    /// 排序方向 ASC / DESC
    #[arg(long)]
    pub order: Option<String>,
    /// 起始时间 (RFC3339)，包含
    #[arg(long)]
    pub from: Option<DateTime<Utc>>,
    /// 结束时间 (RFC3339)，包含
    #[arg(long)]
    pub to: Option<DateTime<Utc>>,
    /// 等值过滤，可重复，例如 --field jobName=test_job_1
    #[arg(long = "field", value_parser = parse_field)]
    pub fields: Vec<(String, String)>,
}

impl SearchArgs {
    pub fn to_condition(&self) -> Condition {
        let mut condition = Condition::new(self.page_size, self.page);
        condition.sort_column = self.sort.clone();
        condition.sort_order = self.order.clone();
        condition.start_time = self.from;
        condition.end_time = self.to;
        for (key, value) in &self.fields {
            condition
                .fields
                .insert(key.clone(), Some(FieldValue::Text(value.clone())));
        }
        condition
    }
}

fn parse_field(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("过滤条件格式应为 key=value: {raw}")),
    }
}

impl Commands {
    pub async fn run(&self, manager: &DatabaseManager) -> Result<()> {
        match self {
            Commands::Init => {
                manager.create_schema().await.context("创建事件表失败")?;
                info!("事件表初始化完成");
            }
            Commands::Executions(args) => {
                let result = manager
                    .event_search()
                    .search_executions(&args.to_condition())
                    .await
                    .context("检索作业执行记录失败")?;
                print_json(&result)?;
            }
            Commands::Traces(args) => {
                let result = manager
                    .event_search()
                    .search_traces(&args.to_condition())
                    .await
                    .context("检索作业状态轨迹失败")?;
                print_json(&result)?;
            }
            Commands::TaskTraces { task_id } => {
                let traces = manager
                    .event_search()
                    .find_traces_by_task_id(task_id)
                    .await
                    .with_context(|| format!("查询任务 {task_id} 的状态轨迹失败"))?;
                print_json(&traces)?;
            }
        }
        Ok(())
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let output = serde_json::to_string_pretty(value).context("序列化检索结果失败")?;
    println!("{output}");
    Ok(())
}
