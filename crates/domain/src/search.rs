//! Generic search conditions over the event tables.
//!
//! A [`Condition`] is caller-supplied and untrusted. [`Condition::plan`] turns it
//! into a [`SearchPlan`] whose column identifiers all come from the entity's
//! static [`EventTable::COLUMNS`] list, so the query layer never interpolates a
//! caller string as SQL.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use crate::entities::{ExecutionEvent, StatusTraceEvent};

pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const DEFAULT_PAGE_NUMBER: i64 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Integer,
    Text,
    Bool,
    Timestamp,
}

/// 实体列描述：字段名（调用方使用的 camelCase）与 SQL 列名
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub field: &'static str,
    pub name: &'static str,
    pub kind: ColumnKind,
    pub sortable: bool,
    pub filterable: bool,
}

impl Column {
    pub const fn new(field: &'static str, name: &'static str, kind: ColumnKind) -> Self {
        Self {
            field,
            name,
            kind,
            sortable: true,
            filterable: true,
        }
    }

    pub const fn unsortable(mut self) -> Self {
        self.sortable = false;
        self
    }

    pub const fn unfilterable(mut self) -> Self {
        self.filterable = false;
        self
    }

    fn matches(&self, key: &str) -> bool {
        self.field == key || self.name == key
    }
}

/// 可被检索的事件表
pub trait EventTable {
    const TABLE: &'static str;
    /// 时间范围过滤作用的列
    const CREATION_COLUMN: &'static str;
    const NATURAL_ORDER: &'static str = "id";
    const COLUMNS: &'static [Column];

    fn sortable_column(key: &str) -> Option<&'static Column> {
        Self::COLUMNS.iter().find(|c| c.sortable && c.matches(key))
    }

    fn filterable_column(key: &str) -> Option<&'static Column> {
        Self::COLUMNS.iter().find(|c| c.filterable && c.matches(key))
    }

    fn select_list() -> String {
        Self::COLUMNS
            .iter()
            .map(|c| c.name)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl EventTable for ExecutionEvent {
    const TABLE: &'static str = "job_execution_log";
    const CREATION_COLUMN: &'static str = "start_time";
    const COLUMNS: &'static [Column] = &[
        Column::new("id", "id", ColumnKind::Integer),
        Column::new("hostname", "hostname", ColumnKind::Text),
        Column::new("ip", "ip", ColumnKind::Text),
        Column::new("taskId", "task_id", ColumnKind::Text),
        Column::new("jobName", "job_name", ColumnKind::Text),
        Column::new("executionSource", "execution_source", ColumnKind::Text),
        Column::new("shardingItem", "sharding_item", ColumnKind::Integer),
        Column::new("startTime", "start_time", ColumnKind::Timestamp).unfilterable(),
        Column::new("isSuccess", "is_success", ColumnKind::Bool),
        Column::new("completeTime", "complete_time", ColumnKind::Timestamp).unfilterable(),
        Column::new("failureCause", "failure_cause", ColumnKind::Text).unsortable(),
    ];
}

impl EventTable for StatusTraceEvent {
    const TABLE: &'static str = "job_status_trace_log";
    const CREATION_COLUMN: &'static str = "creation_time";
    const COLUMNS: &'static [Column] = &[
        Column::new("id", "id", ColumnKind::Integer),
        Column::new("jobName", "job_name", ColumnKind::Text),
        Column::new("originalTaskId", "original_task_id", ColumnKind::Text),
        Column::new("taskId", "task_id", ColumnKind::Text),
        Column::new("slaveId", "slave_id", ColumnKind::Text),
        Column::new("source", "source", ColumnKind::Text),
        Column::new("executionType", "execution_type", ColumnKind::Text),
        Column::new("shardingItem", "sharding_item", ColumnKind::Text),
        Column::new("state", "state", ColumnKind::Text),
        Column::new("message", "message", ColumnKind::Text).unsortable(),
        Column::new("creationTime", "creation_time", ColumnKind::Timestamp).unfilterable(),
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortOrder {
    #[default]
    #[serde(rename = "ASC")]
    Asc,
    #[serde(rename = "DESC")]
    Desc,
}

impl SortOrder {
    /// 仅接受大写的 "ASC" / "DESC"
    pub fn parse_strict(s: &str) -> Option<Self> {
        match s {
            "ASC" => Some(SortOrder::Asc),
            "DESC" => Some(SortOrder::Desc),
            _ => None,
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// 字段过滤值
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Integer(i64),
    Text(String),
}

impl FieldValue {
    /// 按列类型转换过滤值，无法转换时返回 None
    pub fn coerce(&self, kind: ColumnKind) -> Option<FieldValue> {
        match (kind, self) {
            (ColumnKind::Text, FieldValue::Text(s)) => Some(FieldValue::Text(s.clone())),
            (ColumnKind::Text, FieldValue::Integer(i)) => Some(FieldValue::Text(i.to_string())),
            (ColumnKind::Integer, FieldValue::Integer(i)) => Some(FieldValue::Integer(*i)),
            (ColumnKind::Integer, FieldValue::Text(s)) => {
                s.trim().parse().ok().map(FieldValue::Integer)
            }
            (ColumnKind::Bool, FieldValue::Bool(b)) => Some(FieldValue::Bool(*b)),
            (ColumnKind::Bool, FieldValue::Integer(0)) => Some(FieldValue::Bool(false)),
            (ColumnKind::Bool, FieldValue::Integer(1)) => Some(FieldValue::Bool(true)),
            (ColumnKind::Bool, FieldValue::Text(s)) => match s.trim().to_ascii_lowercase().as_str()
            {
                "1" | "true" => Some(FieldValue::Bool(true)),
                "0" | "false" => Some(FieldValue::Bool(false)),
                _ => None,
            },
            _ => None,
        }
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

/// 检索条件。除分页参数外均可缺省，非法取值一律退化为默认值而不报错。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Condition {
    pub page_size: i64,
    pub page_number: i64,
    pub sort_column: Option<String>,
    pub sort_order: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub fields: BTreeMap<String, Option<FieldValue>>,
}

impl Condition {
    pub fn new(page_size: i64, page_number: i64) -> Self {
        Self {
            page_size,
            page_number,
            ..Default::default()
        }
    }

    pub fn with_sort(mut self, column: impl Into<String>, order: impl Into<String>) -> Self {
        self.sort_column = Some(column.into());
        self.sort_order = Some(order.into());
        self
    }

    pub fn with_start_time(mut self, start_time: DateTime<Utc>) -> Self {
        self.start_time = Some(start_time);
        self
    }

    pub fn with_end_time(mut self, end_time: DateTime<Utc>) -> Self {
        self.end_time = Some(end_time);
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(key.into(), Some(value.into()));
        self
    }

    pub fn with_null_field(mut self, key: impl Into<String>) -> Self {
        self.fields.insert(key.into(), None);
        self
    }

    /// 归一化为针对某张事件表的检索计划
    pub fn plan<T: EventTable>(&self) -> SearchPlan {
        let page_size = if self.page_size > 0 {
            self.page_size
        } else {
            DEFAULT_PAGE_SIZE
        };
        let page_number = if self.page_number > 0 {
            self.page_number
        } else {
            DEFAULT_PAGE_NUMBER
        };

        let sort_column = self
            .sort_column
            .as_deref()
            .and_then(T::sortable_column);
        let (order_by, sort_order) = match sort_column {
            Some(column) => (
                column.name,
                self.sort_order
                    .as_deref()
                    .and_then(SortOrder::parse_strict)
                    .unwrap_or_default(),
            ),
            None => {
                if let Some(requested) = &self.sort_column {
                    debug!(table = T::TABLE, sort_column = %requested, "忽略不可排序的列");
                }
                (T::NATURAL_ORDER, SortOrder::Asc)
            }
        };

        let mut filters = Vec::new();
        for (key, value) in &self.fields {
            let Some(value) = value else {
                continue;
            };
            let Some(column) = T::filterable_column(key) else {
                debug!(table = T::TABLE, field = %key, "忽略未知的过滤字段");
                continue;
            };
            match value.coerce(column.kind) {
                Some(value) => filters.push(FieldFilter {
                    column: column.name,
                    value,
                }),
                None => debug!(table = T::TABLE, field = %key, "忽略类型不匹配的过滤值"),
            }
        }

        SearchPlan {
            table: T::TABLE,
            creation_column: T::CREATION_COLUMN,
            natural_order: T::NATURAL_ORDER,
            page_size,
            page_number,
            order_by,
            sort_order,
            start_time: self.start_time,
            end_time: self.end_time,
            filters,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldFilter {
    pub column: &'static str,
    pub value: FieldValue,
}

/// 归一化后的检索计划，所有标识符均来自实体的静态列表
#[derive(Debug, Clone, PartialEq)]
pub struct SearchPlan {
    pub table: &'static str,
    pub creation_column: &'static str,
    pub natural_order: &'static str,
    pub page_size: i64,
    pub page_number: i64,
    pub order_by: &'static str,
    pub sort_order: SortOrder,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub filters: Vec<FieldFilter>,
}

impl SearchPlan {
    pub fn limit(&self) -> i64 {
        self.page_size
    }

    pub fn offset(&self) -> i64 {
        (self.page_number - 1).saturating_mul(self.page_size)
    }
}

/// 检索结果：`total` 为全部匹配行数，与分页无关
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult<T> {
    pub total: i64,
    pub rows: Vec<T>,
}

impl<T> SearchResult<T> {
    pub fn new(total: i64, rows: Vec<T>) -> Self {
        Self { total, rows }
    }

    pub fn empty() -> Self {
        Self {
            total: 0,
            rows: Vec::new(),
        }
    }
}
