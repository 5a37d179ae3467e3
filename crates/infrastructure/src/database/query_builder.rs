//! Search query builder - dynamic SQL construction for event searches
//!
//! Identifiers come only from the normalized `SearchPlan`; every caller value
//! is emitted as a `$n` placeholder. Both SQLite and PostgreSQL accept `$n`.

use chrono::{DateTime, Utc};
use telemetry_domain::{FieldValue, SearchPlan, SortOrder};

pub struct SearchQueryBuilder;

impl SearchQueryBuilder {
    /// Build the COUNT query over the plan's WHERE clause
    pub fn build_count_query(plan: &SearchPlan) -> (String, Vec<QueryParam>) {
        let mut query = format!("SELECT COUNT(*) FROM {} WHERE 1=1", plan.table);
        let mut params = Vec::new();

        Self::push_conditions(&mut query, &mut params, plan);

        (query, params)
    }

    /// Build the page query: WHERE + ORDER BY + LIMIT/OFFSET
    pub fn build_select_query(plan: &SearchPlan, select_list: &str) -> (String, Vec<QueryParam>) {
        let mut query = format!("SELECT {} FROM {} WHERE 1=1", select_list, plan.table);
        let mut params = Vec::new();

        Self::push_conditions(&mut query, &mut params, plan);

        query.push_str(" ORDER BY ");
        query.push_str(plan.order_by);
        query.push(' ');
        query.push_str(plan.sort_order.as_sql());
        if plan.order_by != plan.natural_order {
            // 非唯一排序列，追加自然顺序保证分页稳定
            query.push_str(", ");
            query.push_str(plan.natural_order);
            query.push(' ');
            query.push_str(SortOrder::Asc.as_sql());
        }

        query.push_str(" LIMIT $");
        query.push_str(&(params.len() + 1).to_string());
        params.push(QueryParam::Integer(plan.limit()));

        query.push_str(" OFFSET $");
        query.push_str(&(params.len() + 1).to_string());
        params.push(QueryParam::Integer(plan.offset()));

        (query, params)
    }

    fn push_conditions(query: &mut String, params: &mut Vec<QueryParam>, plan: &SearchPlan) {
        for filter in &plan.filters {
            query.push_str(" AND ");
            query.push_str(filter.column);
            query.push_str(" = $");
            query.push_str(&(params.len() + 1).to_string());
            params.push(QueryParam::from(&filter.value));
        }

        if let Some(start_time) = plan.start_time {
            query.push_str(" AND ");
            query.push_str(plan.creation_column);
            query.push_str(" >= $");
            query.push_str(&(params.len() + 1).to_string());
            params.push(QueryParam::Timestamp(start_time));
        }

        if let Some(end_time) = plan.end_time {
            query.push_str(" AND ");
            query.push_str(plan.creation_column);
            query.push_str(" <= $");
            query.push_str(&(params.len() + 1).to_string());
            params.push(QueryParam::Timestamp(end_time));
        }
    }
}

/// Query parameter for event searches
#[derive(Debug, Clone, PartialEq)]
pub enum QueryParam {
    Text(String),
    Integer(i64),
    Bool(bool),
    Timestamp(DateTime<Utc>),
}

impl From<&FieldValue> for QueryParam {
    fn from(value: &FieldValue) -> Self {
        match value {
            FieldValue::Text(s) => QueryParam::Text(s.clone()),
            FieldValue::Integer(i) => QueryParam::Integer(*i),
            FieldValue::Bool(b) => QueryParam::Bool(*b),
        }
    }
}
