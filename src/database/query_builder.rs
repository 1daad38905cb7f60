use std::time::Instant;

use serde_json::Value;
use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::{self, FromRow, Row, Sqlite, SqlitePool};

use crate::database::manager::DatabaseError;
use crate::filter::Filter;
use crate::filter::types::SqlResult;

/// Runs a [`Filter`] and decodes the rows as `T`.
pub struct QueryBuilder<T> {
    filter: Filter,
    slow_query_threshold_ms: Option<u64>,
    _phantom: std::marker::PhantomData<T>,
}

impl<T> QueryBuilder<T>
where
    T: for<'r> FromRow<'r, SqliteRow> + Send + Unpin,
{
    pub fn new(filter: Filter) -> Self {
        Self { filter, slow_query_threshold_ms: None, _phantom: std::marker::PhantomData }
    }

    /// Warn about statements slower than `threshold_ms`.
    pub fn warn_slower_than(mut self, threshold_ms: Option<u64>) -> Self {
        self.slow_query_threshold_ms = threshold_ms;
        self
    }

    pub async fn select_all(&self, pool: &SqlitePool) -> Result<Vec<T>, DatabaseError> {
        let sql_result = self.filter.to_sql();
        let started = Instant::now();
        let mut q = sqlx::query_as::<_, T>(&sql_result.query);
        for p in sql_result.params.iter() {
            q = bind_param_query_as(q, p);
        }
        let rows = q.fetch_all(pool).await?;
        self.observe(&sql_result, started);
        Ok(rows)
    }

    pub async fn select_optional(&self, pool: &SqlitePool) -> Result<Option<T>, DatabaseError> {
        let sql_result = self.filter.to_sql();
        let started = Instant::now();
        let mut q = sqlx::query_as::<_, T>(&sql_result.query);
        for p in sql_result.params.iter() {
            q = bind_param_query_as(q, p);
        }
        let row = q.fetch_optional(pool).await?;
        self.observe(&sql_result, started);
        Ok(row)
    }

    pub async fn count(&self, pool: &SqlitePool) -> Result<i64, DatabaseError> {
        let sql_result = self.filter.to_count_sql();
        let started = Instant::now();
        let mut q = sqlx::query(&sql_result.query);
        for p in sql_result.params.iter() {
            q = bind_param_query(q, p);
        }
        let row = q.fetch_one(pool).await?;
        self.observe(&sql_result, started);
        let count: i64 = row.try_get("count")?;
        Ok(count)
    }

    fn observe(&self, sql_result: &SqlResult, started: Instant) {
        let elapsed = started.elapsed().as_millis() as u64;
        if let Some(threshold) = self.slow_query_threshold_ms {
            if elapsed > threshold {
                tracing::warn!("Slow query ({}ms): {}", elapsed, sql_result.query);
            }
        }
        tracing::trace!("{} [{} params] in {}ms", sql_result.query, sql_result.params.len(), elapsed);
    }
}

pub fn bind_param_query<'q>(
    q: sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>,
    v: &'q Value,
) -> sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>> {
    match v {
        Value::Null => {
            let none: Option<String> = None;
            q.bind(none)
        }
        Value::Bool(b) => q.bind(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                q.bind(i)
            } else if let Some(f) = n.as_f64() {
                q.bind(f)
            } else {
                q.bind(n.to_string())
            }
        }
        Value::String(s) => q.bind(s.as_str()),
        Value::Array(_) | Value::Object(_) => q.bind(v.to_string()),
    }
}

pub fn bind_param_query_as<'q, O>(
    q: sqlx::query::QueryAs<'q, Sqlite, O, SqliteArguments<'q>>,
    v: &'q Value,
) -> sqlx::query::QueryAs<'q, Sqlite, O, SqliteArguments<'q>>
where
    O: for<'r> FromRow<'r, SqliteRow>,
{
    match v {
        Value::Null => {
            let none: Option<String> = None;
            q.bind(none)
        }
        Value::Bool(b) => q.bind(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                q.bind(i)
            } else if let Some(f) = n.as_f64() {
                q.bind(f)
            } else {
                q.bind(n.to_string())
            }
        }
        Value::String(s) => q.bind(s.as_str()),
        Value::Array(_) | Value::Object(_) => q.bind(v.to_string()),
    }
}
