//! Query execution helpers on [`Session`].
//!
//! Every operation opens its own transaction scope (commit on success,
//! rollback on failure); calls are not composable into a caller-visible
//! multi-statement transaction. A statement that produces no result set
//! maps to an empty or absent result, never an error.

use serde_json::Value as JsonValue;
use sqlx::query_builder::Separated;
use sqlx::{Postgres, QueryBuilder, Transaction};
use tracing::debug;

use crate::db::params::{SqlParam, bind_all};
use crate::db::rows::{JsonRow, decode_column, row_to_json, rows_to_json};
use crate::db::scope;
use crate::db::session::Session;
use crate::error::{Error, Result};

/// Default number of rows per page for [`Session::bulk_insert`].
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// A paged multi-row insert.
///
/// Whether generated identifiers are collected is decided by the
/// explicit `returning` field, never by inspecting SQL text.
#[derive(Debug, Clone, Copy)]
pub struct BulkInsert<'a> {
    /// Statement head up to the `VALUES` keyword, e.g.
    /// `INSERT INTO meme (name, tag)`.
    pub statement: &'a str,
    /// Columns for a `RETURNING` clause appended to each page; when set,
    /// the first returned column of every affected row is collected.
    pub returning: Option<&'a str>,
    /// Rows per generated statement.
    pub page_size: usize,
}

impl<'a> BulkInsert<'a> {
    /// Create a bulk insert with the default page size and no
    /// `RETURNING` clause.
    pub fn new(statement: &'a str) -> Self {
        Self {
            statement,
            returning: None,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Collect the named columns from every inserted row.
    pub fn returning(mut self, columns: &'a str) -> Self {
        self.returning = Some(columns);
        self
    }

    /// Set the number of rows per generated statement.
    pub fn page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }
}

impl Session {
    /// Run a query and collect every row as a JSON map. Returns an empty
    /// vec when the query matches no rows or produces no result set.
    pub async fn select_many(&self, sql: &str, params: &[SqlParam]) -> Result<Vec<JsonRow>> {
        debug!(sql = %sql, params = params.len(), "executing select");
        let mut inner = self.inner.lock().await;
        let conn = inner.get_or_connect(&self.config).await?;
        let mut tx = scope::begin(conn).await?;
        let outcome = fetch_many(&mut tx, sql, params).await;
        scope::finish(tx, outcome).await
    }

    /// Run a query and return the first row, or `None` when the query
    /// matches no rows or produces no result set.
    pub async fn select_one(&self, sql: &str, params: &[SqlParam]) -> Result<Option<JsonRow>> {
        debug!(sql = %sql, params = params.len(), "executing select-one");
        let mut inner = self.inner.lock().await;
        let conn = inner.get_or_connect(&self.config).await?;
        let mut tx = scope::begin(conn).await?;
        let outcome = fetch_one(&mut tx, sql, params).await;
        scope::finish(tx, outcome).await
    }

    /// Run a query and serialize the row sequence as JSON text. Dates
    /// render as ISO-8601 strings and decimals as plain numbers.
    pub async fn select_as_text(&self, sql: &str, params: &[SqlParam]) -> Result<String> {
        let rows = self.select_many(sql, params).await?;
        let array = JsonValue::Array(rows.into_iter().map(JsonValue::Object).collect());
        Ok(array.to_string())
    }

    /// Run an insert carrying a `RETURNING` clause and yield the first
    /// column of the first returned row, or `None` when the statement
    /// returned nothing. The caller is responsible for the clause.
    pub async fn insert(&self, sql: &str, params: &[SqlParam]) -> Result<Option<JsonValue>> {
        debug!(sql = %sql, params = params.len(), "executing insert");
        let mut inner = self.inner.lock().await;
        let conn = inner.get_or_connect(&self.config).await?;
        let mut tx = scope::begin(conn).await?;
        let outcome = insert_returning(&mut tx, sql, params).await;
        scope::finish(tx, outcome).await
    }

    /// Run an update and return the affected row count.
    pub async fn update(&self, sql: &str, params: &[SqlParam]) -> Result<u64> {
        self.execute_count(sql, params).await
    }

    /// Run a delete and return the affected row count.
    pub async fn delete(&self, sql: &str, params: &[SqlParam]) -> Result<u64> {
        self.execute_count(sql, params).await
    }

    /// Execute the same statement once per parameter set, all inside one
    /// transaction scope.
    pub async fn batch_execute(&self, sql: &str, param_sets: &[Vec<SqlParam>]) -> Result<()> {
        debug!(sql = %sql, batches = param_sets.len(), "executing batch");
        let mut inner = self.inner.lock().await;
        let conn = inner.get_or_connect(&self.config).await?;
        let mut tx = scope::begin(conn).await?;
        let outcome = execute_sets(&mut tx, sql, param_sets).await;
        scope::finish(tx, outcome).await
    }

    /// Insert many rows, paged into multi-row `VALUES` statements, all
    /// inside one transaction scope.
    ///
    /// When `insert.returning` is set, the generated identifiers are
    /// returned in input order; otherwise the result is empty.
    pub async fn bulk_insert(
        &self,
        insert: BulkInsert<'_>,
        values: &[Vec<SqlParam>],
    ) -> Result<Vec<JsonValue>> {
        if values.is_empty() {
            return Ok(Vec::new());
        }
        debug!(
            statement = %insert.statement,
            rows = values.len(),
            page_size = insert.page_size,
            "executing bulk insert"
        );
        let mut inner = self.inner.lock().await;
        let conn = inner.get_or_connect(&self.config).await?;
        let mut tx = scope::begin(conn).await?;
        let outcome = insert_pages(&mut tx, &insert, values).await;
        scope::finish(tx, outcome).await
    }

    async fn execute_count(&self, sql: &str, params: &[SqlParam]) -> Result<u64> {
        debug!(sql = %sql, params = params.len(), "executing statement");
        let mut inner = self.inner.lock().await;
        let conn = inner.get_or_connect(&self.config).await?;
        let mut tx = scope::begin(conn).await?;
        let outcome = execute_one(&mut tx, sql, params).await;
        scope::finish(tx, outcome).await
    }
}

async fn fetch_many(
    tx: &mut Transaction<'_, Postgres>,
    sql: &str,
    params: &[SqlParam],
) -> Result<Vec<JsonRow>> {
    let rows = bind_all(sql, params)
        .fetch_all(&mut **tx)
        .await
        .map_err(Error::query)?;
    rows_to_json(&rows)
}

async fn fetch_one(
    tx: &mut Transaction<'_, Postgres>,
    sql: &str,
    params: &[SqlParam],
) -> Result<Option<JsonRow>> {
    let row = bind_all(sql, params)
        .fetch_optional(&mut **tx)
        .await
        .map_err(Error::query)?;
    row.as_ref().map(row_to_json).transpose()
}

async fn insert_returning(
    tx: &mut Transaction<'_, Postgres>,
    sql: &str,
    params: &[SqlParam],
) -> Result<Option<JsonValue>> {
    let row = bind_all(sql, params)
        .fetch_optional(&mut **tx)
        .await
        .map_err(Error::query)?;
    match row {
        Some(row) => Ok(Some(decode_column(&row, 0)?)),
        None => Ok(None),
    }
}

async fn execute_one(
    tx: &mut Transaction<'_, Postgres>,
    sql: &str,
    params: &[SqlParam],
) -> Result<u64> {
    let result = bind_all(sql, params)
        .execute(&mut **tx)
        .await
        .map_err(Error::query)?;
    Ok(result.rows_affected())
}

async fn execute_sets(
    tx: &mut Transaction<'_, Postgres>,
    sql: &str,
    param_sets: &[Vec<SqlParam>],
) -> Result<()> {
    for params in param_sets {
        bind_all(sql, params)
            .execute(&mut **tx)
            .await
            .map_err(Error::query)?;
    }
    Ok(())
}

async fn insert_pages(
    tx: &mut Transaction<'_, Postgres>,
    insert: &BulkInsert<'_>,
    values: &[Vec<SqlParam>],
) -> Result<Vec<JsonValue>> {
    let mut ids = Vec::new();
    for page in values.chunks(insert.page_size.max(1)) {
        let mut builder = page_statement(insert, page);
        if insert.returning.is_some() {
            let returned = builder
                .build()
                .fetch_all(&mut **tx)
                .await
                .map_err(Error::query)?;
            for row in &returned {
                ids.push(decode_column(row, 0)?);
            }
        } else {
            builder
                .build()
                .execute(&mut **tx)
                .await
                .map_err(Error::query)?;
        }
    }
    Ok(ids)
}

/// Build the multi-row `VALUES` statement for one page.
fn page_statement<'q>(
    insert: &BulkInsert<'_>,
    page: &'q [Vec<SqlParam>],
) -> QueryBuilder<'q, Postgres> {
    let mut builder = QueryBuilder::new(insert.statement);
    builder.push(" ");
    builder.push_values(page, |mut b, row| {
        for param in row {
            push_bind(&mut b, param);
        }
    });
    if let Some(columns) = insert.returning {
        builder.push(" RETURNING ");
        builder.push(columns);
    }
    builder
}

fn push_bind<'q>(b: &mut Separated<'_, 'q, Postgres, &'static str>, param: &'q SqlParam) {
    match param {
        SqlParam::Null => b.push_bind(None::<String>),
        SqlParam::Bool(v) => b.push_bind(*v),
        SqlParam::Int(v) => b.push_bind(*v),
        SqlParam::Float(v) => b.push_bind(*v),
        SqlParam::Text(v) => b.push_bind(v.as_str()),
        SqlParam::Json(v) => b.push_bind(sqlx::types::Json(v)),
    };
}
