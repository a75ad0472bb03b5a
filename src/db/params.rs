//! Bind parameters for parameterized SQL.
//!
//! Queries reference parameters positionally (`$1`, `$2`, ...); the
//! executor never inspects or rewrites the SQL text.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::Postgres;
use sqlx::postgres::PgArguments;
use sqlx::types::Json;

/// A value bound to a `$n` placeholder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SqlParam {
    /// NULL value
    Null,
    /// Boolean value
    Bool(bool),
    /// Integer value (stored as i64 for maximum range)
    Int(i64),
    /// Floating point value
    Float(f64),
    /// Text value
    Text(String),
    /// JSON value (bound as jsonb)
    Json(JsonValue),
}

impl SqlParam {
    /// Check if this parameter is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Get the type name of this parameter for debugging.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Text(_) => "text",
            Self::Json(_) => "json",
        }
    }
}

impl From<bool> for SqlParam {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i32> for SqlParam {
    fn from(value: i32) -> Self {
        Self::Int(value.into())
    }
}

impl From<i64> for SqlParam {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for SqlParam {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for SqlParam {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for SqlParam {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<JsonValue> for SqlParam {
    fn from(value: JsonValue) -> Self {
        Self::Json(value)
    }
}

/// Attach every parameter to `sql` in positional order.
pub(crate) fn bind_all<'q>(
    sql: &'q str,
    params: &'q [SqlParam],
) -> sqlx::query::Query<'q, Postgres, PgArguments> {
    let mut query = sqlx::query(sql);
    for param in params {
        query = bind_param(query, param);
    }
    query
}

fn bind_param<'q>(
    query: sqlx::query::Query<'q, Postgres, PgArguments>,
    param: &'q SqlParam,
) -> sqlx::query::Query<'q, Postgres, PgArguments> {
    match param {
        SqlParam::Null => query.bind(None::<String>),
        SqlParam::Bool(v) => query.bind(*v),
        SqlParam::Int(v) => query.bind(*v),
        SqlParam::Float(v) => query.bind(*v),
        SqlParam::Text(v) => query.bind(v.as_str()),
        SqlParam::Json(v) => query.bind(Json(v)),
    }
}
