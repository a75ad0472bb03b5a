//! Row serialization: PostgreSQL rows to JSON maps.
//!
//! Dates and timestamps render as ISO-8601 text and NUMERIC values as
//! floating-point numbers so that results are transport-friendly. A
//! column whose type has no encoding rule fails with a serialization
//! error instead of being silently dropped.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde_json::{Map, Value as JsonValue};
use sqlx::postgres::PgRow;
use sqlx::{Column, Row, TypeInfo};

use crate::error::{Error, Result};

/// One result row, keyed by column name in result-set order.
pub type JsonRow = Map<String, JsonValue>;

/// Convert a row sequence into JSON maps.
pub fn rows_to_json(rows: &[PgRow]) -> Result<Vec<JsonRow>> {
    rows.iter().map(row_to_json).collect()
}

/// Convert one row into a JSON map keyed by column name.
pub fn row_to_json(row: &PgRow) -> Result<JsonRow> {
    let mut map = Map::with_capacity(row.columns().len());
    for (idx, col) in row.columns().iter().enumerate() {
        map.insert(col.name().to_string(), decode_column(row, idx)?);
    }
    Ok(map)
}

/// Decode one column to a JSON value, dispatching on the PostgreSQL
/// type name. Types without a specific rule fall back to text decoding;
/// if that also fails the column is unencodable.
pub(crate) fn decode_column(row: &PgRow, idx: usize) -> Result<JsonValue> {
    let Some(col) = row.columns().get(idx) else {
        return Err(Error::serialization(format!("column {idx}"), "unknown"));
    };
    let type_name = col.type_info().name();

    let decoded: std::result::Result<JsonValue, sqlx::Error> = match type_name {
        "INT2" => row.try_get::<Option<i16>, _>(idx).map(number),
        "INT4" => row.try_get::<Option<i32>, _>(idx).map(number),
        "INT8" => row.try_get::<Option<i64>, _>(idx).map(number),
        "FLOAT4" => row
            .try_get::<Option<f32>, _>(idx)
            .map(|v| float(v.map(f64::from))),
        "FLOAT8" => row.try_get::<Option<f64>, _>(idx).map(float),
        "NUMERIC" => row.try_get::<Option<Decimal>, _>(idx).map(decimal),
        "BOOL" => row
            .try_get::<Option<bool>, _>(idx)
            .map(|v| v.map(JsonValue::Bool).unwrap_or(JsonValue::Null)),
        "DATE" => row
            .try_get::<Option<NaiveDate>, _>(idx)
            .map(|v| text(v.map(date_string))),
        "TIME" => row
            .try_get::<Option<NaiveTime>, _>(idx)
            .map(|v| text(v.map(time_string))),
        "TIMESTAMP" => row
            .try_get::<Option<NaiveDateTime>, _>(idx)
            .map(|v| text(v.map(timestamp_string))),
        "TIMESTAMPTZ" => row
            .try_get::<Option<DateTime<Utc>>, _>(idx)
            .map(|v| text(v.map(|t| t.to_rfc3339()))),
        "UUID" => row
            .try_get::<Option<uuid::Uuid>, _>(idx)
            .map(|v| text(v.map(|u| u.to_string()))),
        "JSON" | "JSONB" => row
            .try_get::<Option<JsonValue>, _>(idx)
            .map(|v| v.unwrap_or(JsonValue::Null)),
        "BYTEA" => row
            .try_get::<Option<Vec<u8>>, _>(idx)
            .map(|v| text(v.map(|bytes| STANDARD.encode(bytes)))),
        // varchar, text, char, name, enums with a text representation
        _ => row.try_get::<Option<String>, _>(idx).map(text),
    };

    decoded.map_err(|_| Error::serialization(col.name(), type_name))
}

fn number<T: Into<serde_json::Number>>(value: Option<T>) -> JsonValue {
    value
        .map(|v| JsonValue::Number(v.into()))
        .unwrap_or(JsonValue::Null)
}

fn float(value: Option<f64>) -> JsonValue {
    match value {
        Some(v) => serde_json::Number::from_f64(v)
            .map(JsonValue::Number)
            .unwrap_or_else(|| JsonValue::String(v.to_string())),
        None => JsonValue::Null,
    }
}

fn decimal(value: Option<Decimal>) -> JsonValue {
    match value {
        Some(d) => d
            .to_f64()
            .and_then(serde_json::Number::from_f64)
            .map(JsonValue::Number)
            .unwrap_or_else(|| JsonValue::String(d.to_string())),
        None => JsonValue::Null,
    }
}

fn text(value: Option<String>) -> JsonValue {
    value.map(JsonValue::String).unwrap_or(JsonValue::Null)
}

fn date_string(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn time_string(time: NaiveTime) -> String {
    time.format("%H:%M:%S%.f").to_string()
}

fn timestamp_string(ts: NaiveDateTime) -> String {
    ts.format("%Y-%m-%dT%H:%M:%S%.f").to_string()
}
