//! Error types for the memebase gateway.
//!
//! All failures surface to the immediate caller; a query error is always
//! preceded by a transaction rollback.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("missing database configuration for: {}", missing.join(", "))]
    Configuration { missing: Vec<String> },

    #[error("failed to establish database connection: {source}")]
    Connection {
        #[source]
        source: sqlx::Error,
    },

    #[error("query execution failed: {source}")]
    Query {
        #[source]
        source: sqlx::Error,
    },

    #[error("no JSON encoding for column `{column}` of type `{type_name}`")]
    Serialization { column: String, type_name: String },
}

impl Error {
    /// Create a configuration error naming every missing setting.
    pub fn configuration(missing: Vec<String>) -> Self {
        Self::Configuration { missing }
    }

    /// Create a connection error wrapping the underlying transport error.
    pub fn connection(source: sqlx::Error) -> Self {
        Self::Connection { source }
    }

    /// Create a query error wrapping the underlying driver error.
    pub fn query(source: sqlx::Error) -> Self {
        Self::Query { source }
    }

    /// Create a serialization error for a column without an encoding rule.
    pub fn serialization(column: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self::Serialization {
            column: column.into(),
            type_name: type_name.into(),
        }
    }
}

/// Result type alias for gateway operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Map gateway errors onto HTTP responses.
///
/// Connection failures are reported as 503; everything else is a plain
/// server-side failure. The body carries the error message as JSON.
impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match &self {
            Error::Connection { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Error::Configuration { .. } | Error::Query { .. } | Error::Serialization { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}
