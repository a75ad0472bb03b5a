//! Transaction scoping for single query-executor calls.
//!
//! Every executor operation runs inside one scope: the transaction
//! begins on entry, commits when the scoped body succeeds, and rolls
//! back before the failure propagates when it does not. The transaction
//! resource is consumed on every exit path.

use sqlx::Connection as _;
use sqlx::postgres::PgConnection;
use sqlx::{Postgres, Transaction};
use tracing::warn;

use crate::error::{Error, Result};

/// Open a transaction on the session's connection.
pub(crate) async fn begin(conn: &mut PgConnection) -> Result<Transaction<'_, Postgres>> {
    conn.begin().await.map_err(Error::query)
}

/// Settle a transaction around the outcome of the scoped body.
///
/// Commits on success; on failure rolls back first and then propagates
/// the original error. A rollback that itself fails is logged rather
/// than allowed to mask the body's error.
pub(crate) async fn finish<T>(tx: Transaction<'_, Postgres>, outcome: Result<T>) -> Result<T> {
    match outcome {
        Ok(value) => {
            tx.commit().await.map_err(Error::query)?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                warn!(error = %rollback_err, "rollback after failed statement also failed");
            }
            Err(err)
        }
    }
}
