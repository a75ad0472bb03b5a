//! Database session owning a single lazily-established connection.

use sqlx::ConnectOptions;
use sqlx::Connection as _;
use sqlx::postgres::PgConnection;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::DbConfig;
use crate::error::{Error, Result};

/// A session wrapping one lazily-created PostgreSQL connection.
///
/// The session is constructed once, shared as `Arc<Session>`, and owned
/// by the server lifecycle. Callers are serialized on an internal mutex
/// for the duration of one transaction scope; at most one live
/// connection exists per session at any time.
pub struct Session {
    pub(crate) config: DbConfig,
    pub(crate) inner: Mutex<SessionInner>,
}

#[derive(Default)]
pub(crate) struct SessionInner {
    conn: Option<PgConnection>,
}

impl Session {
    /// Create a session. No connection is opened until first use.
    pub fn new(config: DbConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(SessionInner::default()),
        }
    }

    /// Ensure a live connection exists.
    ///
    /// Establishes one when none exists or the existing one no longer
    /// answers; a usable connection is never replaced. An establishment
    /// failure surfaces immediately, without retry.
    pub async fn connect(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;
        inner.get_or_connect(&self.config).await?;
        Ok(())
    }

    /// Close the connection if one is open. Safe to call repeatedly or
    /// before any connection was made.
    pub async fn close(&self) {
        let mut inner = self.inner.lock().await;
        if let Some(conn) = inner.conn.take() {
            match conn.close().await {
                Ok(()) => info!("database connection closed"),
                Err(e) => warn!(error = %e, "error while closing database connection"),
            }
        }
    }
}

impl SessionInner {
    /// Get the live connection, establishing or replacing it only when
    /// absent or dead.
    pub(crate) async fn get_or_connect(&mut self, config: &DbConfig) -> Result<&mut PgConnection> {
        if let Some(mut conn) = self.conn.take() {
            if conn.ping().await.is_ok() {
                debug!("reusing existing database connection");
                return Ok(self.conn.insert(conn));
            }
            warn!("database connection no longer answers, reconnecting");
            let _ = conn.close().await;
        }

        let conn = config
            .connect_options()
            .connect()
            .await
            .map_err(Error::connection)?;
        info!(host = %config.host, dbname = %config.dbname, "database connection established");
        Ok(self.conn.insert(conn))
    }
}
