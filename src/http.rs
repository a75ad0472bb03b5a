//! HTTP boundary: a single route serving the fixed meme query.
//!
//! Errors are mapped to status codes by the [`crate::error::Error`]
//! response conversion instead of being serialized into a 200 body.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use tokio::net::TcpListener;
use tokio::signal;
use tracing::info;

use crate::config::ServerConfig;
use crate::db::params::SqlParam;
use crate::db::rows::JsonRow;
use crate::db::session::Session;
use crate::error::Error;

const MEME_QUERY: &str = "select * from meme where name = $1 limit 2";
const MEME_NAME: &str = "sarcasm";

/// Build the gateway router.
pub fn router(session: Arc<Session>) -> Router {
    Router::new().route("/", get(run_query)).with_state(session)
}

async fn run_query(
    State(session): State<Arc<Session>>,
) -> Result<Json<Vec<JsonRow>>, Error> {
    let rows = session
        .select_many(MEME_QUERY, &[SqlParam::from(MEME_NAME)])
        .await?;
    Ok(Json(rows))
}

/// Serve the gateway until SIGINT or SIGTERM, then close the session.
pub async fn serve(config: &ServerConfig, session: Arc<Session>) -> std::io::Result<()> {
    let bind_addr = config.bind_addr();
    let listener = TcpListener::bind(&bind_addr).await?;
    info!(addr = %bind_addr, "HTTP gateway listening");

    let app = router(session.clone());
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("HTTP server stopped, closing database session");
    session.close().await;
    Ok(())
}

/// Wait for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = signal::ctrl_c();

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
