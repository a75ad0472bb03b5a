//! Configuration for the memebase gateway.
//!
//! Database settings come from the environment only; HTTP server options
//! are parsed from the command line with environment fallbacks.

use clap::Parser;
use sqlx::postgres::PgConnectOptions;

use crate::error::{Error, Result};

pub const DEFAULT_HTTP_HOST: &str = "127.0.0.1";
pub const DEFAULT_HTTP_PORT: u16 = 8080;

/// Connection settings for the PostgreSQL database.
#[derive(Clone)]
pub struct DbConfig {
    pub user: String,
    pub password: String,
    pub host: String,
    pub port: u16,
    pub dbname: String,
}

impl DbConfig {
    /// Read the five required settings from the environment.
    ///
    /// Fails with a configuration error listing every missing key; no
    /// partial substitution happens. A `port` that does not parse as a
    /// TCP port is reported the same way.
    pub fn from_env() -> Result<Self> {
        let mut missing = Vec::new();
        let mut require = |key: &'static str| match read_env(key) {
            Some(value) => value,
            None => {
                missing.push(key.to_string());
                String::new()
            }
        };

        let user = require("user");
        let password = require("password");
        let host = require("host");
        let port = require("port");
        let dbname = require("dbname");
        drop(require);

        if !missing.is_empty() {
            return Err(Error::configuration(missing));
        }

        let port = port
            .parse::<u16>()
            .map_err(|_| Error::configuration(vec!["port".to_string()]))?;

        Ok(Self {
            user,
            password,
            host,
            port,
            dbname,
        })
    }

    /// Build the driver-level connect options for these settings.
    pub fn connect_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .password(&self.password)
            .database(&self.dbname)
    }
}

impl std::fmt::Debug for DbConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Redact the password so it never reaches logs.
        f.debug_struct("DbConfig")
            .field("user", &self.user)
            .field("password", &"***")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("dbname", &self.dbname)
            .finish()
    }
}

fn read_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.is_empty())
}

/// HTTP server options.
#[derive(Debug, Parser)]
#[command(name = "memebase", about = "HTTP gateway for the memebase database")]
pub struct ServerConfig {
    /// Host to bind the HTTP server to
    #[arg(long, env = "MEMEBASE_HTTP_HOST", default_value = DEFAULT_HTTP_HOST)]
    pub http_host: String,

    /// Port to bind the HTTP server to
    #[arg(long, env = "MEMEBASE_HTTP_PORT", default_value_t = DEFAULT_HTTP_PORT)]
    pub http_port: u16,

    /// Log level filter used when RUST_LOG is not set
    #[arg(long, env = "MEMEBASE_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Emit logs as JSON
    #[arg(long, default_value_t = false)]
    pub json_logs: bool,
}

impl ServerConfig {
    /// Get the address the HTTP server binds to.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.http_host, self.http_port)
    }
}
