//! Memebase gateway library.
//!
//! An HTTP gateway over a PostgreSQL-backed meme store, plus helpers
//! for the hosted storage buckets.

pub mod config;
pub mod db;
pub mod error;
pub mod http;
pub mod storage;

pub use config::{DbConfig, ServerConfig};
pub use db::Session;
pub use error::Error;
