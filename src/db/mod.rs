//! Database session, transaction scoping, and query execution.

pub mod executor;
pub mod params;
pub mod rows;
pub(crate) mod scope;
pub mod session;

pub use executor::{BulkInsert, DEFAULT_PAGE_SIZE};
pub use params::SqlParam;
pub use rows::JsonRow;
pub use session::Session;
