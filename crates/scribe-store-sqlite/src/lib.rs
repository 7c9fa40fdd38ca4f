//! SQLite backend for the Scribe report store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Reports and templates are stored as
//! whole JSON documents, with the attributes needed for listing and expiry
//! mirrored into indexed columns.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use schema::Tables;
pub use store::SqliteStore;
