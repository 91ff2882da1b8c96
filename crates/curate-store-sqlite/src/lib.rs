//! SQLite backend for the Curate repository store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. The same store also serves as the
//! reference index and the policy-title resolver.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::{DEFAULT_AUTHORITY_BASE, SqliteStore};

#[cfg(test)]
mod tests;
