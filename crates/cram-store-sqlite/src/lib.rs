//! SQLite backend for the Cram study store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. [`SqliteStore`] implements both
//! [`cram_core::store::StudyStore`] and [`cram_core::review::ReviewSource`].

mod encode;
mod review;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;
