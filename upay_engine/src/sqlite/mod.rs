//! SQLite backend for the payment engine.
mod expiry;
mod sqlite_impl;

pub mod db;
pub use expiry::{sqlite_expiry_handler, EXPIRY_RETRY_DELAY};
pub use sqlite_impl::{SqliteDatabase, DEFAULT_ACQUIRE_TIMEOUT};
