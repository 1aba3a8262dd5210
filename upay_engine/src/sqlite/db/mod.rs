//! # SQLite Database methods
//!
//! This module contains "low-level" SQLite database interactions.
//!
//! All these interactions are simple functions (rather than stateful structs) that accept a `&mut SqliteConnection`
//! argument. Callers can obtain a connection from a pool, or open a transaction, and call through to the functions
//! without any other changes.
use std::{env, time::Duration};

use log::info;
use sqlx::{sqlite::SqlitePoolOptions, Error as SqlxError, SqlitePool};

pub mod orders;
pub mod reservations;
pub mod wallets;

const SQLITE_DB_URL: &str = "sqlite://data/upay_store.db";

pub fn db_url() -> String {
    let result = env::var("UPAY_DATABASE_URL").unwrap_or_else(|_| {
        info!("🗃️ UPAY_DATABASE_URL is not set. Using the default.");
        SQLITE_DB_URL.to_string()
    });
    info!("🗃️ Using database URL: {result}");
    result
}

pub async fn new_pool(url: &str, max_connections: u32, acquire_timeout: Duration) -> Result<SqlitePool, SqlxError> {
    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(acquire_timeout)
        .connect(url)
        .await?;
    Ok(pool)
}
