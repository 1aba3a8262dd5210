//! Reservations are rows keyed by `{token}_{amount}` with an expiry time in unix milliseconds. A row whose
//! `expires_at` has passed is treated as absent, and is overwritten by the next claim on the same key.
use chrono::Duration;
use sqlx::SqliteConnection;

use crate::db_types::{now_millis, ReservationKey};

/// Claims `key` for `ttl` in one statement. The conflict clause only replaces a lapsed claim, so the insert affects
/// a row if and only if nobody else holds the key.
pub async fn set_if_absent(
    key: &ReservationKey,
    ttl: Duration,
    conn: &mut SqliteConnection,
) -> Result<bool, sqlx::Error> {
    let now = now_millis().timestamp_millis();
    let expires_at = now + ttl.num_milliseconds();
    let result = sqlx::query(
        r#"
            INSERT INTO reservations (key, expires_at) VALUES ($1, $2)
            ON CONFLICT (key) DO UPDATE SET expires_at = excluded.expires_at
            WHERE reservations.expires_at <= $3
        "#,
    )
    .bind(key.to_string())
    .bind(expires_at)
    .bind(now)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn exists(key: &ReservationKey, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let now = now_millis().timestamp_millis();
    let row: Option<(i64,)> = sqlx::query_as("SELECT expires_at FROM reservations WHERE key = $1 AND expires_at > $2")
        .bind(key.to_string())
        .bind(now)
        .fetch_optional(conn)
        .await?;
    Ok(row.is_some())
}

pub async fn delete(key: &ReservationKey, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM reservations WHERE key = $1").bind(key.to_string()).execute(conn).await?;
    Ok(())
}

pub async fn refresh(key: &ReservationKey, ttl: Duration, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    let expires_at = now_millis().timestamp_millis() + ttl.num_milliseconds();
    sqlx::query(
        "INSERT INTO reservations (key, expires_at) VALUES ($1, $2) ON CONFLICT (key) DO UPDATE SET expires_at = \
         excluded.expires_at",
    )
    .bind(key.to_string())
    .bind(expires_at)
    .execute(conn)
    .await?;
    Ok(())
}

/// Removes lapsed claims. Returns the number of rows removed.
pub async fn purge_expired(conn: &mut SqliteConnection) -> Result<u64, sqlx::Error> {
    let now = now_millis().timestamp_millis();
    let result = sqlx::query("DELETE FROM reservations WHERE expires_at <= $1").bind(now).execute(conn).await?;
    Ok(result.rows_affected())
}
