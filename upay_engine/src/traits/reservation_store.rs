use chrono::Duration;
use thiserror::Error;

use crate::db_types::ReservationKey;

/// Ephemeral, self-expiring claims on (wallet, amount) pairs.
///
/// `set_if_absent` must be atomic: two concurrent callers with the same key never both see `true`. That property alone
/// is what keeps allocations unambiguous across processes.
#[allow(async_fn_in_trait)]
pub trait ReservationStore {
    /// Claims `key` for `ttl` if nobody holds a live claim on it. Returns `true` if the claim was made.
    async fn set_if_absent(&self, key: &ReservationKey, ttl: Duration) -> Result<bool, ReservationError>;

    /// True if a live (unexpired) claim on `key` exists.
    async fn exists(&self, key: &ReservationKey) -> Result<bool, ReservationError>;

    async fn delete(&self, key: &ReservationKey) -> Result<(), ReservationError>;

    /// Sets the claim on `key` to expire `ttl` from now, creating it if it has lapsed.
    async fn refresh(&self, key: &ReservationKey, ttl: Duration) -> Result<(), ReservationError>;
}

#[derive(Debug, Clone, Error)]
pub enum ReservationError {
    #[error("Reservation store error: {0}")]
    StoreError(String),
    #[error("The reservation store did not respond in time")]
    Timeout,
}

impl From<sqlx::Error> for ReservationError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::PoolTimedOut => Self::Timeout,
            e => Self::StoreError(e.to_string()),
        }
    }
}
