use std::{collections::HashMap, sync::Arc};

use chrono::Duration;
use log::*;
use tokio::{sync::Mutex, time::Instant};

use crate::{
    db_types::ReservationKey,
    traits::{ReservationError, ReservationStore},
};

/// A TTL map guarded by a single async mutex. Lapsed entries are treated as absent and swept on every claim.
#[derive(Clone, Default)]
pub struct MemoryReservationStore {
    entries: Arc<Mutex<HashMap<String, Instant>>>,
}

impl std::fmt::Debug for MemoryReservationStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MemoryReservationStore")
    }
}

impl MemoryReservationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops every lapsed entry and returns the number of live reservations.
    pub async fn live_count(&self) -> usize {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();
        entries.retain(|_, expires_at| *expires_at > now);
        entries.len()
    }
}

fn deadline(ttl: Duration) -> Result<Instant, ReservationError> {
    let ttl = ttl.to_std().map_err(|e| ReservationError::StoreError(format!("Invalid reservation TTL. {e}")))?;
    Ok(Instant::now() + ttl)
}

impl ReservationStore for MemoryReservationStore {
    async fn set_if_absent(&self, key: &ReservationKey, ttl: Duration) -> Result<bool, ReservationError> {
        let expires_at = deadline(ttl)?;
        let mut entries = self.entries.lock().await;
        let now = Instant::now();
        entries.retain(|_, until| *until > now);
        match entries.get(&key.to_string()) {
            Some(_) => Ok(false),
            None => {
                entries.insert(key.to_string(), expires_at);
                trace!("🔒️ Reserved {key}");
                Ok(true)
            },
        }
    }

    async fn exists(&self, key: &ReservationKey) -> Result<bool, ReservationError> {
        let entries = self.entries.lock().await;
        Ok(entries.get(&key.to_string()).is_some_and(|expires_at| *expires_at > Instant::now()))
    }

    async fn delete(&self, key: &ReservationKey) -> Result<(), ReservationError> {
        self.entries.lock().await.remove(&key.to_string());
        Ok(())
    }

    async fn refresh(&self, key: &ReservationKey, ttl: Duration) -> Result<(), ReservationError> {
        let expires_at = deadline(ttl)?;
        self.entries.lock().await.insert(key.to_string(), expires_at);
        trace!("🔒️ Refreshed {key}");
        Ok(())
    }
}
