use std::{
    collections::HashMap,
    future::Future,
    pin::Pin,
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc,
    },
};

use chrono::Duration;
use log::*;
use tokio::{sync::Mutex, task::AbortHandle};

use crate::{
    db_types::TradeId,
    traits::{ExpirationScheduler, SchedulerError},
};

pub type ExpiryFuture = Pin<Box<dyn Future<Output = Option<Duration>> + Send>>;

/// The action run when an order's validity window closes.
///
/// Returning `Some(delay)` asks for the action to run again for the same trade id after `delay`. The re-armed action
/// is dropped if something else was scheduled for that trade id while the handler ran.
pub type ExpiryHandler = Arc<dyn Fn(TradeId) -> ExpiryFuture + Send + Sync>;

struct ScheduledExpiry {
    generation: u64,
    task: AbortHandle,
}

struct Registry {
    tasks: Mutex<HashMap<TradeId, ScheduledExpiry>>,
    generation: AtomicU64,
    stopped: AtomicBool,
    on_expiry: ExpiryHandler,
}

/// Runs one sleeping tokio task per scheduled trade id.
///
/// Every scheduled task carries a generation number. A task only removes its registry entry (and only fires) if the
/// entry still carries its own generation, so a task that has been replaced can never disturb its successor.
#[derive(Clone)]
pub struct TokioExpiryScheduler {
    registry: Arc<Registry>,
}

impl std::fmt::Debug for TokioExpiryScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TokioExpiryScheduler")
    }
}

impl TokioExpiryScheduler {
    pub fn new(on_expiry: ExpiryHandler) -> Self {
        let registry = Registry {
            tasks: Mutex::new(HashMap::new()),
            generation: AtomicU64::new(0),
            stopped: AtomicBool::new(false),
            on_expiry,
        };
        Self { registry: Arc::new(registry) }
    }

    pub async fn is_scheduled(&self, trade_id: &TradeId) -> bool {
        self.registry.tasks.lock().await.contains_key(trade_id)
    }

    pub async fn scheduled_count(&self) -> usize {
        self.registry.tasks.lock().await.len()
    }

    /// Aborts every pending expiry. Handlers that are running when this is called are not re-armed.
    pub async fn shutdown(&self) {
        self.registry.stopped.store(true, Ordering::SeqCst);
        let mut tasks = self.registry.tasks.lock().await;
        for (_, scheduled) in tasks.drain() {
            scheduled.task.abort();
        }
        debug!("🕰️ Expiry scheduler has shut down");
    }
}

impl Registry {
    /// Spawns and registers a fresh action for `trade_id`. The caller holds the registry lock, so the new task cannot
    /// look itself up before it is registered.
    fn arm(self: &Arc<Self>, tasks: &mut HashMap<TradeId, ScheduledExpiry>, trade_id: TradeId, delay: Duration) {
        let delay = delay.to_std().unwrap_or_default();
        let generation = self.generation.fetch_add(1, Ordering::SeqCst);
        let registry = Arc::clone(self);
        let id = trade_id.clone();
        let task = tokio::spawn(async move { registry.fire(id, generation, delay).await });
        tasks.insert(trade_id, ScheduledExpiry { generation, task: task.abort_handle() });
    }

    async fn fire(self: Arc<Self>, id: TradeId, generation: u64, delay: std::time::Duration) {
        tokio::time::sleep(delay).await;
        {
            let mut tasks = self.tasks.lock().await;
            match tasks.get(&id) {
                Some(current) if current.generation == generation => {
                    tasks.remove(&id);
                },
                _ => return,
            }
        }
        trace!("🕰️ Expiry for {id} is due");
        let Some(retry) = (self.on_expiry)(id.clone()).await else {
            return;
        };
        if self.stopped.load(Ordering::SeqCst) {
            return;
        }
        let mut tasks = self.tasks.lock().await;
        if tasks.contains_key(&id) {
            trace!("🕰️ Expiry for {id} was rescheduled while it ran");
            return;
        }
        debug!("🕰️ Expiry for {id} is not due yet. Checking again in {}ms", retry.num_milliseconds());
        self.arm(&mut tasks, id, retry);
    }
}

impl ExpirationScheduler for TokioExpiryScheduler {
    async fn schedule_expiry(&self, trade_id: &TradeId, delay: Duration) -> Result<(), SchedulerError> {
        let mut tasks = self.registry.tasks.lock().await;
        if let Some(prior) = tasks.remove(trade_id) {
            prior.task.abort();
            debug!("🕰️ Replaced pending expiry for {trade_id}");
        }
        self.registry.arm(&mut tasks, trade_id.clone(), delay);
        trace!("🕰️ Expiry for {trade_id} scheduled in {}ms", delay.num_milliseconds().max(0));
        Ok(())
    }

    async fn cancel_expiry(&self, trade_id: &TradeId) -> Result<bool, SchedulerError> {
        let mut tasks = self.registry.tasks.lock().await;
        match tasks.remove(trade_id) {
            Some(scheduled) => {
                scheduled.task.abort();
                trace!("🕰️ Expiry for {trade_id} cancelled");
                Ok(true)
            },
            None => Ok(false),
        }
    }
}
