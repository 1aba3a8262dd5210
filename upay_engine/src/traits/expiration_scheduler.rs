use chrono::Duration;
use thiserror::Error;

use crate::db_types::TradeId;

/// A deferred-task runner for order expiry.
///
/// At most one action is live per trade id. Scheduling a trade id that already has a live action replaces it.
#[allow(async_fn_in_trait)]
pub trait ExpirationScheduler {
    /// Fires the expiry action for `trade_id` after `delay`. A zero or negative delay fires immediately.
    async fn schedule_expiry(&self, trade_id: &TradeId, delay: Duration) -> Result<(), SchedulerError>;

    /// Cancels the live action for `trade_id`. Returns `false` if nothing was scheduled.
    async fn cancel_expiry(&self, trade_id: &TradeId) -> Result<bool, SchedulerError>;
}

#[derive(Debug, Clone, Error)]
pub enum SchedulerError {
    #[error("The expiry scheduler is not running")]
    NotRunning,
    #[error("Could not schedule expiry for {0}. {1}")]
    ScheduleFailed(TradeId, String),
}
