//! Background jobs: the settlement poller, the overdue-expiry sweeper, and the expiry recovery that runs once at
//! startup.
use std::time::Duration;

use chrono::Utc;
use explorer_tools::ExplorerApi;
use log::*;
use tokio::{task::JoinHandle, time::MissedTickBehavior};
use upay_engine::{
    db_types::Order,
    traits::{ExpirationScheduler, OrderManagement},
    OrderExpiryApi,
    SettlementVerifier,
    SqliteDatabase,
};

use crate::errors::ServerError;

/// How often the expiry sweeper looks for waiting orders whose window closed without their expiry running.
pub const EXPIRY_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Starts the settlement worker. Do not await the returned JoinHandle, as it will run indefinitely.
///
/// Every tick verifies all orders that are waiting for payment, then clears lapsed reservation rows.
pub fn start_settlement_worker(
    verifier: SettlementVerifier<SqliteDatabase, ExplorerApi>,
    db: SqliteDatabase,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(interval);
        // A sweep that overruns the interval should not be followed by a burst of catch-up sweeps
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!("🔍️ Settlement worker started. Sweeping every {}s", interval.as_secs());
        loop {
            timer.tick().await;
            trace!("🔍️ Running settlement sweep");
            match verifier.verify_pending().await {
                Ok(settled) if settled.is_empty() => trace!("🔍️ No orders settled in this sweep"),
                Ok(settled) => info!("🔍️ {} orders settled: {}", settled.len(), order_list(&settled)),
                Err(e) => error!("🔍️ Error running the settlement sweep: {e}"),
            }
            if let Err(e) = db.purge_expired_reservations().await {
                warn!("🗃️ Could not purge lapsed reservations. {e}");
            }
        }
    })
}

/// Starts the expiry sweeper. Do not await the returned JoinHandle, as it will run indefinitely.
///
/// The scheduler expires orders on time. This sweep catches any order it missed, so a waiting order whose window has
/// closed is expired within one interval.
pub fn start_expiry_sweeper(api: OrderExpiryApi<SqliteDatabase>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately, and startup recovery has just run
        timer.tick().await;
        info!("🕰️ Expiry sweeper started. Sweeping every {}s", interval.as_secs());
        loop {
            timer.tick().await;
            match expire_overdue(&api).await {
                Ok(expired) if expired.is_empty() => trace!("🕰️ No overdue orders in this sweep"),
                Ok(expired) => warn!("🕰️ {} orders were overdue: {}", expired.len(), order_list(&expired)),
                Err(e) => error!("🕰️ Error running the expiry sweep: {e}"),
            }
        }
    })
}

/// Expires every waiting order whose window has closed. Returns the orders expired by this call.
pub async fn expire_overdue<B: OrderManagement>(api: &OrderExpiryApi<B>) -> Result<Vec<Order>, ServerError> {
    let expired = api.expire_overdue_orders(Utc::now()).await?;
    Ok(expired)
}

/// Expires every order whose window closed while the server was down, and re-arms the scheduler for the rest.
///
/// Returns the number of expiries that were scheduled.
pub async fn recover_expiries<B, S>(api: &OrderExpiryApi<B>, scheduler: &S) -> Result<usize, ServerError>
where
    B: OrderManagement,
    S: ExpirationScheduler,
{
    let expired = expire_overdue(api).await?;
    if !expired.is_empty() {
        info!("🕰️ {} orders expired while the server was down: {}", expired.len(), order_list(&expired));
    }
    let pending = api.pending_expiries(Utc::now()).await?;
    for (trade_id, remaining) in &pending {
        scheduler.schedule_expiry(trade_id, *remaining).await?;
    }
    info!("🕰️ Re-armed {} order expiries", pending.len());
    Ok(pending.len())
}

fn order_list(orders: &[Order]) -> String {
    orders
        .iter()
        .map(|o| format!("[{}] order_id: {} wallet: {}", o.trade_id, o.order_id, o.token))
        .collect::<Vec<String>>()
        .join(", ")
}
