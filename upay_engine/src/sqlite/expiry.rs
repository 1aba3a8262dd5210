use std::sync::Arc;

use chrono::Duration;
use log::*;

use crate::{
    db_types::{now_millis, TradeId},
    order_objects::ExpiryOutcome,
    scheduler::{ExpiryFuture, ExpiryHandler},
    upe_api::expiry_api::OrderExpiryApi,
    SqliteDatabase,
};

/// How long to wait before retrying an expiry that could not be written.
pub const EXPIRY_RETRY_DELAY: Duration = Duration::seconds(30);

/// Builds the fire action for a [`crate::scheduler::TokioExpiryScheduler`] backed by SQLite.
///
/// An order whose window has moved out since the action was scheduled is checked again when the new window closes.
/// Store failures are logged and retried after [`EXPIRY_RETRY_DELAY`].
pub fn sqlite_expiry_handler(api: OrderExpiryApi<SqliteDatabase>) -> ExpiryHandler {
    Arc::new(move |trade_id: TradeId| -> ExpiryFuture {
        let api = api.clone();
        Box::pin(async move {
            match api.expire_order(&trade_id).await {
                Ok(ExpiryOutcome::Expired(order)) => {
                    trace!("🕰️ Expiry for {} ({}) complete", order.trade_id, order.order_id);
                    None
                },
                Ok(ExpiryOutcome::NotDue(expiration_time)) => {
                    trace!("🕰️ Order {trade_id} is live until {expiration_time}");
                    Some((expiration_time - now_millis()).max(Duration::zero()))
                },
                Ok(outcome) => {
                    trace!("🕰️ Expiry for {trade_id} made no change: {outcome:?}");
                    None
                },
                Err(e) => {
                    let retry = EXPIRY_RETRY_DELAY.num_seconds();
                    error!("🕰️ Could not expire order {trade_id}. Retrying in {retry}s. {e}");
                    Some(EXPIRY_RETRY_DELAY)
                },
            }
        })
    })
}
