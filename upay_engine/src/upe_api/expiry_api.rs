use std::fmt::Debug;

use chrono::{DateTime, Duration, Utc};
use log::*;

use crate::{
    db_types::{now_millis, Order, OrderStatusType, OrderUpdate, TradeId},
    events::EventProducers,
    traits::OrderManagement,
    upe_api::{errors::ExpiryError, order_objects::ExpiryOutcome},
};

/// The fire action for order expiry, plus the sweeps used to recover scheduling state after a restart.
pub struct OrderExpiryApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for OrderExpiryApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderExpiryApi")
    }
}

impl<B: Clone> Clone for OrderExpiryApi<B> {
    fn clone(&self) -> Self {
        Self { db: self.db.clone(), producers: self.producers.clone() }
    }
}

impl<B> OrderExpiryApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B> OrderExpiryApi<B>
where B: OrderManagement
{
    /// Expires the order if it is still waiting for payment and its window has closed.
    ///
    /// Firing on an order that is already paid or expired is a no-op. So is firing early, which happens if the order
    /// was extended after this expiry was scheduled.
    pub async fn expire_order(&self, trade_id: &TradeId) -> Result<ExpiryOutcome, ExpiryError> {
        let Some(order) = self.db.fetch_order_by_trade_id(trade_id).await? else {
            warn!("🕰️ Expiry fired for {trade_id}, but there is no such order");
            return Ok(ExpiryOutcome::NotFound);
        };
        if order.status.is_terminal() {
            trace!("🕰️ Order {trade_id} is already {}. Expiry is a no-op.", order.status);
            return Ok(ExpiryOutcome::AlreadyFinal(order.status));
        }
        if !order.is_due(now_millis()) {
            debug!("🕰️ Order {trade_id} was extended until {}. Ignoring early expiry.", order.expiration_time);
            return Ok(ExpiryOutcome::NotDue(order.expiration_time));
        }
        self.mark_expired(order).await
    }

    async fn mark_expired(&self, order: Order) -> Result<ExpiryOutcome, ExpiryError> {
        match self.db.update_order_if_status(&order.trade_id, OrderStatusType::WaitPay, OrderUpdate::expire()).await? {
            Some(expired) => {
                info!("🕰️ Order {} ({}) has expired", expired.trade_id, expired.order_id);
                self.producers.publish_order_expired(&expired).await;
                Ok(ExpiryOutcome::Expired(expired))
            },
            None => {
                let status = self
                    .db
                    .fetch_order_by_trade_id(&order.trade_id)
                    .await?
                    .map(|o| o.status)
                    .unwrap_or(OrderStatusType::Expired);
                debug!("🕰️ Order {} became {status} before it could be expired", order.trade_id);
                Ok(ExpiryOutcome::AlreadyFinal(status))
            },
        }
    }

    /// Expires every waiting order whose window closed before `now`. Used at startup, and as a backstop for any
    /// expiry a scheduler failed to deliver.
    pub async fn expire_overdue_orders(&self, now: DateTime<Utc>) -> Result<Vec<Order>, ExpiryError> {
        let pending = self.db.fetch_orders_by_status(OrderStatusType::WaitPay).await?;
        let mut expired = Vec::new();
        for order in pending.into_iter().filter(|o| o.is_due(now)) {
            if let ExpiryOutcome::Expired(order) = self.mark_expired(order).await? {
                expired.push(order);
            }
        }
        Ok(expired)
    }

    /// The waiting orders whose windows are still open, with the time remaining on each.
    pub async fn pending_expiries(&self, now: DateTime<Utc>) -> Result<Vec<(TradeId, Duration)>, ExpiryError> {
        let pending = self.db.fetch_orders_by_status(OrderStatusType::WaitPay).await?;
        let result = pending
            .into_iter()
            .filter(|o| !o.is_due(now))
            .map(|o| {
                let remaining = o.remaining_validity(now);
                (o.trade_id, remaining)
            })
            .collect();
        Ok(result)
    }
}
