use std::{fmt::Debug, sync::Arc};

use chrono::{DateTime, Duration, Utc};
use log::*;
use tokio::sync::Mutex;
use upg_common::MIN_PAYMENT_AMOUNT;

use crate::{
    allocator::{Allocation, WalletAllocator},
    db_types::{now_millis, NewOrder, Order, OrderStatusType, OrderUpdate, TradeId},
    events::EventProducers,
    traits::{ExpirationScheduler, OrderManagement, OrderStoreError, ReservationStore, WalletManagement},
    upe_api::{
        errors::AdmissionError,
        order_objects::{AdmissionOutcome, AdmissionRequest},
    },
};

/// The default order validity window.
pub const DEFAULT_ORDER_VALIDITY: Duration = Duration::minutes(10);
/// How often a freshly generated trade id may collide with an existing one before admission gives up.
const TRADE_ID_ATTEMPTS: usize = 5;

/// `OrderAdmissionApi` turns merchant order requests into payable orders.
///
/// Admissions are serialized through a single lock per instance. Cloning the API shares that lock. Allocation
/// correctness does not depend on it, since reservations are claimed with an atomic set-if-absent, but it keeps
/// duplicate detection for one merchant order id race-free within an instance.
pub struct OrderAdmissionApi<B, R, S> {
    db: B,
    allocator: WalletAllocator<R>,
    scheduler: S,
    producers: EventProducers,
    validity: Duration,
    lock: Arc<Mutex<()>>,
}

impl<B, R, S> Debug for OrderAdmissionApi<B, R, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderAdmissionApi (validity: {}s)", self.validity.num_seconds())
    }
}

impl<B: Clone, R: Clone, S: Clone> Clone for OrderAdmissionApi<B, R, S> {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
            allocator: WalletAllocator::new(self.allocator.reservations().clone()),
            scheduler: self.scheduler.clone(),
            producers: self.producers.clone(),
            validity: self.validity,
            lock: Arc::clone(&self.lock),
        }
    }
}

impl<B, R, S> OrderAdmissionApi<B, R, S> {
    pub fn new(db: B, reservations: R, scheduler: S, producers: EventProducers) -> Self {
        Self {
            db,
            allocator: WalletAllocator::new(reservations),
            scheduler,
            producers,
            validity: DEFAULT_ORDER_VALIDITY,
            lock: Arc::new(Mutex::new(())),
        }
    }

    /// Sets the validity window given to new and extended orders.
    pub fn with_validity(mut self, validity: Duration) -> Self {
        self.validity = validity;
        self
    }

    pub fn validity(&self) -> Duration {
        self.validity
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn reservations(&self) -> &R {
        self.allocator.reservations()
    }
}

impl<B, R, S> OrderAdmissionApi<B, R, S>
where
    B: OrderManagement + WalletManagement,
    R: ReservationStore,
    S: ExpirationScheduler,
{
    /// Admits a merchant order.
    ///
    /// If the merchant order id already has a live (`WaitPay`) order, no new allocation is made: the existing order's
    /// window is extended, its reservation refreshed and its expiry rescheduled, and it is returned as
    /// [`AdmissionOutcome::Existing`]. A `WaitPay` order whose window has already closed is expired on the spot and
    /// replaced. An order id whose latest order was paid is rejected. One whose latest order expired gets a brand-new
    /// order.
    pub async fn admit(&self, request: AdmissionRequest) -> Result<AdmissionOutcome, AdmissionError> {
        if request.amount < MIN_PAYMENT_AMOUNT {
            return Err(AdmissionError::Configuration(format!(
                "The order amount {} is below the minimum of {MIN_PAYMENT_AMOUNT}",
                request.amount
            )));
        }
        if self.validity <= Duration::zero() {
            return Err(AdmissionError::Configuration("The order validity window must be positive".into()));
        }
        let _guard = self.lock.lock().await;
        trace!("📥️ Admitting order {} for {} {}", request.order_id, request.amount, request.currency);
        if let Some(existing) = self.db.fetch_order_by_order_id(&request.order_id).await? {
            match existing.status {
                OrderStatusType::WaitPay => {
                    let now = now_millis();
                    let status = if existing.is_due(now) {
                        self.expire_due_order(&existing).await?
                    } else {
                        match self.extend_order(&existing, now).await? {
                            Some(order) => return Ok(AdmissionOutcome::Existing(order)),
                            None => self.current_status(&existing.trade_id).await?,
                        }
                    };
                    if status == OrderStatusType::PaySuccess {
                        return Err(AdmissionError::OrderAlreadySettled(request.order_id));
                    }
                },
                OrderStatusType::PaySuccess => return Err(AdmissionError::OrderAlreadySettled(request.order_id)),
                OrderStatusType::Expired => {
                    debug!("📥️ Order {} expired previously. A new order will be created.", request.order_id);
                },
            }
        }
        let order = self.create_order(request).await?;
        Ok(AdmissionOutcome::Created(order))
    }

    /// Pushes a live order's window out by a full validity period. Returns `None` if the order left `WaitPay` before
    /// it could be extended.
    ///
    /// The reservation is refreshed before the order is touched, so a failure here leaves the order and its pending
    /// expiry as they were.
    async fn extend_order(&self, order: &Order, now: DateTime<Utc>) -> Result<Option<Order>, AdmissionError> {
        self.allocator.reservations().refresh(&order.reservation_key(), self.validity).await?;
        let update = OrderUpdate::extend_to(now + self.validity);
        let Some(order) = self.db.update_order_if_status(&order.trade_id, OrderStatusType::WaitPay, update).await?
        else {
            debug!("📥️ Order {} left WaitPay while being extended", order.trade_id);
            return Ok(None);
        };
        // Replaces the pending expiry. If this fails, the old one fires early and re-arms for the new window.
        self.scheduler.schedule_expiry(&order.trade_id, order.remaining_validity(now)).await?;
        info!(
            "📥️ Order {} is already waiting for payment as {}. Its window now ends at {}",
            order.order_id, order.trade_id, order.expiration_time
        );
        Ok(Some(order))
    }

    /// Expires a `WaitPay` order whose window closed before its scheduled expiry ran. Returns the order's status
    /// afterwards, which is `PaySuccess` if a settlement got there first.
    async fn expire_due_order(&self, order: &Order) -> Result<OrderStatusType, AdmissionError> {
        let updated =
            self.db.update_order_if_status(&order.trade_id, OrderStatusType::WaitPay, OrderUpdate::expire()).await?;
        let Some(expired) = updated else {
            return self.current_status(&order.trade_id).await;
        };
        info!("📥️ Order {} ({}) was past its window and has been expired", expired.trade_id, expired.order_id);
        if let Err(e) = self.scheduler.cancel_expiry(&expired.trade_id).await {
            warn!("📥️ Could not cancel the pending expiry for {}. {e}", expired.trade_id);
        }
        self.producers.publish_order_expired(&expired).await;
        Ok(OrderStatusType::Expired)
    }

    async fn current_status(&self, trade_id: &TradeId) -> Result<OrderStatusType, AdmissionError> {
        let order = self.db.fetch_order_by_trade_id(trade_id).await?;
        Ok(order.map(|o| o.status).unwrap_or(OrderStatusType::Expired))
    }

    async fn create_order(&self, request: AdmissionRequest) -> Result<Order, AdmissionError> {
        let wallets = self.db.fetch_enabled_wallets(&request.currency).await?;
        let allocation = self.allocator.allocate(&request.currency, request.amount, &wallets, self.validity).await?;
        let order = match self.insert_allocated_order(&request, &allocation).await {
            Ok(order) => order,
            Err(e) => {
                if let Err(release_err) = self.allocator.release(&allocation.key).await {
                    warn!("📥️ Could not release {} after a failed insert. {release_err}", allocation.key);
                }
                return Err(e.into());
            },
        };
        self.scheduler.schedule_expiry(&order.trade_id, self.validity).await?;
        info!(
            "📥️ Order {} admitted as {}: pay {} {} to {}",
            order.order_id, order.trade_id, order.actual_amount, order.currency, order.token
        );
        self.producers.publish_order_created(&order).await;
        Ok(order)
    }

    async fn insert_allocated_order(
        &self,
        request: &AdmissionRequest,
        allocation: &Allocation,
    ) -> Result<Order, OrderStoreError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let start_time = now_millis();
            let new_order = NewOrder {
                trade_id: TradeId::generate(start_time),
                order_id: request.order_id.clone(),
                currency: request.currency.clone(),
                token: allocation.wallet.token.clone(),
                amount: request.amount,
                actual_amount: allocation.actual_amount,
                start_time,
                expiration_time: start_time + self.validity,
                notify_url: request.notify_url.clone(),
                redirect_url: request.redirect_url.clone(),
            };
            match self.db.insert_order(new_order).await {
                Err(OrderStoreError::DuplicateTradeId(id)) if attempt < TRADE_ID_ATTEMPTS => {
                    debug!("📥️ Trade id {id} is taken. Generating another.");
                },
                result => return result,
            }
        }
    }
}
