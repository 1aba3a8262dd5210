//! # Settlement verification
//!
//! One verification protocol serves every chain. For an order that is waiting for payment:
//!
//! 1. Ask the chain's explorer for the most recent transfer into the order's wallet.
//! 2. No transfer means no settlement.
//! 3. Scale the transfer's raw amount by the chain's decimal exponent, rounding to two places.
//! 4. Check, in order, that the transfer has a hash, carries the expected token symbol, happened strictly inside the
//!    order's validity window, is for exactly the order's on-chain amount and was sent to the order's wallet (compared
//!    the way the chain compares addresses).
//! 5. If everything matches, move the order from `WaitPay` to `PaySuccess` in a single conditional write.
//!
//! Explorer failures never touch the order. Verification can be repeated, and can run concurrently for the same
//! order from several triggers: only one conditional write can succeed.
use std::fmt::Debug;

use futures_util::future::join_all;
use log::*;
use upg_common::Amount;

use crate::{
    chains::{ChainConfig, ChainRegistry},
    db_types::{Order, OrderStatusType, OrderUpdate, TradeId},
    events::EventProducers,
    helpers::normalize_raw_amount,
    traits::{ExplorerError, OrderManagement, Transfer, TransferQuery, TransferSource},
    upe_api::{
        errors::SettlementError,
        order_objects::{MismatchReason, SettlementOutcome},
    },
};

/// Checks a transfer against an order. `amount` is the transfer's normalized amount.
///
/// Returns the first check that failed, or `Ok(())` if the transfer pays for the order.
pub fn match_transfer(
    chain: &ChainConfig,
    order: &Order,
    transfer: &Transfer,
    amount: Amount,
) -> Result<(), MismatchReason> {
    if transfer.hash.trim().is_empty() {
        return Err(MismatchReason::MissingHash);
    }
    if transfer.symbol != chain.symbol {
        return Err(MismatchReason::Symbol { expected: chain.symbol.clone(), found: transfer.symbol.clone() });
    }
    let start = order.start_time.timestamp_millis();
    let end = order.expiration_time.timestamp_millis();
    if transfer.timestamp <= start || transfer.timestamp >= end {
        return Err(MismatchReason::OutsideWindow { timestamp: transfer.timestamp, start, end });
    }
    if amount != order.actual_amount {
        return Err(MismatchReason::Amount { expected: order.actual_amount, found: amount });
    }
    if !chain.address_match.matches(&transfer.recipient, &order.token) {
        return Err(MismatchReason::Recipient { expected: order.token.clone(), found: transfer.recipient.clone() });
    }
    Ok(())
}

pub struct SettlementVerifier<B, T> {
    db: B,
    source: T,
    chains: ChainRegistry,
    producers: EventProducers,
}

impl<B, T> Debug for SettlementVerifier<B, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SettlementVerifier ({})", self.chains.currencies().join(", "))
    }
}

impl<B: Clone, T: Clone> Clone for SettlementVerifier<B, T> {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
            source: self.source.clone(),
            chains: self.chains.clone(),
            producers: self.producers.clone(),
        }
    }
}

impl<B, T> SettlementVerifier<B, T> {
    pub fn new(db: B, source: T, chains: ChainRegistry, producers: EventProducers) -> Self {
        Self { db, source, chains, producers }
    }

    pub fn chains(&self) -> &ChainRegistry {
        &self.chains
    }

    pub fn source(&self) -> &T {
        &self.source
    }
}

impl<B, T> SettlementVerifier<B, T>
where
    B: OrderManagement,
    T: TransferSource,
{
    /// Runs the verification protocol for one order.
    ///
    /// `Ok` results describe what was found; only [`SettlementOutcome::Settled`] means the order was paid by this
    /// call. Explorer and store failures come back as errors and leave the order untouched.
    pub async fn verify(&self, order: &Order) -> Result<SettlementOutcome, SettlementError> {
        if order.status.is_terminal() {
            return Ok(SettlementOutcome::AlreadyFinal(order.status));
        }
        let chain = self
            .chains
            .get(&order.currency)
            .ok_or_else(|| SettlementError::UnsupportedCurrency(order.currency.clone()))?;
        let query = TransferQuery::for_order(order);
        let Some(transfer) = self.source.latest_transfer_to(chain, &query).await? else {
            trace!("🔍️ No transfers into {} for order {}", order.token, order.trade_id);
            return Ok(SettlementOutcome::NoTransfer);
        };
        let amount = normalize_raw_amount(&transfer.raw_amount, chain.decimals).map_err(|e| {
            ExplorerError::Malformed(format!("Transfer {} has an unusable amount. {e}", transfer.hash))
        })?;
        if let Err(reason) = match_transfer(chain, order, &transfer, amount) {
            trace!("🔍️ Latest transfer {} is not for order {}: {reason}", transfer.hash, order.trade_id);
            return Ok(SettlementOutcome::Mismatch(reason));
        }
        let update = OrderUpdate::settle(transfer.hash.clone());
        match self.db.update_order_if_status(&order.trade_id, OrderStatusType::WaitPay, update).await? {
            Some(paid) => {
                info!(
                    "🔍️ Order {} ({}) paid: {} {} in transaction {}",
                    paid.trade_id, paid.order_id, paid.actual_amount, paid.currency, transfer.hash
                );
                self.producers.publish_order_paid(&paid).await;
                Ok(SettlementOutcome::Settled(paid))
            },
            None => {
                let status = self
                    .db
                    .fetch_order_by_trade_id(&order.trade_id)
                    .await?
                    .map(|o| o.status)
                    .unwrap_or(OrderStatusType::Expired);
                info!(
                    "🔍️ Transfer {} matches order {}, but the order is already {status}. Nothing was changed.",
                    transfer.hash, order.trade_id
                );
                Ok(SettlementOutcome::MatchedButFinal { block_transaction_id: transfer.hash, status })
            },
        }
    }

    /// Loads the order by trade id and verifies it.
    pub async fn verify_trade(&self, trade_id: &TradeId) -> Result<SettlementOutcome, SettlementError> {
        let order = self
            .db
            .fetch_order_by_trade_id(trade_id)
            .await?
            .ok_or_else(|| SettlementError::OrderNotFound(trade_id.clone()))?;
        self.verify(&order).await
    }

    /// Verifies every order that is waiting for payment, concurrently. Returns the orders settled by this sweep.
    ///
    /// A failure on one order is logged and does not affect the others.
    pub async fn verify_pending(&self) -> Result<Vec<Order>, SettlementError> {
        let pending = self.db.fetch_orders_by_status(OrderStatusType::WaitPay).await?;
        if pending.is_empty() {
            return Ok(Vec::new());
        }
        trace!("🔍️ Verifying {} pending orders", pending.len());
        let results = join_all(pending.iter().map(|order| self.verify(order))).await;
        let mut settled = Vec::new();
        for (order, result) in pending.iter().zip(results) {
            match result {
                Ok(SettlementOutcome::Settled(paid)) => settled.push(paid),
                Ok(outcome) => trace!("🔍️ Order {}: {outcome}", order.trade_id),
                Err(SettlementError::Explorer(e)) if e.is_transient() => {
                    warn!("🔍️ Could not verify order {} this time. {e}", order.trade_id)
                },
                Err(e) => error!("🔍️ Verification of order {} failed. {e}", order.trade_id),
            }
        }
        Ok(settled)
    }
}
