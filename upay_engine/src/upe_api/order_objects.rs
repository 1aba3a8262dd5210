use std::fmt::Display;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use upg_common::Amount;

use crate::db_types::{Order, OrderId, OrderStatusType, TradeId};

/// A merchant's request for a new order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdmissionRequest {
    pub order_id: OrderId,
    pub currency: String,
    /// The quote (fiat) amount
    pub amount: Amount,
    #[serde(default)]
    pub notify_url: String,
    #[serde(default)]
    pub redirect_url: String,
}

impl AdmissionRequest {
    pub fn new<S: Into<String>>(order_id: S, currency: S, amount: Amount) -> Self {
        Self {
            order_id: OrderId(order_id.into()),
            currency: currency.into(),
            amount,
            notify_url: String::default(),
            redirect_url: String::default(),
        }
    }

    pub fn with_notify_url<S: Into<String>>(mut self, url: S) -> Self {
        self.notify_url = url.into();
        self
    }

    pub fn with_redirect_url<S: Into<String>>(mut self, url: S) -> Self {
        self.redirect_url = url.into();
        self
    }
}

/// The result of a successful admission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdmissionOutcome {
    /// A fresh order was allocated and stored.
    Created(Order),
    /// The merchant order id already had a live order. Its window was extended and it is returned unchanged
    /// otherwise.
    Existing(Order),
}

impl AdmissionOutcome {
    pub fn order(&self) -> &Order {
        match self {
            Self::Created(o) | Self::Existing(o) => o,
        }
    }

    pub fn into_order(self) -> Order {
        match self {
            Self::Created(o) | Self::Existing(o) => o,
        }
    }

    pub fn is_new(&self) -> bool {
        matches!(self, Self::Created(_))
    }
}

/// What the payer needs to know: where to send funds, how much, and until when.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderHandle {
    pub trade_id: TradeId,
    pub order_id: OrderId,
    pub currency: String,
    pub amount: Amount,
    pub actual_amount: Amount,
    pub token: String,
    pub status: OrderStatusType,
    pub expiration_time: DateTime<Utc>,
}

impl From<&Order> for OrderHandle {
    fn from(order: &Order) -> Self {
        Self {
            trade_id: order.trade_id.clone(),
            order_id: order.order_id.clone(),
            currency: order.currency.clone(),
            amount: order.amount,
            actual_amount: order.actual_amount,
            token: order.token.clone(),
            status: order.status,
            expiration_time: order.expiration_time,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpiryOutcome {
    /// The order was `WaitPay` and is now `Expired`.
    Expired(Order),
    /// The order had already left `WaitPay`. Nothing was changed.
    AlreadyFinal(OrderStatusType),
    /// The order's window was extended after this expiry was scheduled. Nothing was changed.
    NotDue(DateTime<Utc>),
    NotFound,
}

impl ExpiryOutcome {
    pub fn expired_now(&self) -> bool {
        matches!(self, Self::Expired(_))
    }
}

/// The first check that a candidate transfer failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MismatchReason {
    MissingHash,
    Symbol { expected: String, found: String },
    /// The transfer timestamp is not strictly inside the order's validity window
    OutsideWindow { timestamp: i64, start: i64, end: i64 },
    Amount { expected: Amount, found: Amount },
    Recipient { expected: String, found: String },
}

impl Display for MismatchReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingHash => write!(f, "the transfer has no transaction hash"),
            Self::Symbol { expected, found } => write!(f, "token symbol is {found}, expected {expected}"),
            Self::OutsideWindow { timestamp, start, end } => {
                write!(f, "transfer time {timestamp} is outside the window ({start}, {end})")
            },
            Self::Amount { expected, found } => write!(f, "amount is {found}, expected {expected}"),
            Self::Recipient { expected, found } => write!(f, "recipient is {found}, expected {expected}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettlementOutcome {
    /// The explorer has no transfer into the order's wallet.
    NoTransfer,
    /// The latest transfer is not this order's payment.
    Mismatch(MismatchReason),
    /// The transfer matched and the order is now `PaySuccess`.
    Settled(Order),
    /// The transfer matched, but the order had already left `WaitPay`, so nothing was written.
    MatchedButFinal { block_transaction_id: String, status: OrderStatusType },
    /// The order was not `WaitPay` to begin with. The explorer was not consulted.
    AlreadyFinal(OrderStatusType),
}

impl SettlementOutcome {
    /// True only when this call moved the order to `PaySuccess`.
    pub fn settled_now(&self) -> bool {
        matches!(self, Self::Settled(_))
    }
}

impl Display for SettlementOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoTransfer => write!(f, "no transfer found"),
            Self::Mismatch(reason) => write!(f, "latest transfer does not match: {reason}"),
            Self::Settled(order) => write!(f, "settled by {}", order.block_transaction_id.as_deref().unwrap_or("?")),
            Self::MatchedButFinal { block_transaction_id, status } => {
                write!(f, "{block_transaction_id} matched, but the order is already {status}")
            },
            Self::AlreadyFinal(status) => write!(f, "order is already {status}"),
        }
    }
}
