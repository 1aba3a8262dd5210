use thiserror::Error;

use crate::{
    allocator::AllocationError,
    db_types::{OrderId, TradeId},
    traits::{ExplorerError, OrderStoreError, ReservationError, SchedulerError, WalletStoreError},
};

#[derive(Debug, Clone, Error)]
pub enum AdmissionError {
    #[error("Invalid order request. {0}")]
    Configuration(String),
    #[error("No wallet and amount pair is free for {currency} right now. Try again later.")]
    AllocationExhausted { currency: String },
    #[error("Order {0} has already been paid")]
    OrderAlreadySettled(OrderId),
    #[error("Order store error. {0}")]
    OrderStore(#[from] OrderStoreError),
    #[error("Wallet store error. {0}")]
    WalletStore(#[from] WalletStoreError),
    #[error("Reservation store error. {0}")]
    Reservation(#[from] ReservationError),
    #[error("Expiry scheduler error. {0}")]
    Scheduler(#[from] SchedulerError),
}

impl From<AllocationError> for AdmissionError {
    fn from(e: AllocationError) -> Self {
        match e {
            AllocationError::Configuration(msg) => Self::Configuration(msg),
            AllocationError::Exhausted { currency, .. } => Self::AllocationExhausted { currency },
            AllocationError::Reservation(e) => Self::Reservation(e),
        }
    }
}

impl AdmissionError {
    /// True for failures a client may simply retry later.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::Configuration(_) | Self::OrderAlreadySettled(_))
    }
}

#[derive(Debug, Clone, Error)]
pub enum SettlementError {
    #[error("No settlement verifier is configured for {0}")]
    UnsupportedCurrency(String),
    #[error("Order {0} does not exist")]
    OrderNotFound(TradeId),
    #[error("Explorer error. {0}")]
    Explorer(#[from] ExplorerError),
    #[error("Order store error. {0}")]
    OrderStore(#[from] OrderStoreError),
}

#[derive(Debug, Clone, Error)]
pub enum ExpiryError {
    #[error("Order store error. {0}")]
    OrderStore(#[from] OrderStoreError),
}
