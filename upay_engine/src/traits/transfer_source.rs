use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{chains::ChainConfig, db_types::Order};

/// The most recent confirmed transfer into an address, as reported by a block explorer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub hash: String,
    pub symbol: String,
    pub recipient: String,
    /// The unscaled integer amount, exactly as the explorer reported it
    pub raw_amount: String,
    /// Unix time in milliseconds
    pub timestamp: i64,
}

/// What to ask an explorer for. The time range is a hint that explorers which support it apply server-side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferQuery {
    pub address: String,
    pub start_ms: i64,
    pub end_ms: i64,
}

impl TransferQuery {
    pub fn for_order(order: &Order) -> Self {
        Self {
            address: order.token.clone(),
            start_ms: order.start_time.timestamp_millis(),
            end_ms: order.expiration_time.timestamp_millis(),
        }
    }
}

#[allow(async_fn_in_trait)]
pub trait TransferSource {
    /// Fetches the single most recent transfer into `query.address` on `chain`, or `None` if there is none.
    async fn latest_transfer_to(
        &self,
        chain: &ChainConfig,
        query: &TransferQuery,
    ) -> Result<Option<Transfer>, ExplorerError>;
}

#[derive(Debug, Clone, Error)]
pub enum ExplorerError {
    #[error("Could not reach the explorer. {0}")]
    Transport(String),
    #[error("The explorer did not respond in time")]
    Timeout,
    #[error("The explorer returned HTTP {status}. {message}")]
    HttpStatus { status: u16, message: String },
    #[error("The explorer reported an error. {0}")]
    Api(String),
    #[error("The explorer response could not be understood. {0}")]
    Malformed(String),
}

impl ExplorerError {
    /// Malformed payloads are not expected to fix themselves on the next poll, but are handled the same way:
    /// logged, and nothing is mutated.
    pub fn is_transient(&self) -> bool {
        !matches!(self, Self::Malformed(_))
    }
}
