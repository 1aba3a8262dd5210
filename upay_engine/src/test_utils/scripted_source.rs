use std::{collections::HashMap, sync::Arc};

use tokio::sync::Mutex;

use crate::{
    chains::ChainConfig,
    traits::{ExplorerError, Transfer, TransferQuery, TransferSource},
};

type Reply = Result<Option<Transfer>, ExplorerError>;

/// A [`TransferSource`] that answers from a script instead of a block explorer.
///
/// Replies are keyed by recipient address. An address with no scripted reply has no transfers. Every query is
/// recorded so tests can assert on what was asked.
#[derive(Clone, Default)]
pub struct ScriptedTransferSource {
    replies: Arc<Mutex<HashMap<String, Reply>>>,
    queries: Arc<Mutex<Vec<(String, TransferQuery)>>>,
}

impl ScriptedTransferSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// The latest transfer into `address` will be `transfer`, until scripted otherwise.
    pub async fn set_transfer(&self, address: &str, transfer: Transfer) {
        self.replies.lock().await.insert(address.to_string(), Ok(Some(transfer)));
    }

    /// Queries for `address` fail with `error`, until scripted otherwise.
    pub async fn set_error(&self, address: &str, error: ExplorerError) {
        self.replies.lock().await.insert(address.to_string(), Err(error));
    }

    pub async fn clear(&self, address: &str) {
        self.replies.lock().await.remove(address);
    }

    /// Every query made so far, as `(currency, query)` pairs.
    pub async fn queries(&self) -> Vec<(String, TransferQuery)> {
        self.queries.lock().await.clone()
    }
}

impl TransferSource for ScriptedTransferSource {
    async fn latest_transfer_to(
        &self,
        chain: &ChainConfig,
        query: &TransferQuery,
    ) -> Result<Option<Transfer>, ExplorerError> {
        self.queries.lock().await.push((chain.currency.clone(), query.clone()));
        self.replies.lock().await.get(&query.address).cloned().unwrap_or(Ok(None))
    }
}
