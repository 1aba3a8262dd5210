use thiserror::Error;

use crate::db_types::{NewWalletAddress, WalletAddress, WalletStatus};

/// Read access to the wallet pool, plus the minimal writes needed to seed and toggle it.
///
/// Wallets are owned by an administrative collaborator. The engine itself only ever reads them.
#[allow(async_fn_in_trait)]
pub trait WalletManagement {
    /// The enabled wallets for `currency`, in a stable order (by id). This order defines the round-robin sequence.
    async fn fetch_enabled_wallets(&self, currency: &str) -> Result<Vec<WalletAddress>, WalletStoreError>;

    async fn insert_wallet(&self, wallet: NewWalletAddress) -> Result<WalletAddress, WalletStoreError>;

    /// Returns the updated wallet, or `None` if no wallet has this id.
    async fn set_wallet_status(&self, id: i64, status: WalletStatus) -> Result<Option<WalletAddress>, WalletStoreError>;
}

#[derive(Debug, Clone, Error)]
pub enum WalletStoreError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("The wallet store did not respond in time")]
    Timeout,
    #[error("The wallet {token} is already registered for {currency}")]
    DuplicateWallet { currency: String, token: String },
}

impl From<sqlx::Error> for WalletStoreError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::PoolTimedOut => Self::Timeout,
            e => Self::DatabaseError(e.to_string()),
        }
    }
}
