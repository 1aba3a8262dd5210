use sqlx::SqliteConnection;

use crate::{
    db_types::{NewWalletAddress, WalletAddress, WalletStatus},
    traits::WalletStoreError,
};

/// The enabled wallets for `currency`, in id order. The allocator's round-robin follows this order.
pub async fn fetch_enabled_wallets(
    currency: &str,
    conn: &mut SqliteConnection,
) -> Result<Vec<WalletAddress>, sqlx::Error> {
    let wallets = sqlx::query_as("SELECT * FROM wallet_addresses WHERE currency = $1 AND status = $2 ORDER BY id ASC")
        .bind(currency)
        .bind(WalletStatus::Enabled.to_string())
        .fetch_all(conn)
        .await?;
    Ok(wallets)
}

pub async fn insert_wallet(
    wallet: NewWalletAddress,
    conn: &mut SqliteConnection,
) -> Result<WalletAddress, WalletStoreError> {
    let result = sqlx::query_as(
        "INSERT INTO wallet_addresses (currency, token, status, rate) VALUES ($1, $2, $3, $4) RETURNING *",
    )
    .bind(&wallet.currency)
    .bind(&wallet.token)
    .bind(wallet.status.to_string())
    .bind(wallet.rate.to_string())
    .fetch_one(conn)
    .await;
    match result {
        Ok(wallet) => Ok(wallet),
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            Err(WalletStoreError::DuplicateWallet { currency: wallet.currency, token: wallet.token })
        },
        Err(e) => Err(e.into()),
    }
}

pub async fn set_wallet_status(
    id: i64,
    status: WalletStatus,
    conn: &mut SqliteConnection,
) -> Result<Option<WalletAddress>, sqlx::Error> {
    let wallet = sqlx::query_as("UPDATE wallet_addresses SET status = $1 WHERE id = $2 RETURNING *")
        .bind(status.to_string())
        .bind(id)
        .fetch_optional(conn)
        .await?;
    Ok(wallet)
}
