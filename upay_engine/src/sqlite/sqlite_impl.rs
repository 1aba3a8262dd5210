//! `SqliteDatabase` is a concrete implementation of a payment engine backend.
//!
//! It stores orders, the wallet pool and reservations in SQLite, and implements every storage trait in
//! [`crate::traits`]. Because reservations are claimed with a single conditional upsert, several gateway processes may
//! share one database file.
use std::{fmt::Debug, time::Duration};

use chrono::Duration as ChronoDuration;
use log::*;
use sqlx::{
    migrate::{MigrateDatabase, MigrateError},
    Sqlite,
    SqlitePool,
};

use super::db::{db_url, new_pool, orders, reservations, wallets};
use crate::{
    db_types::{
        NewOrder,
        NewWalletAddress,
        Order,
        OrderId,
        OrderStatusType,
        OrderUpdate,
        ReservationKey,
        TradeId,
        WalletAddress,
        WalletStatus,
    },
    traits::{
        OrderManagement,
        OrderStoreError,
        ReservationError,
        ReservationStore,
        WalletManagement,
        WalletStoreError,
    },
};

/// How long a caller waits for a pooled connection before the store reports a timeout.
pub const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object, using `UPAY_DATABASE_URL` or the default location.
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        Self::new_with_options(url, max_connections, DEFAULT_ACQUIRE_TIMEOUT).await
    }

    pub async fn new_with_options(
        url: &str,
        max_connections: u32,
        acquire_timeout: Duration,
    ) -> Result<Self, sqlx::Error> {
        trace!("🗃️ Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections, acquire_timeout).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// Creates the database file at `url` if it does not exist yet.
    pub async fn create_if_missing(url: &str) -> Result<(), sqlx::Error> {
        if !Sqlite::database_exists(url).await? {
            Sqlite::create_database(url).await?;
            info!("🗃️ Created Sqlite database {url}");
        }
        Ok(())
    }

    /// Brings the schema up to date. Safe to call on every start.
    pub async fn run_migrations(&self) -> Result<(), MigrateError> {
        sqlx::migrate!("./src/sqlite/migrations").run(&self.pool).await?;
        debug!("🗃️ Migrations complete for {}", self.url);
        Ok(())
    }

    /// Deletes reservation rows whose claims have lapsed. Lapsed rows are already ignored by every read, so this only
    /// reclaims space.
    pub async fn purge_expired_reservations(&self) -> Result<u64, ReservationError> {
        let mut conn = self.pool.acquire().await?;
        let removed = reservations::purge_expired(&mut conn).await?;
        if removed > 0 {
            debug!("🗃️ Purged {removed} lapsed reservations");
        }
        Ok(removed)
    }

    /// The URL of the database
    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

impl OrderManagement for SqliteDatabase {
    async fn insert_order(&self, order: NewOrder) -> Result<Order, OrderStoreError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::insert_order(order, &mut conn).await?;
        debug!("🗃️ Order {} ({}) has been saved in the DB with id {}", order.trade_id, order.order_id, order.id);
        Ok(order)
    }

    async fn fetch_order_by_trade_id(&self, trade_id: &TradeId) -> Result<Option<Order>, OrderStoreError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order_by_trade_id(trade_id, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_order_by_order_id(&self, order_id: &OrderId) -> Result<Option<Order>, OrderStoreError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order_by_order_id(order_id, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_orders_by_status(&self, status: OrderStatusType) -> Result<Vec<Order>, OrderStoreError> {
        let mut conn = self.pool.acquire().await?;
        let orders = orders::fetch_orders_by_status(status, &mut conn).await?;
        Ok(orders)
    }

    async fn update_order_if_status(
        &self,
        trade_id: &TradeId,
        expected: OrderStatusType,
        update: OrderUpdate,
    ) -> Result<Option<Order>, OrderStoreError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::update_order_if_status(trade_id, expected, update, &mut conn).await?;
        match &order {
            Some(o) => trace!("🗃️ Order {trade_id} updated. Status is now {}", o.status),
            None => trace!("🗃️ Order {trade_id} is not {expected}. Update skipped."),
        }
        Ok(order)
    }
}

impl WalletManagement for SqliteDatabase {
    async fn fetch_enabled_wallets(&self, currency: &str) -> Result<Vec<WalletAddress>, WalletStoreError> {
        let mut conn = self.pool.acquire().await?;
        let wallets = wallets::fetch_enabled_wallets(currency, &mut conn).await?;
        Ok(wallets)
    }

    async fn insert_wallet(&self, wallet: NewWalletAddress) -> Result<WalletAddress, WalletStoreError> {
        let mut conn = self.pool.acquire().await?;
        let wallet = wallets::insert_wallet(wallet, &mut conn).await?;
        debug!("🗃️ Wallet {} added for {} at a rate of {}", wallet.token, wallet.currency, wallet.rate);
        Ok(wallet)
    }

    async fn set_wallet_status(
        &self,
        id: i64,
        status: WalletStatus,
    ) -> Result<Option<WalletAddress>, WalletStoreError> {
        let mut conn = self.pool.acquire().await?;
        let wallet = wallets::set_wallet_status(id, status, &mut conn).await?;
        Ok(wallet)
    }
}

impl ReservationStore for SqliteDatabase {
    async fn set_if_absent(&self, key: &ReservationKey, ttl: ChronoDuration) -> Result<bool, ReservationError> {
        let mut conn = self.pool.acquire().await?;
        let claimed = reservations::set_if_absent(key, ttl, &mut conn).await?;
        Ok(claimed)
    }

    async fn exists(&self, key: &ReservationKey) -> Result<bool, ReservationError> {
        let mut conn = self.pool.acquire().await?;
        let exists = reservations::exists(key, &mut conn).await?;
        Ok(exists)
    }

    async fn delete(&self, key: &ReservationKey) -> Result<(), ReservationError> {
        let mut conn = self.pool.acquire().await?;
        reservations::delete(key, &mut conn).await?;
        Ok(())
    }

    async fn refresh(&self, key: &ReservationKey, ttl: ChronoDuration) -> Result<(), ReservationError> {
        let mut conn = self.pool.acquire().await?;
        reservations::refresh(key, ttl, &mut conn).await?;
        Ok(())
    }
}
