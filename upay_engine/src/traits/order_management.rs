use thiserror::Error;

use crate::db_types::{NewOrder, Order, OrderId, OrderStatusType, OrderUpdate, TradeId};

#[allow(async_fn_in_trait)]
pub trait OrderManagement {
    /// Persists a brand-new order with status `WaitPay`.
    ///
    /// Returns [`OrderStoreError::DuplicateTradeId`] if the trade id is already taken.
    async fn insert_order(&self, order: NewOrder) -> Result<Order, OrderStoreError>;

    async fn fetch_order_by_trade_id(&self, trade_id: &TradeId) -> Result<Option<Order>, OrderStoreError>;

    /// Returns the most recently created order carrying the merchant's `order_id`, if any.
    async fn fetch_order_by_order_id(&self, order_id: &OrderId) -> Result<Option<Order>, OrderStoreError>;

    /// All orders with the given status, oldest first.
    async fn fetch_orders_by_status(&self, status: OrderStatusType) -> Result<Vec<Order>, OrderStoreError>;

    /// Atomically applies `update` to the order, if and only if its current status is `expected`.
    ///
    /// Returns the updated order, or `None` if the order does not exist or its status did not match. All fields in
    /// the update are written together or not at all.
    async fn update_order_if_status(
        &self,
        trade_id: &TradeId,
        expected: OrderStatusType,
        update: OrderUpdate,
    ) -> Result<Option<Order>, OrderStoreError>;
}

#[derive(Debug, Clone, Error)]
pub enum OrderStoreError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("The order store did not respond in time")]
    Timeout,
    #[error("An order with trade id {0} already exists")]
    DuplicateTradeId(TradeId),
    #[error("The order update for {0} contained no changes")]
    EmptyUpdate(TradeId),
}

impl From<sqlx::Error> for OrderStoreError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::PoolTimedOut => Self::Timeout,
            e => Self::DatabaseError(e.to_string()),
        }
    }
}
