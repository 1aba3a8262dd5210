use std::fmt::Debug;

use crate::{
    db_types::{Order, OrderStatusType, TradeId},
    traits::{OrderManagement, OrderStoreError},
};

/// Read-only access to orders, for status polling and checkout pages.
#[derive(Clone)]
pub struct OrderQueryApi<B> {
    db: B,
}

impl<B> Debug for OrderQueryApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderQueryApi")
    }
}

impl<B> OrderQueryApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> OrderQueryApi<B>
where B: OrderManagement
{
    pub async fn fetch_order(&self, trade_id: &TradeId) -> Result<Option<Order>, OrderStoreError> {
        self.db.fetch_order_by_trade_id(trade_id).await
    }

    pub async fn order_status(&self, trade_id: &TradeId) -> Result<Option<OrderStatusType>, OrderStoreError> {
        let order = self.db.fetch_order_by_trade_id(trade_id).await?;
        Ok(order.map(|o| o.status))
    }

    pub async fn pending_orders(&self) -> Result<Vec<Order>, OrderStoreError> {
        self.db.fetch_orders_by_status(OrderStatusType::WaitPay).await
    }
}
