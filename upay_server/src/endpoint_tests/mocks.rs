use chrono::Duration;
use mockall::mock;
use upay_engine::{
    chains::ChainConfig,
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
        ExpirationScheduler,
        ExplorerError,
        OrderManagement,
        OrderStoreError,
        ReservationError,
        ReservationStore,
        SchedulerError,
        Transfer,
        TransferQuery,
        TransferSource,
        WalletManagement,
        WalletStoreError,
    },
};

mock! {
    pub Database {}
    impl Clone for Database {
        fn clone(&self) -> Self;
    }
    impl OrderManagement for Database {
        async fn insert_order(&self, order: NewOrder) -> Result<Order, OrderStoreError>;
        async fn fetch_order_by_trade_id(&self, trade_id: &TradeId) -> Result<Option<Order>, OrderStoreError>;
        async fn fetch_order_by_order_id(&self, order_id: &OrderId) -> Result<Option<Order>, OrderStoreError>;
        async fn fetch_orders_by_status(&self, status: OrderStatusType) -> Result<Vec<Order>, OrderStoreError>;
        async fn update_order_if_status(
            &self,
            trade_id: &TradeId,
            expected: OrderStatusType,
            update: OrderUpdate,
        ) -> Result<Option<Order>, OrderStoreError>;
    }
    impl WalletManagement for Database {
        async fn fetch_enabled_wallets(&self, currency: &str) -> Result<Vec<WalletAddress>, WalletStoreError>;
        async fn insert_wallet(&self, wallet: NewWalletAddress) -> Result<WalletAddress, WalletStoreError>;
        async fn set_wallet_status(
            &self,
            id: i64,
            status: WalletStatus,
        ) -> Result<Option<WalletAddress>, WalletStoreError>;
    }
    impl ReservationStore for Database {
        async fn set_if_absent(&self, key: &ReservationKey, ttl: Duration) -> Result<bool, ReservationError>;
        async fn exists(&self, key: &ReservationKey) -> Result<bool, ReservationError>;
        async fn delete(&self, key: &ReservationKey) -> Result<(), ReservationError>;
        async fn refresh(&self, key: &ReservationKey, ttl: Duration) -> Result<(), ReservationError>;
    }
}

mock! {
    pub Scheduler {}
    impl ExpirationScheduler for Scheduler {
        async fn schedule_expiry(&self, trade_id: &TradeId, delay: Duration) -> Result<(), SchedulerError>;
        async fn cancel_expiry(&self, trade_id: &TradeId) -> Result<bool, SchedulerError>;
    }
}

mock! {
    pub Explorer {}
    impl TransferSource for Explorer {
        async fn latest_transfer_to(
            &self,
            chain: &ChainConfig,
            query: &TransferQuery,
        ) -> Result<Option<Transfer>, ExplorerError>;
    }
}
