//! uPay Payment Engine
//!
//! The payment engine lets merchants accept stablecoin and native-coin payments on several chains without handing
//! out a fresh address per order. This library contains the core logic of the gateway. It is explorer-agnostic and
//! storage-agnostic.
//!
//! The library is divided into these sections:
//! 1. The collaborator contracts ([`mod@traits`]). The engine reaches its order store, reservation store, expiry
//!    scheduler and block explorers only through these traits. [`SqliteDatabase`] implements the storage traits, and
//!    the [`mod@memory`] and [`mod@scheduler`] modules provide process-local implementations of the rest.
//! 2. The allocator ([`mod@allocator`]), which hands out unique `(wallet, amount)` pairs.
//! 3. The payment engine public API ([`mod@upe_api`]). This is the public-facing functionality: order admission,
//!    expiry, settlement verification and order queries.
//! 4. Per-chain verification settings ([`mod@chains`]).
//!
//! The engine also emits events when orders are created, paid or expired. Subscribe to them through
//! [`events::EventHooks`] to run custom actions, such as notifying the merchant.
pub mod allocator;
pub mod chains;
pub mod db_types;
pub mod events;
pub mod helpers;
pub mod memory;
pub mod scheduler;
pub mod traits;
mod upe_api;

#[cfg(feature = "sqlite")]
mod sqlite;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

#[cfg(feature = "sqlite")]
pub use sqlite::{sqlite_expiry_handler, SqliteDatabase, EXPIRY_RETRY_DELAY};
pub use traits::{
    ExpirationScheduler,
    GatewayDatabase,
    OrderManagement,
    ReservationStore,
    TransferSource,
    WalletManagement,
};
pub use upe_api::{
    admission_api::{OrderAdmissionApi, DEFAULT_ORDER_VALIDITY},
    errors::{AdmissionError, ExpiryError, SettlementError},
    expiry_api::OrderExpiryApi,
    order_objects,
    query_api::OrderQueryApi,
    settlement_api::{match_transfer, SettlementVerifier},
};
