//! # Collaborator contracts
//!
//! The engine never talks to a database, cache, task runner or block explorer directly. It consumes the narrow
//! operations defined here, and any backend that implements them can serve the engine.
//!
//! * [`OrderManagement`] is the durable order store: create, read and update-if-status.
//! * [`WalletManagement`] exposes the wallet pool that the allocator draws from.
//! * [`ReservationStore`] holds time-bounded exclusive claims on (wallet, amount) pairs.
//! * [`ExpirationScheduler`] fires a one-shot action when an order's validity window closes.
//! * [`TransferSource`] fetches the most recent transfer into an address from a block explorer.
//!
//! [`GatewayDatabase`] bundles the stores a single relational backend usually provides.
mod expiration_scheduler;
mod order_management;
mod reservation_store;
mod transfer_source;
mod wallet_management;

pub use expiration_scheduler::{ExpirationScheduler, SchedulerError};
pub use order_management::{OrderManagement, OrderStoreError};
pub use reservation_store::{ReservationError, ReservationStore};
pub use transfer_source::{ExplorerError, Transfer, TransferQuery, TransferSource};
pub use wallet_management::{WalletManagement, WalletStoreError};

/// A backend that stores orders and wallets and can hold reservations. Implemented for every type that provides all
/// three stores.
pub trait GatewayDatabase: Clone + OrderManagement + WalletManagement + ReservationStore {}

impl<T> GatewayDatabase for T where T: Clone + OrderManagement + WalletManagement + ReservationStore {}
