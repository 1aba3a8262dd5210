//! # Payment engine public API
//!
//! The `upe_api` module exposes the programmatic API of the payment engine. Each API takes the backends it needs as
//! type parameters, so clients pick the functionality they want, and tests can swap any backend for an in-memory or
//! scripted one.
//!
//! * [`admission_api`] turns merchant order requests into payable orders. It allocates a wallet and on-chain amount,
//!   persists the order and schedules its expiry.
//! * [`expiry_api`] moves orders that outlived their validity window to `Expired`.
//! * [`settlement_api`] checks the chain for a matching transfer and moves paid orders to `PaySuccess`.
//! * [`query_api`] provides read-only access to orders.
//!
//! # API usage
//!
//! ```rust,ignore
//! use upay_engine::{OrderQueryApi, SqliteDatabase};
//! let db = SqliteDatabase::new_with_url("sqlite://data/upay_store.db", 5).await?;
//! // SqliteDatabase implements OrderManagement
//! let api = OrderQueryApi::new(db);
//! let order = api.fetch_order(&trade_id).await?;
//! ```

pub mod admission_api;
pub mod errors;
pub mod expiry_api;
pub mod order_objects;
pub mod query_api;
pub mod settlement_api;
