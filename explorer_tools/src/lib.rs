//! Block explorer clients.
//!
//! [`ExplorerApi`] implements the engine's [`upay_engine::TransferSource`] for every explorer dialect the gateway
//! knows: Tronscan's TRC20 and native TRX listings, and the Etherscan v2 multichain API. Each dialect lives in its
//! own module, which builds the query and turns the response into a [`upay_engine::traits::Transfer`].
mod api;
mod config;
mod error;

mod data_objects;
mod etherscan;
mod tronscan;

pub use api::ExplorerApi;
pub use config::ExplorerConfig;
pub use error::ExplorerApiError;
