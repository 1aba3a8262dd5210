//! # upay server
//! This crate hosts the HTTP server for the upay payment gateway. It is responsible for:
//! * Admitting signed merchant orders and handing back the wallet, amount and deadline to pay by.
//! * Answering status checks and checkout page requests.
//! * Polling block explorers for payments, and expiring orders whose window closes unpaid.
//! * Notifying merchants once their orders are paid.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! The server exposes the following routes:
//! * `/health`: A health check route that returns a 200 OK response.
//! * `POST /api/create_order`: Admits a signed merchant order.
//! * `GET /pay/check-status/{trade_id}`: The numeric status of an order.
//! * `GET /pay/order/{trade_id}`: Checkout page data for an order that is waiting for payment.
//! * `POST /pay/verify/{trade_id}`: Checks the block explorer for the order's payment immediately.

pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;

pub mod helpers;
pub mod integrations;
pub mod routes;
pub mod server;
pub mod workers;

#[cfg(test)]
mod endpoint_tests;
