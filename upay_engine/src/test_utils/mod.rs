//! Helpers for tests of this crate and of crates built on it.
pub mod prepare_env;
mod scripted_source;

pub use scripted_source::ScriptedTransferSource;
