//! In-process expiry scheduling on the tokio runtime.
mod tokio_scheduler;

pub use tokio_scheduler::{ExpiryFuture, ExpiryHandler, TokioExpiryScheduler};
