use thiserror::Error;
use upay_engine::traits::ExplorerError;

#[derive(Debug, Error)]
pub enum ExplorerApiError {
    #[error("Could not initialize client: {0}")]
    Initialization(String),
}

/// Classifies a `reqwest` failure. Timeouts are reported separately so callers can tell a slow explorer from an
/// unreachable one.
pub(crate) fn request_error(e: reqwest::Error) -> ExplorerError {
    if e.is_timeout() {
        ExplorerError::Timeout
    } else if e.is_decode() {
        ExplorerError::Malformed(e.to_string())
    } else {
        ExplorerError::Transport(e.to_string())
    }
}
