use std::time::Duration;

use log::*;
use upg_common::Secret;

pub const DEFAULT_EXPLORER_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct ExplorerConfig {
    pub tronscan_api_key: Secret<String>,
    pub etherscan_api_key: Secret<String>,
    /// Upper bound on a single explorer request, connection included
    pub timeout: Duration,
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            tronscan_api_key: Secret::default(),
            etherscan_api_key: Secret::default(),
            timeout: DEFAULT_EXPLORER_TIMEOUT,
        }
    }
}

impl ExplorerConfig {
    pub fn new_from_env_or_default() -> Self {
        let tronscan_api_key = Secret::new(std::env::var("UPAY_TRONSCAN_API_KEY").unwrap_or_else(|_| {
            warn!("🪛️ UPAY_TRONSCAN_API_KEY not set. Tronscan requests will be rate limited.");
            String::default()
        }));
        let etherscan_api_key = Secret::new(std::env::var("UPAY_ETHERSCAN_API_KEY").unwrap_or_else(|_| {
            warn!("🪛️ UPAY_ETHERSCAN_API_KEY not set. Etherscan requests will be rejected.");
            String::default()
        }));
        let timeout = std::env::var("UPAY_EXPLORER_TIMEOUT")
            .ok()
            .and_then(|s| {
                s.parse::<u64>()
                    .map_err(|e| warn!("🪛️ Invalid UPAY_EXPLORER_TIMEOUT: {s}. {e}. Using the default."))
                    .ok()
            })
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_EXPLORER_TIMEOUT);
        Self { tronscan_api_key, etherscan_api_key, timeout }
    }
}
