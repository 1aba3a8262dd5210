//! Per-chain verification settings.
//!
//! Every supported currency (a chain and token pair, such as `USDT-TRC20`) is described by one [`ChainConfig`]. The
//! settlement verifier applies the same protocol to every chain; the differences between chains live entirely in this
//! data. A new chain is added by adding an entry to the registry, either in code or through a JSON file.
use std::{collections::HashMap, path::Path};

use log::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const TRONSCAN_TRC20_ENDPOINT: &str = "https://apilist.tronscanapi.com/api/token_trc20/transfers";
pub const TRONSCAN_TRX_ENDPOINT: &str = "https://apilist.tronscanapi.com/api/transfer";
pub const ETHERSCAN_V2_ENDPOINT: &str = "https://api.etherscan.io/v2/api";

/// The request and response format an explorer speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExplorerDialect {
    /// Tronscan TRC20 token transfer listing
    TronscanTrc20,
    /// Tronscan native TRX transfer listing
    TronscanTrx,
    /// Etherscan v2 multichain `tokentx` listing
    Etherscan { chain_id: u64 },
}

/// How a transfer's recipient is compared with the order's wallet address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressMatch {
    /// Hex addresses, where checksummed and lowercase forms are the same address
    CaseInsensitive,
    /// Encoded addresses (e.g. base58) that must match byte for byte
    Exact,
}

impl AddressMatch {
    pub fn matches(&self, observed: &str, expected: &str) -> bool {
        match self {
            Self::CaseInsensitive => observed.eq_ignore_ascii_case(expected),
            Self::Exact => observed == expected,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainConfig {
    /// The currency identifier orders carry, e.g. `USDC-Polygon`
    pub currency: String,
    pub dialect: ExplorerDialect,
    pub endpoint: String,
    /// Token contract address. `None` for a chain's native coin.
    pub contract: Option<String>,
    /// The token symbol the explorer must report for a transfer to count
    pub symbol: String,
    /// Decimal exponent used to scale raw integer amounts
    pub decimals: u32,
    pub address_match: AddressMatch,
}

#[derive(Debug, Error)]
pub enum ChainConfigError {
    #[error("Could not read chain configuration file {path}. {reason}")]
    Io { path: String, reason: String },
    #[error("Invalid chain configuration. {0}")]
    Invalid(String),
}

/// The set of chains the gateway can verify, keyed by currency.
#[derive(Debug, Clone, Default)]
pub struct ChainRegistry {
    chains: HashMap<String, ChainConfig>,
}

impl ChainRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// The chains supported out of the box.
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        registry.insert(ChainConfig {
            currency: "USDT-TRC20".into(),
            dialect: ExplorerDialect::TronscanTrc20,
            endpoint: TRONSCAN_TRC20_ENDPOINT.into(),
            contract: Some("TR7NHqjeKQxGTCi8q8ZY4pL8otSzgjLj6t".into()),
            symbol: "USDT".into(),
            decimals: 6,
            address_match: AddressMatch::Exact,
        });
        registry.insert(ChainConfig {
            currency: "TRX".into(),
            dialect: ExplorerDialect::TronscanTrx,
            endpoint: TRONSCAN_TRX_ENDPOINT.into(),
            contract: None,
            symbol: "trx".into(),
            decimals: 6,
            address_match: AddressMatch::Exact,
        });
        registry.insert(etherscan_chain(
            "USDC-ERC20",
            1,
            "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48",
            "USDC",
            6,
            AddressMatch::CaseInsensitive,
        ));
        // Polygon recipients are compared exactly, as the deployed gateway always has.
        registry.insert(etherscan_chain(
            "USDC-Polygon",
            137,
            "0x2791bca1f2de4661ed88a30c99a7a9449aa84174",
            "USDC.e",
            6,
            AddressMatch::Exact,
        ));
        registry.insert(etherscan_chain(
            "USDT-ArbitrumOne",
            42161,
            "0xfd086bc7cd5c481dcc9c85ebe478a1c0b69fcbb9",
            "USD₮0",
            6,
            AddressMatch::CaseInsensitive,
        ));
        registry.insert(etherscan_chain(
            "USDT-BSC",
            56,
            "0x55d398326f99059ff775485246999027b3197955",
            "BSC-USD",
            18,
            AddressMatch::CaseInsensitive,
        ));
        registry
    }

    /// Parses a JSON array of [`ChainConfig`] entries.
    pub fn from_json(json: &str) -> Result<Self, ChainConfigError> {
        let chains: Vec<ChainConfig> =
            serde_json::from_str(json).map_err(|e| ChainConfigError::Invalid(e.to_string()))?;
        let mut registry = Self::empty();
        for chain in chains {
            if chain.symbol.is_empty() || chain.endpoint.is_empty() {
                let msg = format!("{} needs both a symbol and an endpoint", chain.currency);
                return Err(ChainConfigError::Invalid(msg));
            }
            registry.insert(chain);
        }
        Ok(registry)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ChainConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| ChainConfigError::Io { path: path.display().to_string(), reason: e.to_string() })?;
        Self::from_json(&json)
    }

    /// Adds every chain in `other`, replacing entries with the same currency.
    pub fn merge(mut self, other: ChainRegistry) -> Self {
        for (currency, chain) in other.chains {
            if self.chains.contains_key(&currency) {
                info!("🔗️ Chain configuration for {currency} has been overridden");
            }
            self.chains.insert(currency, chain);
        }
        self
    }

    pub fn insert(&mut self, chain: ChainConfig) {
        self.chains.insert(chain.currency.clone(), chain);
    }

    pub fn get(&self, currency: &str) -> Option<&ChainConfig> {
        self.chains.get(currency)
    }

    pub fn supports(&self, currency: &str) -> bool {
        self.chains.contains_key(currency)
    }

    pub fn currencies(&self) -> Vec<&str> {
        let mut result = self.chains.keys().map(String::as_str).collect::<Vec<_>>();
        result.sort();
        result
    }
}

fn etherscan_chain(
    currency: &str,
    chain_id: u64,
    contract: &str,
    symbol: &str,
    decimals: u32,
    address_match: AddressMatch,
) -> ChainConfig {
    ChainConfig {
        currency: currency.into(),
        dialect: ExplorerDialect::Etherscan { chain_id },
        endpoint: ETHERSCAN_V2_ENDPOINT.into(),
        contract: Some(contract.into()),
        symbol: symbol.into(),
        decimals,
        address_match,
    }
}
