//! Response payloads, limited to the fields the verifier reads.
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TronTokenInfo {
    #[serde(rename = "tokenAbbr", default)]
    pub token_abbr: String,
    #[serde(rename = "tokenDecimal", default)]
    pub token_decimal: Option<u32>,
}

/// One entry of Tronscan's `token_trc20/transfers` listing.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Trc20Transfer {
    #[serde(default)]
    pub transaction_id: String,
    /// Block time in milliseconds
    pub block_ts: i64,
    #[serde(default)]
    pub to_address: String,
    /// Raw integer amount, as a string
    pub quant: String,
    #[serde(rename = "tokenInfo", default)]
    pub token_info: TronTokenInfo,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Trc20Response {
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default)]
    pub token_transfers: Vec<Trc20Transfer>,
}

/// One entry of Tronscan's native `transfer` listing.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TrxTransfer {
    #[serde(rename = "transactionHash", default)]
    pub transaction_hash: String,
    /// Raw amount in sun. Tronscan sends this as a JSON number.
    pub amount: serde_json::Number,
    #[serde(rename = "transferToAddress", default)]
    pub transfer_to_address: String,
    /// Milliseconds
    pub timestamp: i64,
    #[serde(rename = "tokenInfo", default)]
    pub token_info: TronTokenInfo,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TrxResponse {
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default)]
    pub data: Vec<TrxTransfer>,
}

/// Etherscan wraps every reply in this envelope. On failure `result` is an error string instead of a list.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EtherscanEnvelope {
    pub status: String,
    pub message: String,
    pub result: Value,
}

/// One entry of the Etherscan `tokentx` listing. Every field is a string.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EtherscanTokenTransfer {
    pub hash: String,
    /// Seconds since the epoch
    #[serde(rename = "timeStamp")]
    pub time_stamp: String,
    pub to: String,
    pub value: String,
    #[serde(rename = "tokenSymbol")]
    pub token_symbol: String,
}
