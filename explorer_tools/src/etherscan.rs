//! The Etherscan v2 multichain API. One endpoint and one key serve every EVM chain, selected by `chainid`.
use upay_engine::{
    chains::ChainConfig,
    traits::{ExplorerError, Transfer, TransferQuery},
};

use crate::data_objects::{EtherscanEnvelope, EtherscanTokenTransfer};

const NO_TRANSACTIONS: &str = "No transactions found";

/// The newest `tokentx` entry for the chain's token contract and the order wallet.
pub fn tokentx_params(
    chain_id: u64,
    chain: &ChainConfig,
    query: &TransferQuery,
    api_key: &str,
) -> Vec<(&'static str, String)> {
    let mut params =
        vec![("chainid", chain_id.to_string()), ("module", "account".into()), ("action", "tokentx".into())];
    if let Some(contract) = &chain.contract {
        params.push(("contractaddress", contract.clone()));
    }
    params.extend([
        ("address", query.address.clone()),
        ("page", "1".into()),
        ("offset", "1".into()),
        ("sort", "desc".into()),
        ("apikey", api_key.to_string()),
    ]);
    params
}

pub fn parse_tokentx(body: &str) -> Result<Option<Transfer>, ExplorerError> {
    let envelope = serde_json::from_str::<EtherscanEnvelope>(body)
        .map_err(|e| ExplorerError::Malformed(format!("Invalid Etherscan reply. {e}")))?;
    if envelope.status != "1" {
        if envelope.message.starts_with(NO_TRANSACTIONS) {
            return Ok(None);
        }
        let detail = match envelope.result.as_str() {
            Some(s) => s.to_string(),
            None => envelope.result.to_string(),
        };
        return Err(ExplorerError::Api(format!("{}: {detail}", envelope.message)));
    }
    let transfers = serde_json::from_value::<Vec<EtherscanTokenTransfer>>(envelope.result)
        .map_err(|e| ExplorerError::Malformed(format!("Invalid tokentx result. {e}")))?;
    let Some(t) = transfers.into_iter().next() else {
        return Ok(None);
    };
    let seconds = t
        .time_stamp
        .parse::<i64>()
        .map_err(|e| ExplorerError::Malformed(format!("Invalid timestamp {} on {}. {e}", t.time_stamp, t.hash)))?;
    Ok(Some(Transfer {
        hash: t.hash,
        symbol: t.token_symbol,
        recipient: t.to,
        raw_amount: t.value,
        timestamp: seconds * 1000,
    }))
}
