//! Tronscan's TRC20 token and native TRX transfer listings.
use upay_engine::{
    chains::ChainConfig,
    traits::{ExplorerError, Transfer, TransferQuery},
};

use crate::data_objects::{Trc20Response, TrxResponse};

pub const API_KEY_HEADER: &str = "TRON-PRO-API-KEY";

/// The newest confirmed TRC20 transfer of the chain's token into the order wallet, inside the order window.
pub fn trc20_params(chain: &ChainConfig, query: &TransferQuery) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("toAddress", query.address.clone()),
        ("limit", "1".to_string()),
        ("confirm", "true".to_string()),
        ("start_timestamp", query.start_ms.to_string()),
        ("end_timestamp", query.end_ms.to_string()),
    ];
    if let Some(contract) = &chain.contract {
        params.push(("contract_address", contract.clone()));
    }
    params
}

/// Tronscan's native listing has no time filter. The verifier applies the window itself.
pub fn trx_params(query: &TransferQuery) -> Vec<(&'static str, String)> {
    vec![
        ("limit", "1".to_string()),
        ("start", "0".to_string()),
        ("address", query.address.clone()),
        ("toAddress", query.address.clone()),
        ("filterTokenValue", "1".to_string()),
    ]
}

pub fn parse_trc20(body: &str) -> Result<Option<Transfer>, ExplorerError> {
    let response = serde_json::from_str::<Trc20Response>(body)
        .map_err(|e| ExplorerError::Malformed(format!("Invalid TRC20 transfer listing. {e}")))?;
    let transfer = response.token_transfers.into_iter().next().map(|t| Transfer {
        hash: t.transaction_id,
        symbol: t.token_info.token_abbr,
        recipient: t.to_address,
        raw_amount: t.quant,
        timestamp: t.block_ts,
    });
    Ok(transfer)
}

pub fn parse_trx(body: &str) -> Result<Option<Transfer>, ExplorerError> {
    let response = serde_json::from_str::<TrxResponse>(body)
        .map_err(|e| ExplorerError::Malformed(format!("Invalid TRX transfer listing. {e}")))?;
    let Some(t) = response.data.into_iter().next() else {
        return Ok(None);
    };
    let raw_amount = integer_amount(&t.amount)?;
    Ok(Some(Transfer {
        hash: t.transaction_hash,
        symbol: t.token_info.token_abbr,
        recipient: t.transfer_to_address,
        raw_amount,
        timestamp: t.timestamp,
    }))
}

/// Native amounts arrive as JSON numbers, sometimes written as floats (`1430000.0`).
fn integer_amount(n: &serde_json::Number) -> Result<String, ExplorerError> {
    if let Some(v) = n.as_u64() {
        return Ok(v.to_string());
    }
    match n.as_f64() {
        Some(v) if v >= 0.0 && v.fract() == 0.0 && v < 9_007_199_254_740_992.0 => Ok(format!("{v:.0}")),
        _ => Err(ExplorerError::Malformed(format!("{n} is not a whole number of sun"))),
    }
}
