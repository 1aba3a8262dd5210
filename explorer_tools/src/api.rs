use std::sync::Arc;

use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client,
};
use upay_engine::{
    chains::{ChainConfig, ExplorerDialect},
    traits::{ExplorerError, Transfer, TransferQuery, TransferSource},
};

use crate::{
    config::ExplorerConfig,
    error::{request_error, ExplorerApiError},
    etherscan,
    tronscan,
};

/// A single HTTP client shared by every chain. Requests are bounded by the configured timeout.
#[derive(Clone)]
pub struct ExplorerApi {
    config: ExplorerConfig,
    client: Arc<Client>,
}

impl std::fmt::Debug for ExplorerApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ExplorerApi (timeout: {:?})", self.config.timeout)
    }
}

impl ExplorerApi {
    pub fn new(config: ExplorerConfig) -> Result<Self, ExplorerApiError> {
        let mut headers = HeaderMap::with_capacity(1);
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|e| ExplorerApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub fn config(&self) -> &ExplorerConfig {
        &self.config
    }

    /// Sends a GET request and returns the body of a successful response.
    pub async fn get_text(
        &self,
        url: &str,
        params: &[(&str, String)],
        headers: HeaderMap,
    ) -> Result<String, ExplorerError> {
        trace!("🌐️ Querying {url}");
        let response =
            self.client.get(url).query(params).headers(headers).send().await.map_err(request_error)?;
        let status = response.status();
        let body = response.text().await.map_err(request_error)?;
        if status.is_success() {
            trace!("🌐️ {url} answered {status}");
            Ok(body)
        } else {
            Err(ExplorerError::HttpStatus { status: status.as_u16(), message: body })
        }
    }

    fn tronscan_headers(&self) -> Result<HeaderMap, ExplorerError> {
        let mut headers = HeaderMap::with_capacity(1);
        let key = self.config.tronscan_api_key.reveal();
        if !key.is_empty() {
            let value = HeaderValue::from_str(key)
                .map_err(|e| ExplorerError::Transport(format!("The Tronscan API key is not a valid header. {e}")))?;
            headers.insert(tronscan::API_KEY_HEADER, value);
        }
        Ok(headers)
    }
}

impl TransferSource for ExplorerApi {
    async fn latest_transfer_to(
        &self,
        chain: &ChainConfig,
        query: &TransferQuery,
    ) -> Result<Option<Transfer>, ExplorerError> {
        let transfer = match chain.dialect {
            ExplorerDialect::TronscanTrc20 => {
                let params = tronscan::trc20_params(chain, query);
                let body = self.get_text(&chain.endpoint, &params, self.tronscan_headers()?).await?;
                tronscan::parse_trc20(&body)?
            },
            ExplorerDialect::TronscanTrx => {
                let params = tronscan::trx_params(query);
                let body = self.get_text(&chain.endpoint, &params, self.tronscan_headers()?).await?;
                tronscan::parse_trx(&body)?
            },
            ExplorerDialect::Etherscan { chain_id } => {
                let key = self.config.etherscan_api_key.reveal();
                let params = etherscan::tokentx_params(chain_id, chain, query, key);
                let body = self.get_text(&chain.endpoint, &params, HeaderMap::new()).await?;
                etherscan::parse_tokentx(&body)?
            },
        };
        match &transfer {
            Some(t) => debug!("🌐️ Latest {} transfer into {} is {}", chain.currency, query.address, t.hash),
            None => trace!("🌐️ No {} transfers into {}", chain.currency, query.address),
        }
        Ok(transfer)
    }
}
