use async_trait::async_trait;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::chain::{ChainFetch, ChainKind, ChainProvider};
use crate::config::EndpointConfig;
use crate::transport::Fetcher;
use crate::types::{non_empty, placeholder_name, placeholder_symbol, RawAmount, Token};

/// ERC-20 tokens report 18 decimals unless they say otherwise
pub const DEFAULT_DECIMALS: u8 = 18;

#[derive(Debug, Deserialize)]
struct EthplorerResponse {
    #[serde(default)]
    tokens: Option<Vec<EthplorerToken>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EthplorerToken {
    #[serde(default)]
    token_info: EthplorerTokenInfo,
    #[serde(default)]
    balance: Option<RawAmount>,
    /// Exact integer balance, sent as a string alongside the float one
    #[serde(default)]
    raw_balance: Option<RawAmount>,
}

#[derive(Debug, Default, Deserialize)]
struct EthplorerTokenInfo {
    #[serde(default)]
    address: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    symbol: Option<String>,
    /// Ethplorer sends this as a string, e.g. `"18"`
    #[serde(default)]
    decimals: Option<RawAmount>,
}

impl EthplorerToken {
    fn into_token(self) -> Token {
        let info = self.token_info;
        let decimals = info
            .decimals
            .as_ref()
            .and_then(RawAmount::as_decimals)
            .unwrap_or(DEFAULT_DECIMALS);
        let balance = self
            .raw_balance
            .or(self.balance)
            .map(|raw| raw.scale(decimals))
            .unwrap_or(0.0);

        let address = info.address.unwrap_or_default();
        let name = non_empty(info.name).unwrap_or_else(|| placeholder_name(&address));
        let symbol = non_empty(info.symbol).unwrap_or_else(|| placeholder_symbol(&address));

        Token::new(name, symbol, balance)
    }
}

fn normalize(response: EthplorerResponse) -> Vec<Token> {
    response
        .tokens
        .unwrap_or_default()
        .into_iter()
        .map(EthplorerToken::into_token)
        .collect()
}

/// Ethereum provider backed by the Ethplorer address-info API
pub struct EthereumProvider {
    endpoint: EndpointConfig,
    fetcher: Fetcher,
}

impl EthereumProvider {
    pub fn new(endpoint: EndpointConfig, fetcher: Fetcher) -> Self {
        Self { endpoint, fetcher }
    }
}

#[async_trait]
impl ChainProvider for EthereumProvider {
    fn chain(&self) -> ChainKind {
        ChainKind::Ethereum
    }

    async fn fetch_tokens(&self, address: &str, cancel: &CancellationToken) -> ChainFetch {
        let url = self.endpoint.render(address);
        let provider = &self.endpoint.name;

        match self.fetcher.get::<EthplorerResponse>(&url, &[], cancel).await {
            Ok(response) => {
                let tokens = normalize(response);
                info!("Fetched {} Ethereum tokens using {}", tokens.len(), provider);
                ChainFetch::live(provider, tokens)
            }
            Err(err) => {
                error!("Ethereum fetch error: {}", err);
                ChainFetch::failed(provider, &err)
            }
        }
    }
}
