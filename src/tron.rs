use async_trait::async_trait;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::chain::{ChainFetch, ChainKind, ChainProvider};
use crate::config::EndpointConfig;
use crate::transport::Fetcher;
use crate::types::{non_empty, RawAmount, Token};

/// Most TRC20 tokens (USDT included) use 6 decimals
pub const DEFAULT_DECIMALS: u8 = 6;

#[derive(Debug, Deserialize)]
struct TronAccountResponse {
    #[serde(default)]
    trc20token_balances: Option<Vec<Trc20Balance>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Trc20Balance {
    #[serde(default)]
    token_name: Option<String>,
    #[serde(default)]
    token_abbr: Option<String>,
    /// Tronscan sends the raw integer balance as a string
    #[serde(default)]
    balance: Option<RawAmount>,
    #[serde(default)]
    token_decimal: Option<RawAmount>,
}

impl Trc20Balance {
    fn into_token(self) -> Token {
        let decimals = self
            .token_decimal
            .as_ref()
            .and_then(RawAmount::as_decimals)
            .unwrap_or(DEFAULT_DECIMALS);
        let balance = self.balance.map(|raw| raw.scale(decimals)).unwrap_or(0.0);

        Token::new(
            non_empty(self.token_name).unwrap_or_else(|| "Unknown Token".to_string()),
            non_empty(self.token_abbr).unwrap_or_else(|| "N/A".to_string()),
            balance,
        )
    }
}

fn normalize(response: TronAccountResponse) -> Vec<Token> {
    response
        .trc20token_balances
        .unwrap_or_default()
        .into_iter()
        .map(Trc20Balance::into_token)
        .collect()
}

/// Tron chain provider backed by the Tronscan account API
pub struct TronProvider {
    endpoint: EndpointConfig,
    fetcher: Fetcher,
}

impl TronProvider {
    pub fn new(endpoint: EndpointConfig, fetcher: Fetcher) -> Self {
        Self { endpoint, fetcher }
    }
}

#[async_trait]
impl ChainProvider for TronProvider {
    fn chain(&self) -> ChainKind {
        ChainKind::Tron
    }

    async fn fetch_tokens(&self, address: &str, cancel: &CancellationToken) -> ChainFetch {
        let url = self.endpoint.render(address);
        let provider = &self.endpoint.name;

        match self.fetcher.get::<TronAccountResponse>(&url, &[], cancel).await {
            Ok(response) => {
                let tokens = normalize(response);
                debug!("Tron tokens: {:?}", tokens);
                ChainFetch::live(provider, tokens)
            }
            Err(err) => {
                error!("Tron fetch error: {}", err);
                ChainFetch::failed(provider, &err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use serde_json::json;

    use super::*;
    use crate::config::Config;
    use crate::fallback::AttemptOutcome;
    use crate::transport::testing::{Reply, ScriptedTransport};
    use crate::transport::ReqwestTransport;
    use crate::types::TokenSource;

    const ADDRESS: &str = "TR7NHqjeKQxGTCi8q8ZY4pL8otSzgjLj6t";

    fn decode(body: serde_json::Value) -> Vec<Token> {
        normalize(serde_json::from_value(body).unwrap())
    }

    fn provider(transport: ScriptedTransport) -> TronProvider {
        TronProvider::new(
            EndpointConfig {
                name: "Tronscan API".to_string(),
                url: "http://tron/api/account?address={address}".to_string(),
                api_key: None,
            },
            Fetcher::new(Arc::new(transport), Duration::from_secs(5)),
        )
    }

    #[test]
    fn test_default_decimals() {
        let tokens = decode(json!({
            "trc20token_balances": [{ "tokenName": "Tether USD", "tokenAbbr": "USDT", "balance": 5000000 }]
        }));
        assert_eq!(tokens, vec![Token::new("Tether USD", "USDT", 5.0)]);

        let tokens = decode(json!({
            "trc20token_balances": [{ "tokenName": "Tether USD", "tokenAbbr": "USDT", "balance": "5000000" }]
        }));
        assert_eq!(tokens[0].balance, 5.0);
    }

    #[test]
    fn test_explicit_decimals_and_defaults() {
        let tokens = decode(json!({
            "trc20token_balances": [
                { "tokenName": "JUST", "tokenAbbr": "JST", "balance": "2500000000000000000", "tokenDecimal": 18 },
                { "balance": "1000000" }
            ]
        }));
        assert_eq!(tokens[0].balance, 2.5);
        assert_eq!(tokens[1], Token::new("Unknown Token", "N/A", 1.0));
        assert!(tokens.iter().all(|t| t.mint.is_none()));
    }

    #[test]
    fn test_zero_decimals_are_not_replaced() {
        let tokens = decode(json!({
            "trc20token_balances": [{ "tokenName": "Points", "tokenAbbr": "PTS", "balance": "5000000", "tokenDecimal": 0 }]
        }));
        assert_eq!(tokens[0].balance, 5000000.0);
    }

    #[test]
    fn test_missing_balances_list() {
        assert!(decode(json!({ "address": ADDRESS })).is_empty());
    }

    #[tokio::test]
    async fn test_fetch_live() {
        let transport = ScriptedTransport::new().reply(
            format!("http://tron/api/account?address={ADDRESS}"),
            Reply::Json(json!({
                "trc20token_balances": [{ "tokenName": "Tether USD", "tokenAbbr": "USDT", "balance": "12000000", "tokenDecimal": 6 }]
            })),
        );
        let fetch = provider(transport)
            .fetch_tokens(ADDRESS, &CancellationToken::new())
            .await;

        assert_eq!(fetch.tokens, vec![Token::new("Tether USD", "USDT", 12.0)]);
        assert!(fetch.source.is_live());
    }

    #[tokio::test]
    async fn test_non_success_status_is_empty() {
        let transport = ScriptedTransport::new().reply(
            format!("http://tron/api/account?address={ADDRESS}"),
            Reply::Status(502),
        );
        let fetch = provider(transport)
            .fetch_tokens(ADDRESS, &CancellationToken::new())
            .await;

        assert!(fetch.tokens.is_empty());
        assert_eq!(
            fetch.source,
            TokenSource::Failed {
                reason: "Tronscan API: unexpected HTTP status 502".to_string()
            }
        );
        assert_eq!(
            fetch.attempts[0].outcome,
            AttemptOutcome::Failed {
                error: "unexpected HTTP status 502".to_string()
            }
        );
    }

    #[tokio::test]
    #[ignore] // Requires network access
    async fn test_mainnet_account() {
        let config = Config::load().unwrap();
        let transport = ReqwestTransport::new(config.request_timeout()).unwrap();
        let provider = TronProvider::new(
            config.tron.clone(),
            Fetcher::new(Arc::new(transport), config.request_timeout()),
        );

        let fetch = provider.fetch_tokens(ADDRESS, &CancellationToken::new()).await;
        assert!(fetch.source.is_live(), "unexpected source {:?}", fetch.source);
    }
}
