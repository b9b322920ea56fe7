//! Solana token lookup over an ordered chain of public indexer APIs.
//!
//! Endpoints are tried one at a time in configured order and the first one that
//! returns at least one positive balance wins. When every endpoint comes up empty the
//! provider substitutes fixed demonstration data (tagged [`TokenSource::Synthetic`]),
//! and when that is disabled it returns a single diagnostic token. A Solana lookup
//! that is not cancelled therefore never yields an empty list.

use async_trait::async_trait;
use serde::Deserialize;
use solana_sdk::pubkey::Pubkey;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::chain::{ChainFetch, ChainKind, ChainProvider};
use crate::config::{BalanceField, SolanaConfig, SolanaEndpoint};
use crate::error::FetchError;
use crate::fallback::{first_success, Candidate, Resolution};
use crate::transport::{Fetcher, Headers};
use crate::types::{non_empty, placeholder_name, placeholder_symbol, RawAmount, Token, TokenSource};

/// Several public Solana APIs reject requests that do not look like a browser
pub const BROWSER_HEADERS: &Headers = &[
    (
        "User-Agent",
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36",
    ),
    ("Accept", "application/json"),
    ("Content-Type", "application/json"),
];

/// Circle's USDC mint on mainnet
pub const USDC_MINT: Pubkey = solana_sdk::pubkey!("EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v");

const UNAVAILABLE_MESSAGE: &str = "Solana token lookup is currently unavailable due to API \
    restrictions. This is a common issue with public Solana APIs.";

#[derive(Debug, Deserialize)]
struct SolanaTokenResponse {
    #[serde(default)]
    result: Option<SolanaTokenResult>,
}

#[derive(Debug, Deserialize)]
struct SolanaTokenResult {
    #[serde(default)]
    tokens: Vec<SolanaTokenEntry>,
}

#[derive(Debug, Deserialize)]
struct SolanaTokenEntry {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    symbol: Option<String>,
    #[serde(default)]
    balance: Option<RawAmount>,
    #[serde(default)]
    amount: Option<RawAmount>,
    #[serde(default)]
    mint: Option<String>,
}

impl Candidate for SolanaEndpoint {
    fn name(&self) -> &str {
        &self.name
    }
}

/// Keep entries with a strictly positive, finite balance and fill in missing names
/// from the mint. An entry missing both a mint and its name or symbol is dropped.
fn transform(response: SolanaTokenResponse, field: BalanceField) -> Vec<Token> {
    let entries = response.result.map(|r| r.tokens).unwrap_or_default();

    entries
        .into_iter()
        .filter_map(|entry| {
            let raw = match field {
                BalanceField::Balance => entry.balance.as_ref(),
                BalanceField::Amount => entry.amount.as_ref(),
            };
            let balance = raw.map(RawAmount::as_f64).unwrap_or(0.0);
            if !balance.is_finite() || balance <= 0.0 {
                return None;
            }

            let mint = non_empty(entry.mint);
            let name = match (non_empty(entry.name), &mint) {
                (Some(name), _) => name,
                (None, Some(mint)) => placeholder_name(mint),
                (None, None) => return None,
            };
            let symbol = match (non_empty(entry.symbol), &mint) {
                (Some(symbol), _) => symbol,
                (None, Some(mint)) => placeholder_symbol(mint),
                (None, None) => return None,
            };

            let token = Token::new(name, symbol, balance);
            Some(match mint {
                Some(mint) => token.with_mint(mint),
                None => token,
            })
        })
        .collect()
}

/// Fixed demonstration balances used once every real endpoint has failed
pub fn synthetic_tokens() -> Vec<Token> {
    vec![
        Token::new("Solana (SOL)", "SOL", 1.5).with_mint(spl_token::native_mint::ID.to_string()),
        Token::new("USDC", "USDC", 100.0).with_mint(USDC_MINT.to_string()),
    ]
}

/// The single entry returned when neither live nor synthetic data is available
pub fn unavailable_token() -> Token {
    Token::diagnostic("Solana API Unavailable", "INFO", UNAVAILABLE_MESSAGE)
}

/// Solana chain provider with ordered endpoint fallback
pub struct SolanaProvider {
    endpoints: Vec<SolanaEndpoint>,
    synthetic_fallback: bool,
    fetcher: Fetcher,
}

impl SolanaProvider {
    pub fn new(config: SolanaConfig, fetcher: Fetcher) -> Self {
        Self {
            endpoints: config.endpoints,
            synthetic_fallback: config.synthetic_fallback,
            fetcher,
        }
    }

    async fn try_endpoint(
        &self,
        endpoint: &SolanaEndpoint,
        address: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<Token>, FetchError> {
        let url = endpoint.render(address);
        let response: SolanaTokenResponse =
            self.fetcher.get(&url, BROWSER_HEADERS, cancel).await?;
        Ok(transform(response, endpoint.balance_field))
    }
}

#[async_trait]
impl ChainProvider for SolanaProvider {
    fn chain(&self) -> ChainKind {
        ChainKind::Solana
    }

    async fn fetch_tokens(&self, address: &str, cancel: &CancellationToken) -> ChainFetch {
        let chain = first_success(&self.endpoints, cancel, move |endpoint| {
            self.try_endpoint(endpoint, address, cancel)
        })
        .await;

        let (tokens, source) = match chain.resolution {
            Resolution::Found { provider, items } => (items, TokenSource::Live { provider }),
            Resolution::Cancelled => return ChainFetch::cancelled(chain.attempts),
            Resolution::Exhausted if self.synthetic_fallback => {
                let tokens = synthetic_tokens();
                info!(
                    "All Solana endpoints failed, returning {} demonstration tokens",
                    tokens.len()
                );
                (tokens, TokenSource::Synthetic)
            }
            Resolution::Exhausted => {
                warn!("All Solana endpoints failed and synthetic data is disabled");
                (vec![unavailable_token()], TokenSource::Diagnostic)
            }
        };

        ChainFetch {
            tokens,
            source,
            attempts: chain.attempts,
        }
    }
}
