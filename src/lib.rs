mod chain;
mod config;
mod error;
mod ethereum;
mod fallback;
mod indexer;
mod solana;
mod transport;
mod tron;
mod types;

pub use chain::{ChainFetch, ChainKind, ChainProvider};
pub use config::{BalanceField, Config, EndpointConfig, SolanaConfig, SolanaEndpoint};
pub use error::FetchError;
pub use ethereum::EthereumProvider;
pub use fallback::{first_success, AttemptOutcome, AttemptReport, Candidate, Fallback, Resolution};
pub use indexer::TokenIndexer;
pub use solana::{synthetic_tokens, unavailable_token, SolanaProvider, BROWSER_HEADERS};
pub use transport::{Fetcher, Headers, HttpTransport, ReqwestTransport};
pub use tron::TronProvider;
pub use types::{IndexResult, Token, TokenSource};

use anyhow::Result;

/// Index the tokens held by `address` using the embedded configuration.
///
/// Upstream failures never surface here; only a broken configuration does.
pub async fn index_tokens(address: &str) -> Result<IndexResult> {
    let config = Config::load()?;
    let indexer = TokenIndexer::from_config(&config)?;
    Ok(indexer.index_tokens(address).await)
}
