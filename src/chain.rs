use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::error::FetchError;
use crate::fallback::AttemptReport;
use crate::types::{Token, TokenSource};

/// The supported networks. Always derived from an address, never stored on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainKind {
    Ethereum,
    Solana,
    Tron,
}

impl ChainKind {
    /// Classify an address by prefix. First match wins:
    /// `0x` is Ethereum, `T` is Tron, anything else is assumed to be Solana.
    ///
    /// This is a heuristic only; no checksum or length validation happens here.
    pub fn detect(address: &str) -> Self {
        if address.starts_with("0x") {
            Self::Ethereum
        } else if address.starts_with('T') {
            Self::Tron
        } else {
            Self::Solana
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ethereum => "ethereum",
            Self::Solana => "solana",
            Self::Tron => "tron",
        }
    }
}

impl fmt::Display for ChainKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a provider hands back for one address
#[derive(Debug, Clone, PartialEq)]
pub struct ChainFetch {
    pub tokens: Vec<Token>,
    pub source: TokenSource,
    pub attempts: Vec<AttemptReport>,
}

impl ChainFetch {
    /// A single successful attempt against `provider`
    pub fn live(provider: &str, tokens: Vec<Token>) -> Self {
        Self {
            attempts: vec![AttemptReport::tokens(provider, tokens.len())],
            tokens,
            source: TokenSource::Live {
                provider: provider.to_string(),
            },
        }
    }

    /// A single failed attempt against `provider`: no tokens at all
    pub fn failed(provider: &str, err: &FetchError) -> Self {
        let attempts = vec![AttemptReport::failed(provider, err)];
        if err.is_cancelled() {
            return Self::cancelled(attempts);
        }
        Self {
            tokens: Vec::new(),
            source: TokenSource::Failed {
                reason: format!("{provider}: {err}"),
            },
            attempts,
        }
    }

    pub fn cancelled(attempts: Vec<AttemptReport>) -> Self {
        Self {
            tokens: Vec::new(),
            source: TokenSource::Cancelled,
            attempts,
        }
    }
}

/// Trait for chain providers - implement this for each blockchain.
///
/// Implementations absorb every upstream failure: the worst case is an empty list
/// (or a diagnostic token) together with a non-live [`TokenSource`].
#[async_trait]
pub trait ChainProvider: Send + Sync {
    /// The chain this provider serves
    fn chain(&self) -> ChainKind;

    /// Fetch and normalize the fungible-token holdings of `address`
    async fn fetch_tokens(&self, address: &str, cancel: &CancellationToken) -> ChainFetch;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_ethereum() {
        for address in [
            "0x78697a9cfc48C1e9d1040172d51833EF78083b10",
            "0x",
            "0xnot-even-hex",
        ] {
            assert_eq!(ChainKind::detect(address), ChainKind::Ethereum, "{address}");
        }
    }

    #[test]
    fn test_detect_tron() {
        for address in ["TR7NHqjeKQxGTCi8q8ZY4pL8otSzgjLj6t", "T", "Tanything"] {
            assert_eq!(ChainKind::detect(address), ChainKind::Tron, "{address}");
        }
    }

    #[test]
    fn test_detect_defaults_to_solana() {
        for address in [
            "8vJ1EEeJBSX8UZetuHY7d2SiGjdw2AhfamzfxokPsCF4",
            "",
            "0X78697a9c",
            "t-lowercase",
            " 0x-leading-space",
        ] {
            assert_eq!(ChainKind::detect(address), ChainKind::Solana, "{address:?}");
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(ChainKind::Ethereum.to_string(), "ethereum");
        assert_eq!(
            serde_json::to_value(ChainKind::Solana).unwrap(),
            serde_json::json!("solana")
        );
    }
}
