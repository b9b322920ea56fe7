use alloy::primitives::utils::format_units;
use alloy::primitives::U256;
use serde::{Deserialize, Serialize};

use crate::chain::ChainKind;
use crate::fallback::AttemptReport;

/// Unified token entry produced by every chain provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub name: String,
    pub symbol: String,
    pub balance: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mint: Option<String>,
    /// Set on diagnostic entries. The balance of such an entry is always 0 and carries no meaning.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Token {
    pub fn new(name: impl Into<String>, symbol: impl Into<String>, balance: f64) -> Self {
        Self {
            name: name.into(),
            symbol: symbol.into(),
            balance,
            mint: None,
            error: None,
        }
    }

    pub fn with_mint(mut self, mint: impl Into<String>) -> Self {
        self.mint = Some(mint.into());
        self
    }

    /// A placeholder entry signalling that no real balance could be obtained
    pub fn diagnostic(
        name: impl Into<String>,
        symbol: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            symbol: symbol.into(),
            balance: 0.0,
            mint: None,
            error: Some(error.into()),
        }
    }

    pub fn is_diagnostic(&self) -> bool {
        self.error.is_some()
    }
}

/// Which stage produced the tokens of an [`IndexResult`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum TokenSource {
    /// A real upstream answered. The token list may legitimately be empty.
    Live { provider: String },
    /// Fixed demonstration data substituted after every real provider failed
    Synthetic,
    /// A single error-bearing token stands in for the result
    Diagnostic,
    /// The only provider for the chain failed; no tokens are available
    Failed { reason: String },
    /// The caller aborted the lookup
    Cancelled,
}

impl TokenSource {
    pub fn is_live(&self) -> bool {
        matches!(self, Self::Live { .. })
    }
}

/// Result of a single lookup. Exactly one of the three token slots belongs to the
/// detected chain; the other two are always empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexResult {
    pub eth_tokens: Vec<Token>,
    pub sol_tokens: Vec<Token>,
    pub tron_tokens: Vec<Token>,
    pub chain: ChainKind,
    pub source: TokenSource,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attempts: Vec<AttemptReport>,
}

impl IndexResult {
    /// Place `tokens` in the slot for `chain`, leaving the other two empty
    pub fn for_chain(
        chain: ChainKind,
        tokens: Vec<Token>,
        source: TokenSource,
        attempts: Vec<AttemptReport>,
    ) -> Self {
        let mut result = Self {
            eth_tokens: Vec::new(),
            sol_tokens: Vec::new(),
            tron_tokens: Vec::new(),
            chain,
            source,
            attempts,
        };
        match chain {
            ChainKind::Ethereum => result.eth_tokens = tokens,
            ChainKind::Solana => result.sol_tokens = tokens,
            ChainKind::Tron => result.tron_tokens = tokens,
        }
        result
    }

    /// Tokens of the detected chain
    pub fn tokens(&self) -> &[Token] {
        match self.chain {
            ChainKind::Ethereum => &self.eth_tokens,
            ChainKind::Solana => &self.sol_tokens,
            ChainKind::Tron => &self.tron_tokens,
        }
    }

    /// Number of non-empty token slots
    pub fn populated_slots(&self) -> usize {
        [&self.eth_tokens, &self.sol_tokens, &self.tron_tokens]
            .iter()
            .filter(|slot| !slot.is_empty())
            .count()
    }
}

/// Numeric field that upstream APIs send either as a JSON number or as a string
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub(crate) enum RawAmount {
    Number(f64),
    Text(String),
}

impl RawAmount {
    /// Lossy float value. Unparseable or non-finite values (`"inf"`, `"NaN"`) count as zero.
    pub(crate) fn as_f64(&self) -> f64 {
        let value = match self {
            Self::Number(n) => *n,
            Self::Text(s) => s.trim().parse().unwrap_or(0.0),
        };
        if value.is_finite() {
            value
        } else {
            0.0
        }
    }

    pub(crate) fn as_decimals(&self) -> Option<u8> {
        match self {
            Self::Number(n) if n.fract() == 0.0 && (0.0..=255.0).contains(n) => Some(*n as u8),
            Self::Number(_) => None,
            Self::Text(s) => s.trim().parse().ok(),
        }
    }

    /// Divide a raw integer balance by `10^decimals`.
    ///
    /// Integer strings go through `U256` so large balances keep their precision until
    /// the final conversion; everything else falls back to float division.
    pub(crate) fn scale(&self, decimals: u8) -> f64 {
        if let Self::Text(s) = self {
            if let Ok(raw) = s.trim().parse::<U256>() {
                if let Some(value) = format_units(raw, decimals)
                    .ok()
                    .and_then(|formatted| formatted.parse::<f64>().ok())
                {
                    return value;
                }
            }
        }
        self.as_f64() / 10f64.powi(i32::from(decimals))
    }
}

/// `Token 1a2b3c4d...` style name for entries the upstream left unnamed
pub(crate) fn placeholder_name(id: &str) -> String {
    format!("Token {}...", truncate(id, 8))
}

/// `1a2b3c...` style symbol for entries the upstream left without a ticker
pub(crate) fn placeholder_symbol(id: &str) -> String {
    format!("{}...", truncate(id, 6))
}

fn truncate(id: &str, len: usize) -> String {
    id.chars().take(len).collect()
}

/// Treat empty strings the same as a missing field
pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
