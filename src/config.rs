use std::path::Path;
use std::time::Duration;

use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};

/// Environment variable overriding the Ethplorer API key
pub const ETHPLORER_API_KEY_ENV: &str = "ETHPLORER_API_KEY";
/// Environment variable overriding the per-request timeout, in seconds
pub const TIMEOUT_ENV: &str = "TOKEN_INDEXER_TIMEOUT_SECS";

/// Upstream endpoints and limits for every supported chain
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    pub request_timeout_secs: u64,
    pub ethereum: EndpointConfig,
    pub solana: SolanaConfig,
    pub tron: EndpointConfig,
}

/// A single upstream. `url` may contain `{address}` and `{apiKey}` placeholders.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointConfig {
    pub name: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl EndpointConfig {
    pub fn render(&self, address: &str) -> String {
        render_url(&self.url, address, self.api_key.as_deref())
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SolanaConfig {
    /// Tried in this order
    pub endpoints: Vec<SolanaEndpoint>,
    /// Substitute demonstration data when every endpoint comes up empty
    #[serde(default = "default_true")]
    pub synthetic_fallback: bool,
}

/// One candidate in the Solana fallback chain
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SolanaEndpoint {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub balance_field: BalanceField,
}

impl SolanaEndpoint {
    pub fn render(&self, address: &str) -> String {
        render_url(&self.url, address, None)
    }
}

/// Which string field of a token entry carries its balance
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BalanceField {
    #[default]
    Balance,
    Amount,
}

fn default_true() -> bool {
    true
}

fn render_url(template: &str, address: &str, api_key: Option<&str>) -> String {
    let url = template.replace("{address}", address);
    match api_key {
        Some(key) => url.replace("{apiKey}", key),
        None => url,
    }
}

impl Config {
    /// Load configuration from embedded JSON, then apply environment overrides
    pub fn load() -> Result<Self> {
        let mut config = Self::embedded()?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// The configuration shipped with the crate, without overrides
    pub fn embedded() -> Result<Self> {
        Self::from_json(include_str!("../config.json"))
    }

    /// Load configuration from a JSON file, then apply environment overrides
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_file_with(path, |key| std::env::var(key).ok())
    }

    pub(crate) fn from_file_with(
        path: impl AsRef<Path>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let mut config = Self::from_json(&raw)
            .with_context(|| format!("invalid config file {}", path.display()))?;
        config.apply_overrides(lookup)?;
        Ok(config)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub(crate) fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<()> {
        if let Some(key) = lookup(ETHPLORER_API_KEY_ENV) {
            self.ethereum.api_key = Some(key);
        }
        if let Some(secs) = lookup(TIMEOUT_ENV) {
            self.request_timeout_secs = secs
                .trim()
                .parse()
                .with_context(|| format!("{TIMEOUT_ENV} must be a whole number of seconds"))?;
        }
        self.validate()
    }

    fn validate(&self) -> Result<()> {
        ensure!(
            self.request_timeout_secs > 0,
            "requestTimeoutSecs must be greater than zero"
        );
        Ok(())
    }
}
