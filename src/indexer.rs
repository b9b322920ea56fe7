use std::sync::Arc;

use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::chain::{ChainKind, ChainProvider};
use crate::config::Config;
use crate::ethereum::EthereumProvider;
use crate::solana::SolanaProvider;
use crate::transport::{Fetcher, HttpTransport, ReqwestTransport};
use crate::tron::TronProvider;
use crate::types::IndexResult;

/// Routes an address to the provider for its chain.
///
/// Each call is independent: nothing is cached between lookups and all upstream
/// requests of a single lookup run strictly one after another.
pub struct TokenIndexer {
    ethereum: Box<dyn ChainProvider>,
    solana: Box<dyn ChainProvider>,
    tron: Box<dyn ChainProvider>,
}

impl TokenIndexer {
    pub fn new(
        ethereum: Box<dyn ChainProvider>,
        solana: Box<dyn ChainProvider>,
        tron: Box<dyn ChainProvider>,
    ) -> Self {
        Self {
            ethereum,
            solana,
            tron,
        }
    }

    /// Providers for every chain, talking HTTP through `reqwest`
    pub fn from_config(config: &Config) -> Result<Self> {
        let transport = ReqwestTransport::new(config.request_timeout())?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    /// Providers for every chain sharing one transport
    pub fn with_transport(config: &Config, transport: Arc<dyn HttpTransport>) -> Self {
        let fetcher = Fetcher::new(transport, config.request_timeout());
        Self::new(
            Box::new(EthereumProvider::new(config.ethereum.clone(), fetcher.clone())),
            Box::new(SolanaProvider::new(config.solana.clone(), fetcher.clone())),
            Box::new(TronProvider::new(config.tron.clone(), fetcher)),
        )
    }

    pub fn provider(&self, chain: ChainKind) -> &dyn ChainProvider {
        match chain {
            ChainKind::Ethereum => self.ethereum.as_ref(),
            ChainKind::Solana => self.solana.as_ref(),
            ChainKind::Tron => self.tron.as_ref(),
        }
    }

    /// Look up the token holdings of `address` on its detected chain
    pub async fn index_tokens(&self, address: &str) -> IndexResult {
        self.index_tokens_with_cancel(address, &CancellationToken::new())
            .await
    }

    /// Like [`index_tokens`](Self::index_tokens), but stops early once `cancel` fires.
    /// A cancelled lookup comes back with every slot empty.
    pub async fn index_tokens_with_cancel(
        &self,
        address: &str,
        cancel: &CancellationToken,
    ) -> IndexResult {
        let chain = ChainKind::detect(address);
        info!("Indexing {} address {}", chain, address);

        let fetch = self.provider(chain).fetch_tokens(address, cancel).await;
        IndexResult::for_chain(chain, fetch.tokens, fetch.source, fetch.attempts)
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::chain::ChainFetch;
    use crate::types::{Token, TokenSource};

    struct Fixed(ChainKind);

    #[async_trait]
    impl ChainProvider for Fixed {
        fn chain(&self) -> ChainKind {
            self.0
        }

        async fn fetch_tokens(&self, address: &str, _cancel: &CancellationToken) -> ChainFetch {
            ChainFetch::live(self.0.as_str(), vec![Token::new(address, "TKN", 1.0)])
        }
    }

    fn indexer() -> TokenIndexer {
        TokenIndexer::new(
            Box::new(Fixed(ChainKind::Ethereum)),
            Box::new(Fixed(ChainKind::Solana)),
            Box::new(Fixed(ChainKind::Tron)),
        )
    }

    #[tokio::test]
    async fn test_dispatches_to_exactly_one_provider() {
        let indexer = indexer();
        for (address, chain) in [
            ("0xabc", ChainKind::Ethereum),
            ("TXYZ", ChainKind::Tron),
            ("8vJ1EEeJBSX8UZetuHY7d2SiGjdw2AhfamzfxokPsCF4", ChainKind::Solana),
        ] {
            let result = indexer.index_tokens(address).await;
            assert_eq!(result.chain, chain);
            assert_eq!(result.populated_slots(), 1, "{address}");
            assert_eq!(result.tokens()[0].name, address);
            assert_eq!(
                result.source,
                TokenSource::Live {
                    provider: chain.as_str().to_string()
                }
            );
        }
    }

    #[test]
    fn test_provider_lookup() {
        let indexer = indexer();
        for chain in [ChainKind::Ethereum, ChainKind::Solana, ChainKind::Tron] {
            assert_eq!(indexer.provider(chain).chain(), chain);
        }
    }
}
