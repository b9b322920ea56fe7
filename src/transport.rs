use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{classify, FetchError};

/// Request headers as `(name, value)` pairs
pub type Headers = [(&'static str, &'static str)];

/// Minimal HTTP seam used by every provider. Swap it out to test without a network.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// GET `url` and return the decoded JSON body. Non-2xx statuses are errors.
    async fn get_json(&self, url: &str, headers: &Headers) -> Result<Value, FetchError>;
}

/// [`HttpTransport`] backed by a shared `reqwest` client
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get_json(&self, url: &str, headers: &Headers) -> Result<Value, FetchError> {
        let mut request = self.client.get(url);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }

        let response = request.send().await.map_err(classify)?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let body = response.bytes().await.map_err(classify)?;
        Ok(serde_json::from_slice(&body)?)
    }
}

/// A transport plus the per-attempt timeout. Every provider request goes through here.
#[derive(Clone)]
pub struct Fetcher {
    transport: Arc<dyn HttpTransport>,
    timeout: Duration,
}

impl Fetcher {
    pub fn new(transport: Arc<dyn HttpTransport>, timeout: Duration) -> Self {
        Self { transport, timeout }
    }

    /// One bounded, cancellable GET decoded into `T`
    pub async fn get<T: DeserializeOwned>(
        &self,
        url: &str,
        headers: &Headers,
        cancel: &CancellationToken,
    ) -> Result<T, FetchError> {
        debug!("GET {}", url);
        let request = tokio::time::timeout(self.timeout, self.transport.get_json(url, headers));

        let value = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(FetchError::Cancelled),
            outcome = request => outcome.map_err(|_| FetchError::Timeout)??,
        };

        Ok(serde_json::from_value(value)?)
    }
}
