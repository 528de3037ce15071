//! Download of resolved asset URLs.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;

use crate::error::{RemoteError, Result, ServiceKind};

const KIND: ServiceKind = ServiceKind::AssetFetch;

/// Fetches the raw bytes behind a URL.
#[async_trait]
pub trait AssetFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Bytes>;
}

pub struct HttpAssetFetcher {
    client: Client,
}

impl HttpAssetFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RemoteError::Internal(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl AssetFetcher for HttpAssetFetcher {
    async fn fetch(&self, url: &str) -> Result<Bytes> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| RemoteError::transport(KIND, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RemoteError::status(
                KIND,
                status.as_u16(),
                format!("failed to download {url}"),
            ));
        }

        let data = response
            .bytes()
            .await
            .map_err(|e| RemoteError::transport(KIND, e))?;
        if data.is_empty() {
            return Err(RemoteError::EmptyResponse(KIND));
        }
        tracing::debug!(url, bytes = data.len(), "Asset downloaded");
        Ok(data)
    }
}
