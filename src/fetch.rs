use reqwest::{Client, StatusCode};
use tokio_util::sync::CancellationToken;

use crate::config::FetchConfig;
use crate::error::{Error, Result};

/// Buffered HTTP GET used for both the post page and the image.
///
/// There are no retries. Redirects are followed as `reqwest` does by default.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let mut builder = Client::builder().user_agent(config.user_agent.as_str());
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(Error::Client)?;
        Ok(Self { client })
    }

    /// GET `url` and return the whole body.
    ///
    /// Fails with [`Error::Cancelled`] as soon as `cancel` fires, whether the
    /// request is still connecting or the body is half read.
    pub async fn fetch(&self, cancel: &CancellationToken, url: &str) -> Result<Vec<u8>> {
        log::debug!("Fetch URL {url}");

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                log::debug!("Fetch of {url} cancelled");
                Err(Error::Cancelled { url: url.to_string() })
            }
            result = self.get(url) => result,
        }
    }

    async fn get(&self, url: &str) -> Result<Vec<u8>> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| Error::Network {
                url: url.to_string(),
                source,
            })?;

        let status = resp.status();
        if status != StatusCode::OK {
            return Err(Error::HttpStatus {
                url: url.to_string(),
                status,
            });
        }

        let body = resp.bytes().await.map_err(|source| Error::Read {
            url: url.to_string(),
            source,
        })?;

        log::debug!("Fetched {} bytes from {url}", body.len());
        Ok(body.to_vec())
    }
}
