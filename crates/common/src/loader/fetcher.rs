use std::time::Duration;

use bytes::Bytes;
use reqwest::Client;

use super::FetchError;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Transport used by loaders to retrieve content.
#[async_trait::async_trait]
pub trait Fetcher: Send + Sync + 'static {
    /// Retrieve the full body at `url`.
    async fn fetch(&self, url: &str) -> Result<Bytes, FetchError>;

    /// Cheap accessibility check for `url`.
    async fn probe(&self, url: &str) -> Result<(), FetchError>;
}

/// [`Fetcher`] over HTTP(S). Anything that is not an `http(s)` URL is
///  read from the local filesystem.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    request_timeout: Duration,
    probe_timeout: Duration,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, FetchError> {
        Self::with_timeouts(DEFAULT_REQUEST_TIMEOUT, DEFAULT_PROBE_TIMEOUT)
    }

    pub fn with_timeouts(
        request_timeout: Duration,
        probe_timeout: Duration,
    ) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(concat!("ballot-media/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            request_timeout,
            probe_timeout,
        })
    }

    pub fn probe_timeout(&self) -> Duration {
        self.probe_timeout
    }
}

fn is_http(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

#[async_trait::async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Bytes, FetchError> {
        if !is_http(url) {
            let data = tokio::fs::read(url)
                .await
                .map_err(|e| FetchError::Io(format!("{}: {}", url, e)))?;
            return Ok(Bytes::from(data));
        }

        let response = self
            .client
            .get(url)
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(e, self.request_timeout))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        response
            .bytes()
            .await
            .map_err(|e| FetchError::from_reqwest(e, self.request_timeout))
    }

    async fn probe(&self, url: &str) -> Result<(), FetchError> {
        if !is_http(url) {
            return tokio::fs::metadata(url)
                .await
                .map(|_| ())
                .map_err(|e| FetchError::Io(format!("{}: {}", url, e)));
        }

        let request = self.client.head(url).send();
        let response = tokio::time::timeout(self.probe_timeout, request)
            .await
            .map_err(|_| FetchError::Timeout(self.probe_timeout))?
            .map_err(|e| FetchError::from_reqwest(e, self.probe_timeout))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(FetchError::Status(status.as_u16()))
        }
    }
}
