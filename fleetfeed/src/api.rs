//! Pull transport: a one-shot snapshot fetch over HTTP.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::types::ServerSnapshot;

/// One request/response snapshot fetch. No retry lives here — retrying is
/// the poll loop's periodic-tick responsibility.
#[async_trait]
pub trait SnapshotFetcher: Send + Sync {
    async fn fetch(&self) -> Result<Vec<ServerSnapshot>, FetchError>;
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("backend returned code {code}: {msg}")]
    Backend { code: i64, msg: String },
    #[error("invalid status endpoint: {0}")]
    Url(#[from] url::ParseError),
}

/// The backend wraps every REST payload in this envelope.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    code: i64,
    #[serde(default)]
    msg: String,
    #[serde(default)]
    data: Option<T>,
}

/// Fetcher for `GET {base}/api/server/statusInfo`.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    endpoint: Url,
}

impl HttpFetcher {
    pub fn new(base: &Url) -> Result<Self, FetchError> {
        let endpoint = base.join("/api/server/statusInfo")?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self { client, endpoint })
    }
}

#[async_trait]
impl SnapshotFetcher for HttpFetcher {
    async fn fetch(&self) -> Result<Vec<ServerSnapshot>, FetchError> {
        let response = self
            .client
            .get(self.endpoint.clone())
            .send()
            .await?
            .error_for_status()?;
        let envelope: Envelope<Vec<ServerSnapshot>> = response.json().await?;
        if envelope.code != 200 {
            return Err(FetchError::Backend {
                code: envelope.code,
                msg: envelope.msg,
            });
        }
        Ok(envelope.data.unwrap_or_default())
    }
}
