//! Node.js release index client.

use async_trait::async_trait;
use tracing::debug;

use dockmatrix_core::{RuntimeIndex, RuntimeRelease};

use crate::error::{IndexError, Result};
use crate::http_client;

pub const DEFAULT_NODE_INDEX_URL: &str = "https://nodejs.org/dist/index.json";

/// Decode the index body. Fields other than `version` and `lts` are ignored.
pub fn parse_index(url: &str, body: &str) -> Result<Vec<RuntimeRelease>> {
    serde_json::from_str(body).map_err(|e| IndexError::Decode {
        url: url.to_string(),
        reason: e.to_string(),
    })
}

/// `RuntimeIndex` over the published Node.js distribution index.
pub struct NodeIndexClient {
    url: String,
    http_client: reqwest::Client,
}

impl NodeIndexClient {
    pub fn new(url: impl Into<String>) -> Result<Self> {
        Ok(NodeIndexClient {
            url: url.into(),
            http_client: http_client()?,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn fetch_releases(&self) -> Result<Vec<RuntimeRelease>> {
        let response = self
            .http_client
            .get(&self.url)
            .send()
            .await
            .map_err(|source| IndexError::Request {
                url: self.url.clone(),
                source,
            })?;

        if !response.status().is_success() {
            return Err(IndexError::Status {
                url: self.url.clone(),
                status: response.status().as_u16(),
            });
        }

        let body = response.text().await.map_err(|source| IndexError::Request {
            url: self.url.clone(),
            source,
        })?;
        let releases = parse_index(&self.url, &body)?;
        debug!(url = %self.url, releases = releases.len(), "Fetched runtime index");
        Ok(releases)
    }
}

#[async_trait]
impl RuntimeIndex for NodeIndexClient {
    async fn list_releases(&self) -> dockmatrix_core::Result<Vec<RuntimeRelease>> {
        self.fetch_releases()
            .await
            .map_err(IndexError::into_runtime_index)
    }
}
