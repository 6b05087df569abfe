//! Docker Registry HTTP API v2 tag listing.
//!
//! Anonymous pull token first, then `GET /v2/{repository}/tags/list`,
//! following `Link: <...>; rel="next"` until the listing is exhausted.

use std::collections::HashSet;

use async_trait::async_trait;
use reqwest::header::LINK;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use dockmatrix_core::{TagList, TagSource};

use crate::error::{IndexError, Result};
use crate::http_client;

pub const DEFAULT_REGISTRY_URL: &str = "https://registry-1.docker.io";
pub const DEFAULT_AUTH_URL: &str = "https://auth.docker.io/token";
pub const DEFAULT_SERVICE: &str = "registry.docker.io";
pub const DEFAULT_REPOSITORY: &str = "library/php";

/// Where the upstream tags live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
    pub registry_url: String,
    /// Token endpoint; `None` for registries that allow anonymous listing.
    pub auth_url: Option<String>,
    pub service: String,
    pub repository: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        RegistryConfig {
            registry_url: DEFAULT_REGISTRY_URL.to_string(),
            auth_url: Some(DEFAULT_AUTH_URL.to_string()),
            service: DEFAULT_SERVICE.to_string(),
            repository: DEFAULT_REPOSITORY.to_string(),
        }
    }
}

impl RegistryConfig {
    /// Docker Hub config for an image name; official images live under
    /// `library/`.
    pub fn docker_hub(image: &str) -> Self {
        let repository = if image.contains('/') {
            image.to_string()
        } else {
            format!("library/{image}")
        };
        RegistryConfig {
            repository,
            ..Self::default()
        }
    }

    pub fn tags_url(&self) -> String {
        format!(
            "{}/v2/{}/tags/list",
            self.registry_url.trim_end_matches('/'),
            self.repository
        )
    }

    pub fn token_url(&self) -> Option<String> {
        self.auth_url.as_ref().map(|auth| {
            format!(
                "{auth}?service={}&scope=repository:{}:pull",
                self.service, self.repository
            )
        })
    }
}

/// Extract the `rel="next"` target from a `Link` header value.
pub fn parse_next_link(header: &str) -> Option<String> {
    header.split(',').find_map(|entry| {
        let mut parts = entry.split(';');
        let target = parts.next()?.trim();
        let is_next = parts.any(|param| {
            let param = param.trim();
            param == "rel=\"next\"" || param == "rel=next"
        });
        if !is_next {
            return None;
        }
        target
            .strip_prefix('<')
            .and_then(|t| t.strip_suffix('>'))
            .map(str::to_string)
    })
}

fn resolve_link(current: &str, link: &str) -> Result<String> {
    let base = Url::parse(current).map_err(|e| IndexError::InvalidUrl {
        url: current.to_string(),
        reason: e.to_string(),
    })?;
    base.join(link)
        .map(String::from)
        .map_err(|e| IndexError::InvalidUrl {
            url: link.to_string(),
            reason: e.to_string(),
        })
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    access_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TagPage {
    name: String,
    #[serde(default)]
    tags: Option<Vec<String>>,
}

/// `TagSource` over a v2 registry.
pub struct RegistryTagSource {
    config: RegistryConfig,
    http_client: reqwest::Client,
}

impl RegistryTagSource {
    pub fn new(config: RegistryConfig) -> Result<Self> {
        Ok(RegistryTagSource {
            config,
            http_client: http_client()?,
        })
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    async fn get(&self, url: &str, token: Option<&str>) -> Result<reqwest::Response> {
        let mut request = self.http_client.get(url);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await.map_err(|source| IndexError::Request {
            url: url.to_string(),
            source,
        })?;

        if !response.status().is_success() {
            return Err(IndexError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }
        Ok(response)
    }

    async fn fetch_token(&self) -> Result<Option<String>> {
        let Some(url) = self.config.token_url() else {
            return Ok(None);
        };

        let body: TokenResponse =
            self.get(&url, None)
                .await?
                .json()
                .await
                .map_err(|e| IndexError::Decode {
                    url: url.clone(),
                    reason: e.to_string(),
                })?;

        body.token
            .or(body.access_token)
            .filter(|t| !t.is_empty())
            .map(Some)
            .ok_or(IndexError::MissingToken { url })
    }

    /// Every tag of the configured repository, in registry order.
    pub async fn fetch_tags(&self) -> Result<TagList> {
        let token = self.fetch_token().await?;

        let mut url = self.config.tags_url();
        let mut name = None;
        let mut tags = Vec::new();
        let mut visited = HashSet::from([url.clone()]);

        loop {
            let response = self.get(&url, token.as_deref()).await?;
            let next = response
                .headers()
                .get(LINK)
                .and_then(|value| value.to_str().ok())
                .and_then(parse_next_link);

            let page: TagPage = response.json().await.map_err(|e| IndexError::Decode {
                url: url.clone(),
                reason: e.to_string(),
            })?;
            debug!(url = %url, tags = page.tags.as_ref().map_or(0, Vec::len), "Fetched tag page");

            name.get_or_insert(page.name);
            tags.extend(page.tags.unwrap_or_default());

            match next {
                Some(link) => {
                    let next_url = resolve_link(&url, &link)?;
                    if !visited.insert(next_url.clone()) {
                        warn!(url = %next_url, "Tag listing links back to a visited page, stopping");
                        break;
                    }
                    url = next_url;
                }
                None => break,
            }
        }

        Ok(TagList {
            name: name.unwrap_or_else(|| self.config.repository.clone()),
            tags,
        })
    }
}

#[async_trait]
impl TagSource for RegistryTagSource {
    async fn list_tags(&self) -> dockmatrix_core::Result<TagList> {
        self.fetch_tags().await.map_err(IndexError::into_registry)
    }
}
