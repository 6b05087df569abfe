//! REST client for repository releases.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::{Method, RequestBuilder};
use serde::Deserialize;
use tracing::debug;

use dockmatrix_core::{ReleaseApi, ReleaseDraft, ReleaseInfo};

use crate::config::GithubConfig;
use crate::error::{GithubError, Result};

pub const API_VERSION: &str = "2022-11-28";
pub const USER_AGENT: &str = concat!("dockmatrix/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Deserialize)]
struct ApiMessage {
    message: String,
}

/// `ReleaseApi` over `/repos/{owner}/{repo}/releases`.
pub struct GithubReleaseClient {
    releases_url: String,
    token: String,
    http_client: reqwest::Client,
}

impl GithubReleaseClient {
    pub fn new(config: &GithubConfig) -> Result<Self> {
        let token = config.token.clone().ok_or(GithubError::MissingToken)?;
        let (owner, repo) = config.owner_repo()?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert("x-github-api-version", HeaderValue::from_static(API_VERSION));

        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()
            .map_err(|e| GithubError::Client(e.to_string()))?;

        Ok(GithubReleaseClient {
            releases_url: format!(
                "{}/repos/{owner}/{repo}/releases",
                config.api_url.trim_end_matches('/')
            ),
            token,
            http_client,
        })
    }

    pub fn releases_url(&self) -> &str {
        &self.releases_url
    }

    pub fn release_by_tag_url(&self, tag: &str) -> String {
        format!("{}/tags/{tag}", self.releases_url)
    }

    pub fn release_url(&self, id: u64) -> String {
        format!("{}/{id}", self.releases_url)
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.http_client
            .request(method, url)
            .bearer_auth(&self.token)
    }

    async fn send(&self, url: &str, request: RequestBuilder) -> Result<ReleaseInfo> {
        let response = request.send().await.map_err(|source| GithubError::Request {
            url: url.to_string(),
            source,
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|source| GithubError::Request {
            url: url.to_string(),
            source,
        })?;
        debug!(url = %url, status = status.as_u16(), "GitHub API response");

        if !status.is_success() {
            let message = serde_json::from_str::<ApiMessage>(&body)
                .map(|m| m.message)
                .unwrap_or_else(|_| status.canonical_reason().unwrap_or("error").to_string());
            return Err(GithubError::Api {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_str(&body).map_err(|e| GithubError::Decode {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }

    pub async fn fetch_by_tag(&self, tag: &str) -> Result<ReleaseInfo> {
        let url = self.release_by_tag_url(tag);
        self.send(&url, self.request(Method::GET, &url)).await
    }

    pub async fn create(&self, draft: &ReleaseDraft) -> Result<ReleaseInfo> {
        let url = self.releases_url.clone();
        self.send(&url, self.request(Method::POST, &url).json(draft))
            .await
    }

    pub async fn update(&self, id: u64, draft: &ReleaseDraft) -> Result<ReleaseInfo> {
        let url = self.release_url(id);
        self.send(&url, self.request(Method::PATCH, &url).json(draft))
            .await
    }
}

#[async_trait]
impl ReleaseApi for GithubReleaseClient {
    async fn get_release_by_tag(&self, tag: &str) -> dockmatrix_core::Result<ReleaseInfo> {
        Ok(self.fetch_by_tag(tag).await?)
    }

    async fn create_release(&self, draft: &ReleaseDraft) -> dockmatrix_core::Result<ReleaseInfo> {
        Ok(self.create(draft).await?)
    }

    async fn update_release(
        &self,
        id: u64,
        draft: &ReleaseDraft,
    ) -> dockmatrix_core::Result<ReleaseInfo> {
        Ok(self.update(id, draft).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> GithubConfig {
        GithubConfig {
            api_url: "https://api.github.com/".into(),
            ..GithubConfig::default()
        }
        .with_token("t")
        .with_repository("recognizebv/symfony-docker")
    }

    #[test]
    fn urls_follow_rest_layout() {
        let client = GithubReleaseClient::new(&config()).unwrap();
        assert_eq!(
            client.releases_url(),
            "https://api.github.com/repos/recognizebv/symfony-docker/releases"
        );
        assert_eq!(
            client.release_by_tag_url("php8.2"),
            "https://api.github.com/repos/recognizebv/symfony-docker/releases/tags/php8.2"
        );
        assert_eq!(
            client.release_url(42),
            "https://api.github.com/repos/recognizebv/symfony-docker/releases/42"
        );
    }

    #[test]
    fn token_is_required() {
        let mut config = config();
        config.token = None;
        assert!(matches!(
            GithubReleaseClient::new(&config),
            Err(GithubError::MissingToken)
        ));
    }
}
