//! GitHub settings as provided to a workflow step.

use serde::{Deserialize, Serialize};

use crate::error::{GithubError, Result};

pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Release API settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GithubConfig {
    pub api_url: String,
    /// `owner/repo`
    pub repository: Option<String>,
    #[serde(skip_serializing)]
    pub token: Option<String>,
    /// Explicit release target.
    pub commitish: Option<String>,
    /// Commit the workflow runs for.
    pub sha: Option<String>,
}

impl GithubConfig {
    /// Read the workflow environment.
    ///
    /// `INPUT_TOKEN` (falling back to `GITHUB_TOKEN`), `GITHUB_REPOSITORY`,
    /// `GITHUB_API_URL`, `INPUT_COMMITISH` and `GITHUB_SHA`. Blank values
    /// count as unset.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        GithubConfig {
            api_url: get("GITHUB_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            repository: get("GITHUB_REPOSITORY"),
            token: get("INPUT_TOKEN").or_else(|| get("GITHUB_TOKEN")),
            commitish: get("INPUT_COMMITISH"),
            sha: get("GITHUB_SHA"),
        }
    }

    pub fn with_token(mut self, token: &str) -> Self {
        self.token = Some(token.to_string());
        self
    }

    pub fn with_repository(mut self, repository: &str) -> Self {
        self.repository = Some(repository.to_string());
        self
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    pub fn owner_repo(&self) -> Result<(&str, &str)> {
        let repository = self
            .repository
            .as_deref()
            .ok_or(GithubError::MissingRepository)?;

        match repository.split_once('/') {
            Some((owner, repo))
                if !owner.is_empty() && !repo.is_empty() && !repo.contains('/') =>
            {
                Ok((owner, repo))
            }
            _ => Err(GithubError::InvalidRepository(repository.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn reads_action_environment() {
        let config = GithubConfig::from_lookup(lookup(&[
            ("INPUT_TOKEN", "input-token"),
            ("GITHUB_TOKEN", "ambient-token"),
            ("GITHUB_REPOSITORY", "recognizebv/symfony-docker"),
            ("INPUT_COMMITISH", "main"),
            ("GITHUB_SHA", "abc123"),
        ]));

        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.token.as_deref(), Some("input-token"));
        assert_eq!(config.commitish.as_deref(), Some("main"));
        assert_eq!(config.sha.as_deref(), Some("abc123"));
        assert_eq!(
            config.owner_repo().unwrap(),
            ("recognizebv", "symfony-docker")
        );
    }

    #[test]
    fn blank_input_token_falls_back() {
        let config = GithubConfig::from_lookup(lookup(&[
            ("INPUT_TOKEN", ""),
            ("GITHUB_TOKEN", "ambient-token"),
        ]));
        assert_eq!(config.token.as_deref(), Some("ambient-token"));
    }

    #[test]
    fn empty_environment_has_no_token() {
        let config = GithubConfig::from_lookup(|_| None);
        assert!(!config.has_token());
        assert!(matches!(
            config.owner_repo(),
            Err(GithubError::MissingRepository)
        ));
    }

    #[test]
    fn malformed_repository_is_rejected() {
        for bad in ["symfony-docker", "/repo", "owner/", "a/b/c"] {
            let config = GithubConfig::default().with_repository(bad);
            assert!(
                matches!(config.owner_repo(), Err(GithubError::InvalidRepository(_))),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn token_is_never_serialized() {
        let config = GithubConfig::default().with_token("secret");
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("secret"));
    }
}
