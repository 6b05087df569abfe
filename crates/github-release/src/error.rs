//! Error types for github-release

use dockmatrix_core::DockmatrixError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GithubError {
    #[error("no release token configured")]
    MissingToken,

    #[error("GITHUB_REPOSITORY is not set")]
    MissingRepository,

    #[error("repository {0:?} is not in owner/repo form")]
    InvalidRepository(String),

    #[error("HTTP client error: {0}")]
    Client(String),

    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Non-success response; `message` is GitHub's error message when present.
    #[error("GitHub API returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("could not decode response from {url}: {reason}")]
    Decode { url: String, reason: String },
}

impl From<GithubError> for DockmatrixError {
    fn from(err: GithubError) -> Self {
        match err {
            GithubError::Api { status, message } => DockmatrixError::release_status(status, message),
            other => DockmatrixError::ReleaseApi {
                status: None,
                message: other.to_string(),
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, GithubError>;
