//! Error types for upstream-index

use dockmatrix_core::DockmatrixError;
use thiserror::Error;

/// Errors talking to the registry or the runtime release index.
#[derive(Error, Debug)]
pub enum IndexError {
    /// HTTP client could not be constructed
    #[error("HTTP client error: {0}")]
    Client(String),

    /// Transport-level failure
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Non-success HTTP status
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    /// Token endpoint answered without a token
    #[error("token response from {url} carried no token")]
    MissingToken { url: String },

    /// Body was not the expected JSON
    #[error("could not decode response from {url}: {reason}")]
    Decode { url: String, reason: String },

    /// Pagination link or configured URL is malformed
    #[error("invalid URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },
}

impl IndexError {
    pub fn into_registry(self) -> DockmatrixError {
        DockmatrixError::Registry(self.to_string())
    }

    pub fn into_runtime_index(self) -> DockmatrixError {
        DockmatrixError::RuntimeIndex(self.to_string())
    }
}

pub type Result<T> = std::result::Result<T, IndexError>;
