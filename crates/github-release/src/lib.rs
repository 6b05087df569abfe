//! GitHub releases adapter for dockmatrix.

pub mod client;
pub mod config;
pub mod error;

pub use client::{GithubReleaseClient, API_VERSION, USER_AGENT};
pub use config::{GithubConfig, DEFAULT_API_URL};
pub use error::{GithubError, Result};
