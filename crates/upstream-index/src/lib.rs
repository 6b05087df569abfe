//! Upstream sources for dockmatrix
//!
//! - `RegistryTagSource`: tag listing over the Docker Registry HTTP API v2
//! - `NodeIndexClient`: the published Node.js release index

pub mod error;
pub mod node;
pub mod registry;

pub use error::{IndexError, Result};
pub use node::{parse_index, NodeIndexClient, DEFAULT_NODE_INDEX_URL};
pub use registry::{
    parse_next_link, RegistryConfig, RegistryTagSource, DEFAULT_AUTH_URL, DEFAULT_REGISTRY_URL,
    DEFAULT_REPOSITORY, DEFAULT_SERVICE,
};

/// User agent sent with every request.
pub const USER_AGENT: &str = concat!("dockmatrix/", env!("CARGO_PKG_VERSION"));

pub(crate) fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| IndexError::Client(e.to_string()))
}
