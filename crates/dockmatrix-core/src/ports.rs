//! Port traits for the external systems a release run talks to.
//!
//! - `TagSource`: upstream registry tag listing
//! - `RuntimeIndex`: Node.js release index
//! - `ImageBuilder`: external build-and-push tool
//! - `ReleaseApi`: source-hosting release entries
//!
//! Adapters live in their own crates; in-memory fakes are provided for
//! testing via the `fakes` module.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{BuildDescriptor, Result, RuntimeRelease};

/// Tag listing of one repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagList {
    pub name: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[async_trait]
pub trait TagSource: Send + Sync {
    async fn list_tags(&self) -> Result<TagList>;
}

#[async_trait]
pub trait RuntimeIndex: Send + Sync {
    async fn list_releases(&self) -> Result<Vec<RuntimeRelease>>;
}

/// Builds and pushes one descriptor.
///
/// Returns the produced image reference. Implementations must not return
/// before the build has finished.
#[async_trait]
pub trait ImageBuilder: Send + Sync {
    async fn build(&self, descriptor: &BuildDescriptor) -> Result<String>;
}

/// A release entry as stored by the hosting service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseInfo {
    pub id: u64,
    pub tag_name: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub target_commitish: Option<String>,
}

/// Payload for creating or overwriting a release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseDraft {
    pub tag_name: String,
    pub target_commitish: String,
    pub name: String,
    pub body: String,
}

/// Release entry operations.
///
/// Semantics:
/// - `get_release_by_tag` fails with a 404 `ReleaseApi` error when absent.
/// - `update_release` overwrites target, name and body; nothing is merged.
#[async_trait]
pub trait ReleaseApi: Send + Sync {
    async fn get_release_by_tag(&self, tag: &str) -> Result<ReleaseInfo>;

    async fn create_release(&self, draft: &ReleaseDraft) -> Result<ReleaseInfo>;

    async fn update_release(&self, id: u64, draft: &ReleaseDraft) -> Result<ReleaseInfo>;
}
