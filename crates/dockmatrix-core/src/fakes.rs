//! In-memory fakes for the port traits (testing only)
//!
//! Provides `StaticTagSource`, `StaticRuntimeIndex`, `RecordingBuilder` and
//! `MemoryReleaseApi` that satisfy the trait contracts without network or
//! subprocess access.

use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::domain::{BuildDescriptor, DockmatrixError, Result, RuntimeRelease};
use crate::ports::*;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ---------------------------------------------------------------------------
// StaticTagSource
// ---------------------------------------------------------------------------

/// Tag source returning a fixed listing, or a fixed registry failure.
#[derive(Debug, Clone)]
pub struct StaticTagSource {
    listing: std::result::Result<TagList, String>,
}

impl StaticTagSource {
    pub fn new(name: &str, tags: &[&str]) -> Self {
        Self {
            listing: Ok(TagList {
                name: name.to_string(),
                tags: tags.iter().map(|t| t.to_string()).collect(),
            }),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            listing: Err(message.to_string()),
        }
    }
}

#[async_trait]
impl TagSource for StaticTagSource {
    async fn list_tags(&self) -> Result<TagList> {
        self.listing.clone().map_err(DockmatrixError::Registry)
    }
}

// ---------------------------------------------------------------------------
// StaticRuntimeIndex
// ---------------------------------------------------------------------------

/// Runtime index returning a fixed release list, or a fixed failure.
#[derive(Debug, Clone)]
pub struct StaticRuntimeIndex {
    releases: std::result::Result<Vec<RuntimeRelease>, String>,
}

impl StaticRuntimeIndex {
    pub fn new(releases: Vec<RuntimeRelease>) -> Self {
        Self {
            releases: Ok(releases),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            releases: Err(message.to_string()),
        }
    }
}

#[async_trait]
impl RuntimeIndex for StaticRuntimeIndex {
    async fn list_releases(&self) -> Result<Vec<RuntimeRelease>> {
        self.releases.clone().map_err(DockmatrixError::RuntimeIndex)
    }
}

// ---------------------------------------------------------------------------
// RecordingBuilder
// ---------------------------------------------------------------------------

/// Builder that records every descriptor it is asked to build.
///
/// Optionally fails the n-th invocation (1-based) with a given exit code.
#[derive(Debug, Default)]
pub struct RecordingBuilder {
    built: Mutex<Vec<BuildDescriptor>>,
    fail_at: Option<(usize, i32)>,
}

impl RecordingBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_at(invocation: usize, code: i32) -> Self {
        Self {
            built: Mutex::default(),
            fail_at: Some((invocation, code)),
        }
    }

    /// References of every invocation, including a failed one.
    pub fn invocations(&self) -> Vec<String> {
        lock(&self.built)
            .iter()
            .map(|d| d.image_reference().to_string())
            .collect()
    }
}

#[async_trait]
impl ImageBuilder for RecordingBuilder {
    async fn build(&self, descriptor: &BuildDescriptor) -> Result<String> {
        let count = {
            let mut built = lock(&self.built);
            built.push(descriptor.clone());
            built.len()
        };

        match self.fail_at {
            Some((invocation, code)) if invocation == count => Err(DockmatrixError::BuildFailed {
                reference: descriptor.image_reference().to_string(),
                code,
            }),
            _ => Ok(descriptor.image_reference().to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// MemoryReleaseApi
// ---------------------------------------------------------------------------

/// A call observed by [`MemoryReleaseApi`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReleaseCall {
    Lookup(String),
    Create(ReleaseDraft),
    Update(u64, ReleaseDraft),
}

/// In-memory release store keyed by tag name.
#[derive(Debug)]
pub struct MemoryReleaseApi {
    releases: Mutex<Vec<ReleaseInfo>>,
    calls: Mutex<Vec<ReleaseCall>>,
    next_id: Mutex<u64>,
    lookup_failure: Option<u16>,
}

impl Default for MemoryReleaseApi {
    fn default() -> Self {
        Self {
            releases: Mutex::default(),
            calls: Mutex::default(),
            next_id: Mutex::new(1),
            lookup_failure: None,
        }
    }
}

impl MemoryReleaseApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with one release.
    pub fn with_release(id: u64, tag_name: &str, body: &str) -> Self {
        let api = Self::default();
        lock(&api.releases).push(ReleaseInfo {
            id,
            tag_name: tag_name.to_string(),
            name: Some(tag_name.to_string()),
            body: Some(body.to_string()),
            target_commitish: Some("previous-sha".to_string()),
        });
        *lock(&api.next_id) = id + 1;
        api
    }

    /// Every lookup fails with the given HTTP status.
    pub fn failing_lookup(status: u16) -> Self {
        Self {
            lookup_failure: Some(status),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<ReleaseCall> {
        lock(&self.calls).clone()
    }

    pub fn releases(&self) -> Vec<ReleaseInfo> {
        lock(&self.releases).clone()
    }

    /// Number of create and update calls.
    pub fn write_count(&self) -> usize {
        lock(&self.calls)
            .iter()
            .filter(|c| !matches!(c, ReleaseCall::Lookup(_)))
            .count()
    }
}

#[async_trait]
impl ReleaseApi for MemoryReleaseApi {
    async fn get_release_by_tag(&self, tag: &str) -> Result<ReleaseInfo> {
        lock(&self.calls).push(ReleaseCall::Lookup(tag.to_string()));

        if let Some(status) = self.lookup_failure {
            return Err(DockmatrixError::release_status(status, "lookup failed"));
        }

        lock(&self.releases)
            .iter()
            .find(|r| r.tag_name == tag)
            .cloned()
            .ok_or_else(|| DockmatrixError::release_status(404, "Not Found"))
    }

    async fn create_release(&self, draft: &ReleaseDraft) -> Result<ReleaseInfo> {
        lock(&self.calls).push(ReleaseCall::Create(draft.clone()));

        let id = {
            let mut next = lock(&self.next_id);
            let id = *next;
            *next += 1;
            id
        };
        let release = ReleaseInfo {
            id,
            tag_name: draft.tag_name.clone(),
            name: Some(draft.name.clone()),
            body: Some(draft.body.clone()),
            target_commitish: Some(draft.target_commitish.clone()),
        };
        lock(&self.releases).push(release.clone());
        Ok(release)
    }

    async fn update_release(&self, id: u64, draft: &ReleaseDraft) -> Result<ReleaseInfo> {
        lock(&self.calls).push(ReleaseCall::Update(id, draft.clone()));

        let mut releases = lock(&self.releases);
        let release = releases
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| DockmatrixError::release_status(404, "Not Found"))?;

        release.tag_name = draft.tag_name.clone();
        release.name = Some(draft.name.clone());
        release.body = Some(draft.body.clone());
        release.target_commitish = Some(draft.target_commitish.clone());
        Ok(release.clone())
    }
}
