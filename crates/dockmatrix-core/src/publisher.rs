//! Release publication for one primary version.
//!
//! A release is keyed by `php{version}`. It is created when absent and
//! overwritten in place otherwise; exactly one write happens per publish.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::domain::Result;
use crate::obs::{emit_release_published, emit_release_skipped};
use crate::ports::{ReleaseApi, ReleaseDraft};

/// Release tag for a normalized PHP version.
pub fn release_tag_name(version: &str) -> String {
    format!("php{version}")
}

/// Release body listing every produced image reference, one per line.
pub fn release_body(tag: &str, references: &[String]) -> String {
    format!("Available tags for `{tag}`:\n\n{}", references.join("\n"))
}

/// What a publish call did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum PublishOutcome {
    /// No credential configured.
    Skipped,
    Created { id: u64, tag: String },
    Updated { id: u64, tag: String },
}

/// Creates or updates release entries.
#[derive(Clone)]
pub struct ReleasePublisher {
    api: Option<Arc<dyn ReleaseApi>>,
    target_commitish: String,
}

impl ReleasePublisher {
    pub fn new(api: Arc<dyn ReleaseApi>, target_commitish: impl Into<String>) -> Self {
        Self {
            api: Some(api),
            target_commitish: target_commitish.into(),
        }
    }

    /// Publisher for runs without a release credential.
    pub fn disabled() -> Self {
        Self {
            api: None,
            target_commitish: String::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.api.is_some()
    }

    pub fn target_commitish(&self) -> &str {
        &self.target_commitish
    }

    pub async fn publish(&self, version: &str, references: &[String]) -> Result<PublishOutcome> {
        let tag = release_tag_name(version);

        let Some(api) = &self.api else {
            emit_release_skipped(&tag, "no release token configured");
            return Ok(PublishOutcome::Skipped);
        };

        let existing = match api.get_release_by_tag(&tag).await {
            Ok(release) => Some(release),
            Err(e) if e.is_not_found() => None,
            Err(e) => return Err(e),
        };

        let draft = ReleaseDraft {
            tag_name: tag.clone(),
            target_commitish: self.target_commitish.clone(),
            name: tag.clone(),
            body: release_body(&tag, references),
        };

        let outcome = match existing {
            None => {
                let created = api.create_release(&draft).await?;
                emit_release_published(&tag, "created", created.id);
                PublishOutcome::Created {
                    id: created.id,
                    tag,
                }
            }
            Some(release) => {
                let updated = api.update_release(release.id, &draft).await?;
                emit_release_published(&tag, "updated", updated.id);
                PublishOutcome::Updated {
                    id: updated.id,
                    tag,
                }
            }
        };

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::{MemoryReleaseApi, ReleaseCall};
    use crate::DockmatrixError;

    fn refs() -> Vec<String> {
        vec!["img:php8.2-node20".to_string(), "img:php8.2-node20-dev".to_string()]
    }

    #[test]
    fn body_lists_one_reference_per_line() {
        let body = release_body("php8.2", &refs());
        assert_eq!(
            body,
            "Available tags for `php8.2`:\n\nimg:php8.2-node20\nimg:php8.2-node20-dev"
        );
    }

    #[tokio::test]
    async fn disabled_publisher_skips() {
        let outcome = ReleasePublisher::disabled()
            .publish("8.2", &refs())
            .await
            .unwrap();
        assert_eq!(outcome, PublishOutcome::Skipped);
    }

    #[tokio::test]
    async fn missing_release_is_created() {
        let api = Arc::new(MemoryReleaseApi::new());
        let publisher = ReleasePublisher::new(api.clone(), "abc123");

        let outcome = publisher.publish("8.2", &refs()).await.unwrap();
        assert_eq!(
            outcome,
            PublishOutcome::Created {
                id: 1,
                tag: "php8.2".into()
            }
        );

        let calls = api.calls();
        assert_eq!(calls[0], ReleaseCall::Lookup("php8.2".into()));
        match &calls[1] {
            ReleaseCall::Create(draft) => {
                assert_eq!(draft.target_commitish, "abc123");
                assert_eq!(draft.name, "php8.2");
            }
            other => panic!("expected create, got {other:?}"),
        }
        assert_eq!(api.write_count(), 1);
    }

    #[tokio::test]
    async fn existing_release_is_overwritten() {
        let api = Arc::new(MemoryReleaseApi::with_release(7, "php8.2", "old body"));
        let publisher = ReleasePublisher::new(api.clone(), "def456");

        let outcome = publisher.publish("8.2", &refs()).await.unwrap();
        assert_eq!(
            outcome,
            PublishOutcome::Updated {
                id: 7,
                tag: "php8.2".into()
            }
        );

        let stored = &api.releases()[0];
        assert_eq!(stored.body.as_deref(), Some(release_body("php8.2", &refs()).as_str()));
        assert_eq!(stored.target_commitish.as_deref(), Some("def456"));
        assert_eq!(api.write_count(), 1);
    }

    #[tokio::test]
    async fn other_lookup_failures_propagate() {
        let api = Arc::new(MemoryReleaseApi::failing_lookup(401));
        let publisher = ReleasePublisher::new(api.clone(), "abc");

        let err = publisher.publish("8.2", &refs()).await.unwrap_err();
        assert!(matches!(
            err,
            DockmatrixError::ReleaseApi {
                status: Some(401),
                ..
            }
        ));
        assert_eq!(api.write_count(), 0);
    }
}
