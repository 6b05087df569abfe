//! Release run orchestration.
//!
//! Selector → matrix → sequential builds → publish, for every selected
//! primary version. Everything is fetched and planned before the first build
//! starts; a failed build aborts the run before anything else is published.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn, Instrument};
use uuid::Uuid;

use crate::config::ReleaseConfig;
use crate::domain::{
    collapse_to_highest_exact, drop_duplicate_tags, generate_release_matrix, group_by_version,
    select_lts_versions, select_primary_tags, BuildDescriptor, Result, SecondaryVersion,
};
use crate::executor::execute_matrix;
use crate::obs::{emit_run_finished, emit_run_started, RunSpan};
use crate::ports::{ImageBuilder, RuntimeIndex, TagSource};
use crate::publisher::{release_tag_name, PublishOutcome, ReleasePublisher};

/// Builds planned for one primary version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedRelease {
    pub version: String,
    pub descriptors: Vec<BuildDescriptor>,
}

/// Everything a run would build, derived without side effects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleasePlan {
    pub runtimes: Vec<SecondaryVersion>,
    pub releases: Vec<PlannedRelease>,
}

impl ReleasePlan {
    pub fn build_count(&self) -> usize {
        self.releases.iter().map(|r| r.descriptors.len()).sum()
    }
}

/// Outcome for one primary version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseReport {
    pub version: String,
    pub tag: String,
    /// Produced image references in completion order.
    pub images: Vec<String>,
    pub outcome: PublishOutcome,
}

/// Outcome of a complete run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub releases: Vec<ReleaseReport>,
}

impl RunReport {
    pub fn image_count(&self) -> usize {
        self.releases.iter().map(|r| r.images.len()).sum()
    }
}

/// Release pipeline wired to its external collaborators.
pub struct ReleasePipeline {
    config: ReleaseConfig,
    tag_source: Arc<dyn TagSource>,
    runtime_index: Arc<dyn RuntimeIndex>,
    builder: Arc<dyn ImageBuilder>,
    publisher: ReleasePublisher,
}

impl ReleasePipeline {
    pub fn new(
        config: ReleaseConfig,
        tag_source: Arc<dyn TagSource>,
        runtime_index: Arc<dyn RuntimeIndex>,
        builder: Arc<dyn ImageBuilder>,
        publisher: ReleasePublisher,
    ) -> Self {
        Self {
            config,
            tag_source,
            runtime_index,
            builder,
            publisher,
        }
    }

    /// Fetch upstream data and derive every descriptor of the run.
    pub async fn plan(&self) -> Result<ReleasePlan> {
        let pattern = self.config.compile_pattern()?;

        let listing = self.tag_source.list_tags().await?;
        info!(
            repository = %listing.name,
            tags = listing.tags.len(),
            "Fetched upstream tags"
        );

        let mut primary = select_primary_tags(&pattern, &listing.tags);
        if self.config.collapse_exact {
            primary = collapse_to_highest_exact(primary);
        }
        let primary = drop_duplicate_tags(primary);
        let groups = self.config.selection.apply(group_by_version(primary));
        if groups.is_empty() {
            warn!(pattern = %pattern.as_str(), "No upstream tag matched the pattern");
        }

        let releases = self.runtime_index.list_releases().await?;
        let runtimes = select_lts_versions(&releases, self.config.min_runtime_major);
        info!(
            runtimes = ?runtimes.iter().map(|r| r.full_version.as_str()).collect::<Vec<_>>(),
            "Selected Node.js LTS versions"
        );

        let options = self.config.matrix_options();
        let releases = groups
            .into_iter()
            .map(|group| PlannedRelease {
                descriptors: generate_release_matrix(
                    &options,
                    &group.tags,
                    &runtimes,
                    &self.config.flags,
                ),
                version: group.version,
            })
            .collect();

        Ok(ReleasePlan { runtimes, releases })
    }

    /// Plan, build and publish.
    pub async fn run(&self) -> Result<RunReport> {
        let run_id = Uuid::new_v4();
        let span = RunSpan::new(&run_id.to_string());
        self.execute(run_id).instrument(span.span().clone()).await
    }

    async fn execute(&self, run_id: Uuid) -> Result<RunReport> {
        let started_at = Utc::now();
        let start = Instant::now();

        let plan = self.plan().await?;
        emit_run_started(&run_id.to_string(), plan.releases.len(), plan.build_count());

        let mut reports = Vec::with_capacity(plan.releases.len());
        for release in plan.releases {
            let tag = release_tag_name(&release.version);
            info!(release = %tag, builds = release.descriptors.len(), "Building images");

            let images = execute_matrix(self.builder.as_ref(), &release.descriptors).await?;
            info!(release = %tag, images = images.len(), "Done building images");

            let outcome = if images.is_empty() {
                warn!(release = %tag, "Nothing was built, not publishing");
                PublishOutcome::Skipped
            } else {
                self.publisher.publish(&release.version, &images).await?
            };

            reports.push(ReleaseReport {
                version: release.version,
                tag,
                images,
                outcome,
            });
        }

        let report = RunReport {
            run_id,
            started_at,
            finished_at: Utc::now(),
            releases: reports,
        };
        emit_run_finished(
            &run_id.to_string(),
            start.elapsed().as_millis() as u64,
            report.image_count(),
        );
        Ok(report)
    }
}
