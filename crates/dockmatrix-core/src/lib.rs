//! dockmatrix core library
//!
//! Selects upstream PHP and Node.js versions, expands them into a build
//! matrix, drives the builds and publishes one release per PHP version.
//! External systems sit behind the traits in [`ports`].

pub mod config;
pub mod domain;
pub mod executor;
pub mod fakes;
pub mod git;
pub mod obs;
pub mod pipeline;
pub mod ports;
pub mod publisher;
pub mod telemetry;

pub use config::{
    ReleaseConfig, DEFAULT_BASE_IMAGE, DEFAULT_IMAGE_NAME, DEFAULT_MIN_RUNTIME_MAJOR,
};

pub use domain::{
    collapse_to_highest_exact, compare_versions, drop_duplicate_tags, generate_matrix,
    generate_release_matrix, group_by_version, parse_major, select_lts_versions,
    select_primary_tags, tag_name, BuildDescriptor, DockmatrixError, FeatureFlag,
    FlagCombination, FlagSet, FlagState, LooseVersion, LtsLabel, MatrixOptions, Result,
    RuntimeRelease, SecondaryVersion, SelectionError, SelectionPolicy, TagMatch, TagPattern,
    Topology, VersionGroup, VersionTag, DEFAULT_TAG_PATTERN,
};

pub use executor::execute_matrix;
pub use git::{capture_head_sha, resolve_target_commitish};
pub use obs::{
    emit_build_failed, emit_build_finished, emit_build_started, emit_release_published,
    emit_release_skipped, emit_run_finished, emit_run_started, RunSpan,
};
pub use pipeline::{PlannedRelease, ReleasePipeline, ReleasePlan, ReleaseReport, RunReport};
pub use ports::{
    ImageBuilder, ReleaseApi, ReleaseDraft, ReleaseInfo, RuntimeIndex, TagList, TagSource,
};
pub use publisher::{release_body, release_tag_name, PublishOutcome, ReleasePublisher};
pub use telemetry::{init_tracing, level_for};

/// dockmatrix version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
