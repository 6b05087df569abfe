//! Structured observability hooks for release runs.
//!
//! - Run-scoped tracing span via the `RunSpan` guard
//! - Emission functions for build and publish lifecycle events
//!
//! Events are emitted at `info!` level unless noted; filter with `RUST_LOG`.

use tracing::{info, warn};

/// Guard holding a run-scoped span open.
///
/// The span is entered around each await point by the pipeline rather than
/// held across them.
pub struct RunSpan {
    span: tracing::Span,
}

impl RunSpan {
    pub fn new(run_id: &str) -> Self {
        Self {
            span: tracing::info_span!("dockmatrix.run", run_id = %run_id),
        }
    }

    pub fn span(&self) -> &tracing::Span {
        &self.span
    }
}

pub fn emit_run_started(run_id: &str, releases: usize, builds: usize) {
    info!(event = "run.started", run_id = %run_id, releases, builds);
}

pub fn emit_run_finished(run_id: &str, duration_ms: u64, images: usize) {
    info!(
        event = "run.finished",
        run_id = %run_id,
        duration_ms = duration_ms,
        images = images,
    );
}

/// Emit event: build `index` of `total` (1-based) started.
pub fn emit_build_started(reference: &str, index: usize, total: usize) {
    info!(event = "build.started", reference = %reference, index, total, "Building image");
}

pub fn emit_build_finished(reference: &str, duration_ms: u64) {
    info!(event = "build.finished", reference = %reference, duration_ms);
}

/// Emit event: build failed; the run aborts (warning level).
pub fn emit_build_failed(reference: &str, error: &dyn std::fmt::Display) {
    warn!(event = "build.failed", reference = %reference, error = %error);
}

pub fn emit_release_published(tag: &str, action: &str, release_id: u64) {
    info!(event = "release.published", tag = %tag, action = %action, release_id);
}

pub fn emit_release_skipped(tag: &str, reason: &str) {
    warn!(event = "release.skipped", tag = %tag, reason = %reason);
}
