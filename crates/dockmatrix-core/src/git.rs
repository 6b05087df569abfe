//! Git helpers for resolving the commit a release points at.

use std::path::Path;
use std::process::Command;

use crate::domain::error::{DockmatrixError, Result};

/// Capture the HEAD commit SHA of the repository containing `repo_dir`.
///
/// Runs `git rev-parse HEAD`. Fails outside a git work tree or when git is
/// not installed.
pub fn capture_head_sha(repo_dir: &Path) -> Result<String> {
    let output = Command::new("git")
        .args(["rev-parse", "HEAD"])
        .current_dir(repo_dir)
        .output()
        .map_err(|e| DockmatrixError::GitError(format!("failed to run git: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(DockmatrixError::GitError(format!(
            "git rev-parse HEAD failed: {stderr}"
        )));
    }

    let sha = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if sha.is_empty() {
        return Err(DockmatrixError::GitError(
            "git rev-parse HEAD returned empty output".to_string(),
        ));
    }

    Ok(sha)
}

/// Pick the release target: explicit override, then the CI-provided SHA,
/// then the checkout's HEAD. Blank values count as absent.
pub fn resolve_target_commitish(
    explicit: Option<&str>,
    ci_sha: Option<&str>,
    repo_dir: &Path,
) -> Result<String> {
    let given = [explicit, ci_sha]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|value| !value.is_empty());

    match given {
        Some(value) => Ok(value.to_string()),
        None => capture_head_sha(repo_dir),
    }
}
