//! Build matrix derivation.
//!
//! For one primary tag, the matrix is the cross product of the selected
//! Node.js versions and every combination of the configured feature flags.
//! Each cell becomes an immutable [`BuildDescriptor`].

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::flags::{FlagCombination, FlagSet};
use super::runtime::SecondaryVersion;
use super::tags::{Topology, VersionTag};
use super::version::compare_versions;

/// Build argument carrying the upstream base image.
pub const BASE_IMAGE_ARG: &str = "BASE_IMAGE";
/// Build argument carrying the full Node.js version.
pub const NODE_VERSION_ARG: &str = "NODE_VERSION";

/// Naming inputs shared by every descriptor of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatrixOptions {
    /// Repository the images are pushed to, e.g. `recognizebv/symfony-docker`.
    pub image_name: String,
    /// Upstream image the raw tags belong to, e.g. `php`.
    pub base_image: String,
    /// Attach a `--cache-from` hint pointing at the floating tag.
    pub cache_from: bool,
}

/// Tag name (without repository) for one matrix cell.
///
/// `php{version}[-nginx]-node{major}{suffixes}`; suffixes follow the declared
/// flag order.
pub fn tag_name(
    php_version: &str,
    topology: Topology,
    node_major: u64,
    flags: &FlagCombination,
) -> String {
    format!(
        "php{php_version}{}-node{node_major}{}",
        topology.tag_fragment(),
        flags.tag_suffix()
    )
}

/// Fully resolved parameters of one build invocation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BuildDescriptor {
    image_reference: String,
    extra_tags: Vec<String>,
    cache_reference: Option<String>,
    base_image_arg: String,
    runtime_version_arg: String,
    topology: Topology,
    flags: FlagCombination,
}

impl BuildDescriptor {
    /// Reference reported as the build's product.
    pub fn image_reference(&self) -> &str {
        &self.image_reference
    }

    /// Every `--tag` value, primary reference first.
    pub fn tags(&self) -> Vec<&str> {
        std::iter::once(self.image_reference.as_str())
            .chain(self.extra_tags.iter().map(String::as_str))
            .collect()
    }

    pub fn cache_reference(&self) -> Option<&str> {
        self.cache_reference.as_deref()
    }

    pub fn base_image_arg(&self) -> &str {
        &self.base_image_arg
    }

    pub fn runtime_version_arg(&self) -> &str {
        &self.runtime_version_arg
    }

    pub fn topology(&self) -> Topology {
        self.topology
    }

    pub fn dockerfile(&self) -> &'static str {
        self.topology.dockerfile()
    }

    pub fn flags(&self) -> &FlagCombination {
        &self.flags
    }

    /// `--build-arg` pairs: base image, Node.js version, then every flag.
    pub fn build_args(&self) -> Vec<(String, String)> {
        let mut args = vec![
            (BASE_IMAGE_ARG.to_string(), self.base_image_arg.clone()),
            (NODE_VERSION_ARG.to_string(), self.runtime_version_arg.clone()),
        ];
        args.extend(self.flags.build_args());
        args
    }
}

/// Derive every descriptor for one primary tag.
///
/// Yields `runtimes × 2^flags` descriptors: runtimes in input order, flag
/// combinations inner. A runtime repeating an earlier major would collide on
/// tag names and is skipped.
pub fn generate_matrix(
    options: &MatrixOptions,
    primary: &VersionTag,
    runtimes: &[SecondaryVersion],
    flags: &FlagSet,
) -> Vec<BuildDescriptor> {
    expand(options, primary, runtimes, flags, true)
}

/// Derive every descriptor for the tags of one release, in tag order.
///
/// Of several exact versions sharing a version and topology, only the
/// highest carries the floating tag and cache hint. A tag without an exact
/// version owns the floating tag outright.
pub fn generate_release_matrix(
    options: &MatrixOptions,
    tags: &[VersionTag],
    runtimes: &[SecondaryVersion],
    flags: &FlagSet,
) -> Vec<BuildDescriptor> {
    tags.iter()
        .flat_map(|tag| {
            let owns_floating = owns_floating_tag(tag, tags);
            expand(options, tag, runtimes, flags, owns_floating)
        })
        .collect()
}

fn exact_of(tag: &VersionTag) -> Option<&str> {
    tag.exact_version
        .as_deref()
        .filter(|exact| *exact != tag.version)
}

fn owns_floating_tag(tag: &VersionTag, tags: &[VersionTag]) -> bool {
    let Some(exact) = exact_of(tag) else {
        return true;
    };
    tags.iter()
        .filter(|other| other.version == tag.version && other.topology == tag.topology)
        .all(|other| match exact_of(other) {
            Some(other_exact) => compare_versions(other_exact, exact).is_le(),
            None => false,
        })
}

fn expand(
    options: &MatrixOptions,
    primary: &VersionTag,
    runtimes: &[SecondaryVersion],
    flags: &FlagSet,
    owns_floating: bool,
) -> Vec<BuildDescriptor> {
    let mut seen_majors = HashSet::new();
    let mut descriptors = Vec::with_capacity(runtimes.len() * flags.combination_count());

    for runtime in runtimes {
        if !seen_majors.insert(runtime.major) {
            warn!(
                major = runtime.major,
                channel = %runtime.channel,
                "Skipping runtime with duplicate major"
            );
            continue;
        }

        for combination in flags.combinations() {
            descriptors.push(describe(options, primary, runtime, combination, owns_floating));
        }
    }

    descriptors
}

fn describe(
    options: &MatrixOptions,
    primary: &VersionTag,
    runtime: &SecondaryVersion,
    flags: FlagCombination,
    owns_floating: bool,
) -> BuildDescriptor {
    let reference = |version: &str| {
        format!(
            "{}:{}",
            options.image_name,
            tag_name(version, primary.topology, runtime.major, &flags)
        )
    };
    let floating = reference(&primary.version);

    let (image_reference, extra_tags) = match exact_of(primary) {
        Some(exact) if owns_floating => (reference(exact), vec![floating.clone()]),
        Some(exact) => (reference(exact), Vec::new()),
        None => (floating.clone(), Vec::new()),
    };

    BuildDescriptor {
        image_reference,
        extra_tags,
        cache_reference: (options.cache_from && owns_floating).then_some(floating),
        base_image_arg: format!("{}:{}", options.base_image, primary.raw_tag),
        runtime_version_arg: runtime.full_version.clone(),
        topology: primary.topology,
        flags,
    }
}
