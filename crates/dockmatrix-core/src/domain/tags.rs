//! Upstream base-image tag parsing and primary version selection.
//!
//! A [`TagPattern`] turns raw registry tags such as `8.2-apache` into typed
//! [`VersionTag`]s. The version is read from the named group `version` when
//! the pattern declares one, otherwise from capture group 1. An optional
//! named group `exact` carries a patch-level version.

use std::fmt;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::error::{DockmatrixError, Result};
use super::version::{compare_versions, LooseVersion};

/// Default selection: PHP 7.1-7.9 and 8.x/9.x, Apache or FPM variants.
pub const DEFAULT_TAG_PATTERN: &str = r"^((?:7\.[1-9])|(?:[8-9]\.\d+))-(apache|fpm)$";

/// Substring marking an FPM tag, built behind nginx.
pub const NGINX_MARKER: &str = "-fpm";

/// Web-serving flavour of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topology {
    Apache,
    Nginx,
}

impl Topology {
    /// Classify a raw upstream tag. Total: every tag is one or the other.
    pub fn from_raw_tag(raw_tag: &str) -> Self {
        if raw_tag.contains(NGINX_MARKER) {
            Topology::Nginx
        } else {
            Topology::Apache
        }
    }

    /// Dockerfile used to build this flavour, relative to the build context.
    pub fn dockerfile(&self) -> &'static str {
        match self {
            Topology::Apache => "apache/Dockerfile",
            Topology::Nginx => "nginx/Dockerfile",
        }
    }

    /// Fragment inserted into published tags after the PHP version.
    pub fn tag_fragment(&self) -> &'static str {
        match self {
            Topology::Apache => "",
            Topology::Nginx => "-nginx",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Topology::Apache => "apache",
            Topology::Nginx => "nginx",
        }
    }
}

impl fmt::Display for Topology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An upstream tag that matched the selection pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VersionTag {
    /// Tag as listed by the registry, e.g. `8.2-fpm`.
    pub raw_tag: String,
    /// Normalized PHP version, e.g. `8.2`.
    pub version: String,
    /// Patch-level version when the pattern captures one.
    pub exact_version: Option<String>,
    pub topology: Topology,
}

impl VersionTag {
    pub fn new(raw_tag: &str, version: &str, exact_version: Option<&str>) -> Self {
        Self {
            raw_tag: raw_tag.to_string(),
            version: version.to_string(),
            exact_version: exact_version.map(str::to_string),
            topology: Topology::from_raw_tag(raw_tag),
        }
    }
}

/// Outcome of matching one raw tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagMatch {
    Matched(VersionTag),
    NoMatch,
}

impl TagMatch {
    pub fn into_version_tag(self) -> Option<VersionTag> {
        match self {
            TagMatch::Matched(tag) => Some(tag),
            TagMatch::NoMatch => None,
        }
    }
}

/// Compiled tag selection pattern.
#[derive(Debug, Clone)]
pub struct TagPattern {
    regex: Regex,
    named_version: bool,
}

impl TagPattern {
    pub fn new(pattern: &str) -> Result<Self> {
        let regex = Regex::new(pattern)?;
        let named_version = regex.capture_names().any(|name| name == Some("version"));

        // captures_len counts the implicit whole-match group.
        if !named_version && regex.captures_len() < 2 {
            return Err(DockmatrixError::InvalidConfig(format!(
                "tag pattern {pattern:?} has no capture group for the version"
            )));
        }

        Ok(Self {
            regex,
            named_version,
        })
    }

    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    pub fn parse(&self, raw_tag: &str) -> TagMatch {
        let Some(caps) = self.regex.captures(raw_tag) else {
            return TagMatch::NoMatch;
        };

        let version = if self.named_version {
            caps.name("version")
        } else {
            caps.get(1)
        };
        let Some(version) = version.map(|m| m.as_str()).filter(|v| !v.is_empty()) else {
            return TagMatch::NoMatch;
        };
        let exact = caps
            .name("exact")
            .map(|m| m.as_str())
            .filter(|v| !v.is_empty());

        TagMatch::Matched(VersionTag::new(raw_tag, version, exact))
    }
}

/// Keep every tag the pattern accepts, in upstream order.
pub fn select_primary_tags<S: AsRef<str>>(pattern: &TagPattern, raw_tags: &[S]) -> Vec<VersionTag> {
    raw_tags
        .iter()
        .filter_map(|raw| match pattern.parse(raw.as_ref()) {
            TagMatch::Matched(tag) => Some(tag),
            TagMatch::NoMatch => {
                debug!(tag = %raw.as_ref(), "Tag does not match pattern");
                None
            }
        })
        .collect()
}

/// Reduce tags sharing version and topology to the highest exact version.
///
/// Tags without an exact version pass through unchanged. The surviving tag
/// keeps the position of the first tag of its group.
pub fn collapse_to_highest_exact(tags: Vec<VersionTag>) -> Vec<VersionTag> {
    let mut kept: Vec<VersionTag> = Vec::with_capacity(tags.len());

    for tag in tags {
        let Some(exact) = tag.exact_version.as_deref() else {
            kept.push(tag);
            continue;
        };

        let existing = kept.iter_mut().find(|k| {
            k.exact_version.is_some() && k.version == tag.version && k.topology == tag.topology
        });

        match existing {
            Some(current) => {
                let current_exact = current.exact_version.as_deref().unwrap_or_default();
                if compare_versions(exact, current_exact).is_gt() {
                    *current = tag;
                }
            }
            None => kept.push(tag),
        }
    }

    kept
}

/// Drop tags that would publish the same image names as an earlier tag.
///
/// Tags clash when version, topology and exact version are all equal, e.g.
/// `8.2-apache` and `8.2-apache-bookworm` under an unanchored pattern. The
/// first tag in upstream order is kept.
pub fn drop_duplicate_tags(tags: Vec<VersionTag>) -> Vec<VersionTag> {
    let mut kept: Vec<VersionTag> = Vec::with_capacity(tags.len());

    for tag in tags {
        let earlier = kept.iter().find(|k| {
            k.version == tag.version
                && k.topology == tag.topology
                && k.exact_version == tag.exact_version
        });
        match earlier {
            Some(first) => warn!(
                tag = %tag.raw_tag,
                kept = %first.raw_tag,
                "Skipping tag that would overwrite an earlier tag's images"
            ),
            None => kept.push(tag),
        }
    }

    kept
}

/// Matched tags sharing one normalized version; published as one release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionGroup {
    pub version: String,
    pub tags: Vec<VersionTag>,
}

/// Group tags by normalized version in first-appearance order.
pub fn group_by_version(tags: Vec<VersionTag>) -> Vec<VersionGroup> {
    let mut groups: Vec<VersionGroup> = Vec::new();

    for tag in tags {
        match groups.iter_mut().find(|g| g.version == tag.version) {
            Some(group) => group.tags.push(tag),
            None => groups.push(VersionGroup {
                version: tag.version.clone(),
                tags: vec![tag],
            }),
        }
    }

    groups
}

/// Which primary versions a run builds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionPolicy {
    /// Every selected version, one release each.
    #[default]
    All,
    /// Only the highest selected version.
    Highest,
}

impl SelectionPolicy {
    pub fn apply(&self, groups: Vec<VersionGroup>) -> Vec<VersionGroup> {
        match self {
            SelectionPolicy::All => groups,
            SelectionPolicy::Highest => groups
                .into_iter()
                .max_by_key(|g| LooseVersion::parse(&g.version).ok())
                .into_iter()
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_pattern() -> TagPattern {
        TagPattern::new(DEFAULT_TAG_PATTERN).unwrap()
    }

    #[test]
    fn default_pattern_matches_apache_and_fpm() {
        let pattern = default_pattern();

        let apache = pattern.parse("8.2-apache").into_version_tag().unwrap();
        assert_eq!(apache.version, "8.2");
        assert_eq!(apache.topology, Topology::Apache);
        assert_eq!(apache.exact_version, None);

        let fpm = pattern.parse("8.2-fpm").into_version_tag().unwrap();
        assert_eq!(fpm.version, "8.2");
        assert_eq!(fpm.topology, Topology::Nginx);
    }

    #[test]
    fn default_pattern_rejects_other_tags() {
        let pattern = default_pattern();
        for raw in ["7.0-apache", "8.2-cli", "8.2.13-apache", "latest", "8.2-fpm-alpine"] {
            assert_eq!(pattern.parse(raw), TagMatch::NoMatch, "{raw} should not match");
        }
        assert!(pattern.parse("7.4-fpm").into_version_tag().is_some());
    }

    #[test]
    fn named_groups_capture_exact_version() {
        let pattern =
            TagPattern::new(r"^(?P<exact>(?P<version>8\.\d+)\.\d+)-(apache|fpm)$").unwrap();
        let tag = pattern.parse("8.3.4-fpm").into_version_tag().unwrap();
        assert_eq!(tag.version, "8.3");
        assert_eq!(tag.exact_version.as_deref(), Some("8.3.4"));
        assert_eq!(tag.topology, Topology::Nginx);
    }

    #[test]
    fn non_participating_version_group_is_no_match() {
        // Group 1 only participates for 7.x; 8.x matches but has no version.
        let pattern = TagPattern::new(r"^(?:(7\.[1-9])|([8-9]\.\d+))-(apache|fpm)$").unwrap();
        assert_eq!(pattern.parse("8.2-apache"), TagMatch::NoMatch);
        assert!(pattern.parse("7.4-apache").into_version_tag().is_some());
    }

    #[test]
    fn pattern_without_groups_is_rejected() {
        let err = TagPattern::new(r"^\d+\.\d+-apache$").unwrap_err();
        assert!(matches!(err, DockmatrixError::InvalidConfig(_)));
        assert!(matches!(
            TagPattern::new("(unclosed").unwrap_err(),
            DockmatrixError::InvalidPattern(_)
        ));
    }

    #[test]
    fn topology_is_substring_based() {
        assert_eq!(Topology::from_raw_tag("8.1-fpm-bullseye"), Topology::Nginx);
        assert_eq!(Topology::from_raw_tag("8.1-apache"), Topology::Apache);
        assert_eq!(Topology::from_raw_tag("8.1-zts"), Topology::Apache);
        assert_eq!(Topology::Nginx.dockerfile(), "nginx/Dockerfile");
        assert_eq!(Topology::Apache.dockerfile(), "apache/Dockerfile");
    }

    #[test]
    fn select_keeps_upstream_order() {
        let tags = select_primary_tags(
            &default_pattern(),
            &["8.2-fpm", "latest", "8.1-apache", "8.2-apache"],
        );
        let raw: Vec<_> = tags.iter().map(|t| t.raw_tag.as_str()).collect();
        assert_eq!(raw, vec!["8.2-fpm", "8.1-apache", "8.2-apache"]);
    }

    #[test]
    fn collapse_keeps_highest_exact_per_topology() {
        let tags = vec![
            VersionTag::new("8.3.2-apache", "8.3", Some("8.3.2")),
            VersionTag::new("8.3.10-apache", "8.3", Some("8.3.10")),
            VersionTag::new("8.3.4-fpm", "8.3", Some("8.3.4")),
            VersionTag::new("8.3.9-apache", "8.3", Some("8.3.9")),
        ];
        let collapsed = collapse_to_highest_exact(tags);
        let raw: Vec<_> = collapsed.iter().map(|t| t.raw_tag.as_str()).collect();
        assert_eq!(raw, vec!["8.3.10-apache", "8.3.4-fpm"]);
    }

    #[test]
    fn collapse_leaves_plain_tags_alone() {
        let tags = vec![
            VersionTag::new("8.2-apache", "8.2", None),
            VersionTag::new("8.2-fpm", "8.2", None),
        ];
        assert_eq!(collapse_to_highest_exact(tags.clone()), tags);
    }

    #[test]
    fn duplicate_tags_keep_first_in_upstream_order() {
        let pattern = TagPattern::new(r"^(8\.\d+)-(apache|fpm)").unwrap();
        let tags = select_primary_tags(
            &pattern,
            &["8.2-apache", "8.2-apache-bookworm", "8.2-fpm", "8.2-fpm-alpine"],
        );
        assert_eq!(tags.len(), 4);

        let kept = drop_duplicate_tags(tags);
        let raw: Vec<_> = kept.iter().map(|t| t.raw_tag.as_str()).collect();
        assert_eq!(raw, vec!["8.2-apache", "8.2-fpm"]);
    }

    #[test]
    fn distinct_exact_versions_are_not_duplicates() {
        let tags = vec![
            VersionTag::new("8.3.10-apache", "8.3", Some("8.3.10")),
            VersionTag::new("8.3.9-apache", "8.3", Some("8.3.9")),
            VersionTag::new("8.3-apache", "8.3", None),
        ];
        assert_eq!(drop_duplicate_tags(tags.clone()), tags);
    }

    #[test]
    fn groups_follow_first_appearance() {
        let groups = group_by_version(vec![
            VersionTag::new("8.2-apache", "8.2", None),
            VersionTag::new("8.1-apache", "8.1", None),
            VersionTag::new("8.2-fpm", "8.2", None),
        ]);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].version, "8.2");
        assert_eq!(groups[0].tags.len(), 2);
        assert_eq!(groups[1].version, "8.1");
    }

    #[test]
    fn highest_policy_uses_numeric_ordering() {
        let groups = group_by_version(vec![
            VersionTag::new("8.9-apache", "8.9", None),
            VersionTag::new("8.10-apache", "8.10", None),
            VersionTag::new("8.2-apache", "8.2", None),
        ]);
        let picked = SelectionPolicy::Highest.apply(groups.clone());
        assert_eq!(picked.len(), 1);
        assert_eq!(picked[0].version, "8.10");

        assert_eq!(SelectionPolicy::All.apply(groups).len(), 3);
        assert!(SelectionPolicy::Highest.apply(Vec::new()).is_empty());
    }
}
