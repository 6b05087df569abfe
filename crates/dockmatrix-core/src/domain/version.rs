//! Ordered version type used wherever two upstream versions are compared.
//!
//! Upstream identifiers are not strict semver: Node.js prefixes releases with
//! `v`, PHP tags carry only `major.minor`. [`LooseVersion`] accepts both by
//! stripping the prefix and padding missing components with zero, then
//! delegates ordering to [`semver::Version`] (pre-releases sort below the
//! matching release).

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use super::error::SelectionError;

/// A leniently parsed, totally ordered version.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LooseVersion(semver::Version);

impl LooseVersion {
    /// Parse `v20.11.0`, `20.11`, `8.2` or `8.2.13-rc1`.
    pub fn parse(input: &str) -> Result<Self, SelectionError> {
        let invalid = |reason: &str| SelectionError::InvalidVersion {
            version: input.to_string(),
            reason: reason.to_string(),
        };

        let body = strip_v(input.trim());
        let split_at = body
            .find(|c: char| c == '-' || c == '+')
            .unwrap_or(body.len());
        let (core, suffix) = body.split_at(split_at);

        if core.is_empty() {
            return Err(invalid("empty version"));
        }
        let components = core.split('.').count();
        if components > 3 {
            return Err(invalid("more than three numeric components"));
        }

        let mut normalized = core.to_string();
        for _ in components..3 {
            normalized.push_str(".0");
        }
        normalized.push_str(suffix);

        semver::Version::parse(&normalized)
            .map(LooseVersion)
            .map_err(|e| invalid(&e.to_string()))
    }

    pub fn major(&self) -> u64 {
        self.0.major
    }
}

impl FromStr for LooseVersion {
    type Err = SelectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LooseVersion::parse(s)
    }
}

impl fmt::Display for LooseVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl PartialOrd for LooseVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for LooseVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

/// Compare two raw version strings, ranking unparseable input lowest.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    LooseVersion::parse(a).ok().cmp(&LooseVersion::parse(b).ok())
}

/// Extract the leading integer of a version string (`v18.19.0` -> 18).
pub fn parse_major(version: &str) -> Result<u64, SelectionError> {
    let body = strip_v(version.trim());
    let digits: String = body.chars().take_while(|c| c.is_ascii_digit()).collect();

    digits
        .parse::<u64>()
        .map_err(|_| SelectionError::MissingMajor {
            version: version.to_string(),
        })
}

fn strip_v(s: &str) -> &str {
    s.strip_prefix(|c: char| c == 'v' || c == 'V').unwrap_or(s)
}
