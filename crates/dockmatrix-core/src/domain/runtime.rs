//! Node.js LTS channel selection.
//!
//! The release index lists every published Node.js version together with its
//! LTS codename (or `false`). Each channel contributes at most one
//! [`SecondaryVersion`]: its highest release, provided the major is at or
//! above the configured floor.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::error::SelectionError;
use super::version::{parse_major, LooseVersion};

/// The `lts` field of a release index entry: a codename or `false`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LtsLabel {
    Channel(String),
    Flag(bool),
}

impl LtsLabel {
    /// Codename when the release belongs to an LTS channel.
    pub fn channel(&self) -> Option<&str> {
        match self {
            LtsLabel::Channel(name) if !name.trim().is_empty() => Some(name),
            _ => None,
        }
    }
}

impl Default for LtsLabel {
    fn default() -> Self {
        LtsLabel::Flag(false)
    }
}

/// One entry of the runtime release index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeRelease {
    pub version: String,
    #[serde(default)]
    pub lts: LtsLabel,
}

impl RuntimeRelease {
    pub fn new(version: &str, lts: Option<&str>) -> Self {
        Self {
            version: version.to_string(),
            lts: lts
                .map(|name| LtsLabel::Channel(name.to_string()))
                .unwrap_or_default(),
        }
    }
}

/// The Node.js version bundled into a family of images.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SecondaryVersion {
    /// Version as published, e.g. `v20.11.0`; passed verbatim as a build arg.
    pub full_version: String,
    pub major: u64,
    /// LTS codename, e.g. `Iron`.
    pub channel: String,
}

/// Pick the highest release of one LTS channel.
pub fn reduce_channel(
    channel: &str,
    releases: &[&RuntimeRelease],
) -> Result<SecondaryVersion, SelectionError> {
    let highest = releases
        .iter()
        .filter_map(|release| match LooseVersion::parse(&release.version) {
            Ok(parsed) => Some((parsed, *release)),
            Err(e) => {
                debug!(channel = %channel, error = %e, "Ignoring unparseable runtime version");
                None
            }
        })
        .max_by(|(a, _), (b, _)| a.cmp(b))
        .map(|(_, release)| release)
        .ok_or_else(|| SelectionError::EmptyChannel {
            channel: channel.to_string(),
        })?;

    Ok(SecondaryVersion {
        full_version: highest.version.clone(),
        major: parse_major(&highest.version)?,
        channel: channel.to_string(),
    })
}

/// Select the newest release of every LTS channel whose major is at least
/// `min_major`.
///
/// Channels that fail to reduce are skipped with a warning. Output is ordered
/// by channel name.
pub fn select_lts_versions(releases: &[RuntimeRelease], min_major: u64) -> Vec<SecondaryVersion> {
    let mut channels: BTreeMap<&str, Vec<&RuntimeRelease>> = BTreeMap::new();
    for release in releases {
        if let Some(channel) = release.lts.channel() {
            channels.entry(channel).or_default().push(release);
        }
    }

    let mut selected = Vec::with_capacity(channels.len());
    for (channel, members) in channels {
        match reduce_channel(channel, &members) {
            Ok(version) if version.major >= min_major => selected.push(version),
            Ok(version) => {
                debug!(
                    channel = %channel,
                    major = version.major,
                    min_major,
                    "Dropping LTS channel below minimum major"
                );
            }
            Err(e) => warn!(channel = %channel, error = %e, "Skipping LTS channel"),
        }
    }

    selected
}
