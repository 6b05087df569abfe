//! Boolean image capabilities forming the dimensions of the build matrix.
//!
//! The declared order of a [`FlagSet`] is part of the published tag format:
//! tag suffixes always appear in that order, so downstream consumers can parse
//! them. Adding a flag appends a dimension without touching matrix code.

use serde::{Deserialize, Serialize};

use super::error::{DockmatrixError, Result};

/// Upper bound on matrix dimensions.
pub const MAX_FLAGS: usize = 8;

/// One independent image capability switch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FeatureFlag {
    /// Short name used on the command line, e.g. `debug`.
    pub name: String,
    /// Build argument receiving `true`/`false`, e.g. `ENABLE_DEBUG`.
    pub build_arg: String,
    /// Suffix appended to the image tag when enabled, e.g. `-dev`.
    pub tag_suffix: String,
}

impl FeatureFlag {
    pub fn new(name: &str, build_arg: &str, tag_suffix: &str) -> Self {
        Self {
            name: name.to_string(),
            build_arg: build_arg.to_string(),
            tag_suffix: tag_suffix.to_string(),
        }
    }

    /// Image-processing extensions (gd, imagick).
    pub fn image_support() -> Self {
        Self::new("image", "ENABLE_IMAGE_SUPPORT", "-image")
    }

    /// Debug tooling (xdebug).
    pub fn debug() -> Self {
        Self::new("debug", "ENABLE_DEBUG", "-dev")
    }
}

/// Ordered, duplicate-free set of feature flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagSet {
    flags: Vec<FeatureFlag>,
}

impl Default for FlagSet {
    fn default() -> Self {
        Self {
            flags: vec![FeatureFlag::image_support(), FeatureFlag::debug()],
        }
    }
}

impl FlagSet {
    pub fn new(flags: Vec<FeatureFlag>) -> Result<Self> {
        if flags.len() > MAX_FLAGS {
            return Err(DockmatrixError::InvalidConfig(format!(
                "at most {MAX_FLAGS} feature flags are supported, got {}",
                flags.len()
            )));
        }

        for (i, flag) in flags.iter().enumerate() {
            if flag.name.is_empty() || flag.build_arg.is_empty() || flag.tag_suffix.is_empty() {
                return Err(DockmatrixError::InvalidConfig(format!(
                    "feature flag {:?} needs a name, build arg and tag suffix",
                    flag.name
                )));
            }
            let duplicate = flags[..i].iter().any(|earlier| {
                earlier.name == flag.name
                    || earlier.build_arg == flag.build_arg
                    || earlier.tag_suffix == flag.tag_suffix
            });
            if duplicate {
                return Err(DockmatrixError::InvalidConfig(format!(
                    "feature flag {:?} duplicates an earlier flag",
                    flag.name
                )));
            }
        }

        Ok(Self { flags })
    }

    pub fn empty() -> Self {
        Self { flags: Vec::new() }
    }

    /// Restrict to the named flags, keeping this set's declared order.
    pub fn only<S: AsRef<str>>(&self, names: &[S]) -> Result<Self> {
        if let Some(unknown) = names
            .iter()
            .map(AsRef::as_ref)
            .find(|name| !self.flags.iter().any(|f| f.name == *name))
        {
            return Err(DockmatrixError::InvalidConfig(format!(
                "unknown feature flag {unknown:?}"
            )));
        }

        Ok(Self {
            flags: self
                .flags
                .iter()
                .filter(|f| names.iter().any(|n| n.as_ref() == f.name))
                .cloned()
                .collect(),
        })
    }

    pub fn flags(&self) -> &[FeatureFlag] {
        &self.flags
    }

    pub fn len(&self) -> usize {
        self.flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    /// Number of combinations, `2^len`.
    pub fn combination_count(&self) -> usize {
        1usize << self.flags.len()
    }

    /// Every on/off assignment. Combination `i` enables flag `k` iff bit `k`
    /// of `i` is set, so the first declared flag toggles fastest.
    pub fn combinations(&self) -> impl Iterator<Item = FlagCombination> + '_ {
        (0..self.combination_count()).map(move |mask| FlagCombination {
            states: self
                .flags
                .iter()
                .enumerate()
                .map(|(bit, flag)| FlagState {
                    flag: flag.clone(),
                    enabled: mask & (1 << bit) != 0,
                })
                .collect(),
        })
    }
}

/// A flag with its value in one matrix cell.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FlagState {
    pub flag: FeatureFlag,
    pub enabled: bool,
}

/// One on/off assignment of every flag in a [`FlagSet`], in declared order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FlagCombination {
    states: Vec<FlagState>,
}

impl FlagCombination {
    pub fn states(&self) -> &[FlagState] {
        &self.states
    }

    /// Concatenated suffixes of the enabled flags.
    pub fn tag_suffix(&self) -> String {
        self.states
            .iter()
            .filter(|state| state.enabled)
            .map(|state| state.flag.tag_suffix.as_str())
            .collect()
    }

    /// `(BUILD_ARG, "true"|"false")` for every flag.
    pub fn build_args(&self) -> Vec<(String, String)> {
        self.states
            .iter()
            .map(|state| (state.flag.build_arg.clone(), state.enabled.to_string()))
            .collect()
    }
}
