//! Domain models for dockmatrix.
//!
//! - `VersionTag` / `TagPattern`: upstream PHP tag selection
//! - `SecondaryVersion`: Node.js LTS channel selection
//! - `FlagSet`: ordered feature flags forming matrix dimensions
//! - `BuildDescriptor`: one resolved build invocation

pub mod error;
pub mod flags;
pub mod matrix;
pub mod runtime;
pub mod tags;
pub mod version;

pub use error::{DockmatrixError, Result, SelectionError};
pub use flags::{FeatureFlag, FlagCombination, FlagSet, FlagState};
pub use matrix::{
    generate_matrix, generate_release_matrix, tag_name, BuildDescriptor, MatrixOptions,
};
pub use runtime::{select_lts_versions, LtsLabel, RuntimeRelease, SecondaryVersion};
pub use tags::{
    collapse_to_highest_exact, drop_duplicate_tags, group_by_version, select_primary_tags,
    SelectionPolicy, TagMatch, TagPattern, Topology, VersionGroup, VersionTag, DEFAULT_TAG_PATTERN,
};
pub use version::{compare_versions, parse_major, LooseVersion};
