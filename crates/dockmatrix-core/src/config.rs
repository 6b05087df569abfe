//! Resolved run configuration.

use serde::{Deserialize, Serialize};

use crate::domain::{
    FlagSet, MatrixOptions, Result, SelectionPolicy, TagPattern, DEFAULT_TAG_PATTERN,
};

/// Repository the built images are pushed to.
pub const DEFAULT_IMAGE_NAME: &str = "recognizebv/symfony-docker";
/// Upstream image whose tags are scanned.
pub const DEFAULT_BASE_IMAGE: &str = "php";
/// Oldest Node.js major still built.
pub const DEFAULT_MIN_RUNTIME_MAJOR: u64 = 18;

/// Everything the release pipeline needs to select versions and name images.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseConfig {
    pub image_name: String,
    pub base_image: String,
    pub tag_pattern: String,
    pub min_runtime_major: u64,
    pub flags: FlagSet,
    pub selection: SelectionPolicy,
    /// Reduce tags sharing a version and topology to the highest exact version.
    pub collapse_exact: bool,
    pub cache_from: bool,
}

impl Default for ReleaseConfig {
    fn default() -> Self {
        ReleaseConfig {
            image_name: DEFAULT_IMAGE_NAME.to_string(),
            base_image: DEFAULT_BASE_IMAGE.to_string(),
            tag_pattern: DEFAULT_TAG_PATTERN.to_string(),
            min_runtime_major: DEFAULT_MIN_RUNTIME_MAJOR,
            flags: FlagSet::default(),
            selection: SelectionPolicy::default(),
            collapse_exact: true,
            cache_from: true,
        }
    }
}

impl ReleaseConfig {
    pub fn with_tag_pattern(mut self, pattern: &str) -> Self {
        self.tag_pattern = pattern.to_string();
        self
    }

    pub fn with_flags(mut self, flags: FlagSet) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_selection(mut self, selection: SelectionPolicy) -> Self {
        self.selection = selection;
        self
    }

    pub fn with_min_runtime_major(mut self, major: u64) -> Self {
        self.min_runtime_major = major;
        self
    }

    pub fn compile_pattern(&self) -> Result<TagPattern> {
        TagPattern::new(&self.tag_pattern)
    }

    pub fn matrix_options(&self) -> MatrixOptions {
        MatrixOptions {
            image_name: self.image_name.clone(),
            base_image: self.base_image.clone(),
            cache_from: self.cache_from,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_compile() {
        let config = ReleaseConfig::default();
        assert!(config.compile_pattern().is_ok());
        assert_eq!(config.min_runtime_major, 18);
        assert_eq!(config.selection, SelectionPolicy::All);
        assert_eq!(config.flags.len(), 2);
    }

    #[test]
    fn builders_override_fields() {
        let config = ReleaseConfig::default()
            .with_tag_pattern(r"^([8-9]\.\d+)-(apache|fpm)$")
            .with_selection(SelectionPolicy::Highest)
            .with_min_runtime_major(10)
            .with_flags(FlagSet::empty());
        assert_eq!(config.min_runtime_major, 10);
        assert!(config.flags.is_empty());
        assert_eq!(config.selection, SelectionPolicy::Highest);
        assert!(config.compile_pattern().is_ok());
    }

    #[test]
    fn bad_pattern_surfaces_on_compile() {
        let config = ReleaseConfig::default().with_tag_pattern("([");
        assert!(config.compile_pattern().is_err());
    }

    #[test]
    fn matrix_options_mirror_config() {
        let mut config = ReleaseConfig::default();
        config.cache_from = false;
        let options = config.matrix_options();
        assert_eq!(options.image_name, DEFAULT_IMAGE_NAME);
        assert_eq!(options.base_image, "php");
        assert!(!options.cache_from);
    }
}
