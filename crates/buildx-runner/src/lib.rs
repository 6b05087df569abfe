//! `ImageBuilder` backed by `docker buildx build`.
//!
//! One subprocess per descriptor. Output of the build tool is inherited so
//! progress shows up in the job log as it happens.

pub mod error;

use std::process::Stdio;
use std::time::Instant;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::{debug, info};

use dockmatrix_core::{BuildDescriptor, ImageBuilder, Result};

pub use error::BuildxError;

/// Platforms every image is built for unless overridden.
pub const DEFAULT_PLATFORMS: &str = "linux/amd64,linux/arm64";

/// How the build tool is invoked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildxConfig {
    /// Executable providing the `buildx` subcommand.
    pub program: String,
    /// Value of `--platform`.
    pub platforms: String,
    pub push: bool,
    /// Build context passed as the last argument.
    pub context: String,
    /// Log the command line instead of running it.
    pub dry_run: bool,
}

impl Default for BuildxConfig {
    fn default() -> Self {
        Self {
            program: "docker".to_string(),
            platforms: DEFAULT_PLATFORMS.to_string(),
            push: true,
            context: ".".to_string(),
            dry_run: false,
        }
    }
}

/// Arguments after the program name for one descriptor.
pub fn buildx_args(config: &BuildxConfig, descriptor: &BuildDescriptor) -> Vec<String> {
    let mut args = vec![
        "buildx".to_string(),
        "build".to_string(),
        "--platform".to_string(),
        config.platforms.clone(),
    ];
    if config.push {
        args.push("--push".to_string());
    }
    args.push("-f".to_string());
    args.push(descriptor.dockerfile().to_string());

    for tag in descriptor.tags() {
        args.push("--tag".to_string());
        args.push(tag.to_string());
    }
    for (name, value) in descriptor.build_args() {
        args.push("--build-arg".to_string());
        args.push(format!("{name}={value}"));
    }
    if let Some(cache) = descriptor.cache_reference() {
        args.push("--cache-from".to_string());
        args.push(cache.to_string());
    }

    args.push(config.context.clone());
    args
}

/// Builds images by running the configured buildx program.
#[derive(Debug, Clone, Default)]
pub struct BuildxBuilder {
    config: BuildxConfig,
}

impl BuildxBuilder {
    pub fn new(config: BuildxConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BuildxConfig {
        &self.config
    }

    /// Run one build to completion.
    pub async fn run(&self, descriptor: &BuildDescriptor) -> std::result::Result<String, BuildxError> {
        let reference = descriptor.image_reference().to_string();
        let args = buildx_args(&self.config, descriptor);

        if self.config.dry_run {
            info!(
                reference = %reference,
                command = %format!("{} {}", self.config.program, args.join(" ")),
                "Dry run, not invoking build tool"
            );
            return Ok(reference);
        }

        debug!(program = %self.config.program, args = ?args, "Spawning build tool");
        let start = Instant::now();

        let status = Command::new(&self.config.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .map_err(|source| BuildxError::Spawn {
                program: self.config.program.clone(),
                reference: reference.clone(),
                source,
            })?;

        debug!(
            reference = %reference,
            duration_ms = start.elapsed().as_millis() as u64,
            status = %status,
            "Build tool exited"
        );

        if status.success() {
            return Ok(reference);
        }
        match status.code() {
            Some(code) => Err(BuildxError::Failed { reference, code }),
            None => Err(BuildxError::Terminated { reference }),
        }
    }
}

#[async_trait]
impl ImageBuilder for BuildxBuilder {
    async fn build(&self, descriptor: &BuildDescriptor) -> Result<String> {
        Ok(self.run(descriptor).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dockmatrix_core::{
        generate_matrix, FlagSet, MatrixOptions, SecondaryVersion, VersionTag,
    };

    fn descriptor(raw: &str, exact: Option<&str>, cache_from: bool) -> BuildDescriptor {
        let options = MatrixOptions {
            image_name: "recognizebv/symfony-docker".into(),
            base_image: "php".into(),
            cache_from,
        };
        let runtime = SecondaryVersion {
            full_version: "v20.11.0".into(),
            major: 20,
            channel: "Iron".into(),
        };
        let tag = VersionTag::new(raw, "8.2", exact);
        generate_matrix(&options, &tag, &[runtime], &FlagSet::default())
            .into_iter()
            .nth(1)
            .unwrap()
    }

    #[test]
    fn args_follow_buildx_layout() {
        let args = buildx_args(&BuildxConfig::default(), &descriptor("8.2-fpm", None, false));
        assert_eq!(
            args,
            vec![
                "buildx",
                "build",
                "--platform",
                "linux/amd64,linux/arm64",
                "--push",
                "-f",
                "nginx/Dockerfile",
                "--tag",
                "recognizebv/symfony-docker:php8.2-nginx-node20-image",
                "--build-arg",
                "BASE_IMAGE=php:8.2-fpm",
                "--build-arg",
                "NODE_VERSION=v20.11.0",
                "--build-arg",
                "ENABLE_IMAGE_SUPPORT=true",
                "--build-arg",
                "ENABLE_DEBUG=false",
                ".",
            ]
        );
    }

    #[test]
    fn exact_tag_and_cache_hint_are_passed() {
        let config = BuildxConfig {
            push: false,
            platforms: "linux/amd64".into(),
            ..BuildxConfig::default()
        };
        let args = buildx_args(&config, &descriptor("8.2.15-apache", Some("8.2.15"), true));

        assert!(!args.contains(&"--push".to_string()));
        let tags: Vec<&String> = args
            .iter()
            .zip(args.iter().skip(1))
            .filter(|(flag, _)| *flag == "--tag")
            .map(|(_, value)| value)
            .collect();
        assert_eq!(
            tags,
            vec![
                "recognizebv/symfony-docker:php8.2.15-node20-image",
                "recognizebv/symfony-docker:php8.2-node20-image",
            ]
        );
        let cache = args.iter().position(|a| a == "--cache-from").unwrap();
        assert_eq!(args[cache + 1], "recognizebv/symfony-docker:php8.2-node20-image");
        assert_eq!(args.last().map(String::as_str), Some("."));
    }

    #[tokio::test]
    async fn dry_run_never_spawns() {
        let builder = BuildxBuilder::new(BuildxConfig {
            program: "/nonexistent/buildx-tool".into(),
            dry_run: true,
            ..BuildxConfig::default()
        });
        let reference = builder
            .run(&descriptor("8.2-apache", None, false))
            .await
            .unwrap();
        assert_eq!(reference, "recognizebv/symfony-docker:php8.2-node20-image");
    }
}
