//! dockmatrix - PHP/Node.js container image release automation
//!
//! Scans the upstream PHP image for matching tags, builds one image per
//! Node.js LTS line and feature flag combination with `docker buildx`, and
//! publishes a GitHub release per PHP version listing the pushed tags.
//!
//! Usage: `dockmatrix [PATTERN] [PLATFORM] [OPTIONS]`

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, warn};

use buildx_runner::{BuildxBuilder, BuildxConfig, DEFAULT_PLATFORMS};
use dockmatrix_core::{
    init_tracing, level_for, resolve_target_commitish, DockmatrixError, FlagSet, ReleaseConfig,
    ReleasePipeline, ReleasePublisher, SelectionPolicy, DEFAULT_BASE_IMAGE, DEFAULT_IMAGE_NAME,
    DEFAULT_MIN_RUNTIME_MAJOR, DEFAULT_TAG_PATTERN,
};
use github_release::{GithubConfig, GithubReleaseClient};
use upstream_index::{
    NodeIndexClient, RegistryConfig, RegistryTagSource, DEFAULT_AUTH_URL, DEFAULT_NODE_INDEX_URL,
    DEFAULT_REGISTRY_URL, DEFAULT_SERVICE,
};

#[derive(Parser, Debug)]
#[command(name = "dockmatrix")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Build and release PHP/Node.js container images", long_about = None)]
struct Cli {
    /// Regex selecting upstream tags; group `version` (or group 1) is the PHP version
    #[arg(env = "DOCKMATRIX_TAG_PATTERN", default_value = DEFAULT_TAG_PATTERN)]
    pattern: String,

    /// Platforms passed to buildx
    #[arg(env = "DOCKMATRIX_PLATFORMS", default_value = DEFAULT_PLATFORMS)]
    platform: String,

    /// Repository the images are pushed to
    #[arg(long, env = "DOCKMATRIX_IMAGE", default_value = DEFAULT_IMAGE_NAME)]
    image: String,

    /// Upstream image whose tags are scanned
    #[arg(long, env = "DOCKMATRIX_UPSTREAM", default_value = DEFAULT_BASE_IMAGE)]
    upstream: String,

    /// Oldest Node.js major to build
    #[arg(long, env = "DOCKMATRIX_MIN_NODE_MAJOR", default_value_t = DEFAULT_MIN_RUNTIME_MAJOR)]
    min_node_major: u64,

    /// Feature flags to vary, comma separated; empty for none [default: image,debug]
    #[arg(long, env = "DOCKMATRIX_FLAGS", value_delimiter = ',')]
    flags: Option<Vec<String>>,

    /// Build only the highest matching PHP version
    #[arg(long)]
    highest: bool,

    /// Build every tag of a version instead of only the highest exact one
    #[arg(long)]
    no_collapse_exact: bool,

    /// Do not pass the floating tag as a --cache-from hint
    #[arg(long)]
    no_cache_from: bool,

    /// Log build commands instead of running them; nothing is published
    #[arg(long)]
    dry_run: bool,

    /// Release target (branch or SHA); defaults to GITHUB_SHA, then HEAD
    #[arg(long, env = "INPUT_COMMITISH")]
    commitish: Option<String>,

    /// Program providing `buildx`
    #[arg(long, env = "DOCKMATRIX_DOCKER", default_value = "docker")]
    docker: String,

    /// Node.js release index
    #[arg(long, env = "DOCKMATRIX_NODE_INDEX_URL", default_value = DEFAULT_NODE_INDEX_URL)]
    node_index_url: String,

    /// Registry the upstream tags are listed from
    #[arg(long, env = "DOCKMATRIX_REGISTRY_URL", default_value = DEFAULT_REGISTRY_URL)]
    registry_url: String,

    /// Registry token endpoint; empty to list anonymously
    #[arg(long, env = "DOCKMATRIX_REGISTRY_AUTH_URL", default_value = DEFAULT_AUTH_URL)]
    registry_auth_url: String,

    /// Service name requested from the token endpoint
    #[arg(long, env = "DOCKMATRIX_REGISTRY_SERVICE", default_value = DEFAULT_SERVICE)]
    registry_service: String,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Emit JSON-formatted log lines and print the run report as JSON
    #[arg(long)]
    json: bool,
}

fn non_blank<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.trim().is_empty() {
        fallback
    } else {
        value
    }
}

fn release_config(cli: &Cli) -> Result<ReleaseConfig> {
    let flags = match &cli.flags {
        None => FlagSet::default(),
        Some(names) => {
            let names: Vec<&str> = names
                .iter()
                .map(|n| n.trim())
                .filter(|n| !n.is_empty())
                .collect();
            FlagSet::default()
                .only(&names)
                .context("Invalid --flags")?
        }
    };

    let config = ReleaseConfig {
        image_name: cli.image.clone(),
        base_image: cli.upstream.clone(),
        tag_pattern: non_blank(&cli.pattern, DEFAULT_TAG_PATTERN).to_string(),
        min_runtime_major: cli.min_node_major,
        flags,
        selection: if cli.highest {
            SelectionPolicy::Highest
        } else {
            SelectionPolicy::All
        },
        collapse_exact: !cli.no_collapse_exact,
        cache_from: !cli.no_cache_from,
    };
    config
        .compile_pattern()
        .with_context(|| format!("Invalid tag pattern {:?}", config.tag_pattern))?;
    Ok(config)
}

fn registry_config(cli: &Cli) -> RegistryConfig {
    RegistryConfig {
        registry_url: cli.registry_url.clone(),
        auth_url: Some(cli.registry_auth_url.trim())
            .filter(|url| !url.is_empty())
            .map(str::to_string),
        service: cli.registry_service.clone(),
        ..RegistryConfig::docker_hub(&cli.upstream)
    }
}

fn buildx_config(cli: &Cli) -> BuildxConfig {
    BuildxConfig {
        program: cli.docker.clone(),
        platforms: non_blank(&cli.platform, DEFAULT_PLATFORMS).to_string(),
        dry_run: cli.dry_run,
        ..BuildxConfig::default()
    }
}

fn release_publisher(cli: &Cli, github: &GithubConfig) -> Result<ReleasePublisher> {
    if cli.dry_run {
        info!("Dry run, releases will not be published");
        return Ok(ReleasePublisher::disabled());
    }
    if !github.has_token() {
        warn!("No release token configured, releases will not be published");
        return Ok(ReleasePublisher::disabled());
    }

    let client = GithubReleaseClient::new(github).context("Failed to set up GitHub client")?;
    let target = resolve_target_commitish(
        cli.commitish.as_deref().or(github.commitish.as_deref()),
        github.sha.as_deref(),
        Path::new("."),
    )
    .context("Failed to resolve release target commit")?;
    info!(target = %target, "Releases will target commit");

    Ok(ReleasePublisher::new(Arc::new(client), target))
}

/// Exit status for a failed run: the build tool's code for build failures,
/// 1 otherwise.
fn exit_code_for(err: &anyhow::Error) -> u8 {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<DockmatrixError>())
        .map(DockmatrixError::exit_code)
        .and_then(|code| u8::try_from(code).ok())
        .filter(|code| *code != 0)
        .unwrap_or(1)
}

async fn run(cli: Cli) -> Result<()> {
    let config = release_config(&cli)?;
    let github = GithubConfig::from_env();
    let publisher = release_publisher(&cli, &github)?;

    let tags = RegistryTagSource::new(registry_config(&cli))
        .context("Failed to set up registry client")?;
    let index =
        NodeIndexClient::new(&cli.node_index_url).context("Failed to set up Node.js index client")?;
    let builder = BuildxBuilder::new(buildx_config(&cli));

    let pipeline = ReleasePipeline::new(
        config,
        Arc::new(tags),
        Arc::new(index),
        Arc::new(builder),
        publisher,
    );
    let report = pipeline.run().await.context("Release run failed")?;

    for release in &report.releases {
        info!(
            release = %release.tag,
            images = release.images.len(),
            outcome = ?release.outcome,
            "Release finished"
        );
    }
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.json, level_for(cli.verbose));

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %format!("{err:#}"), "Build failed");
            ExitCode::from(exit_code_for(&err))
        }
    }
}
