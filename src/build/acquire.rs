// ABOUTME: Decides how this run gets its image: remote source build, existing reference, or docker build.
// ABOUTME: Merges build inputs from the command line and the app config before handing off.

use super::docker::{ImageOptions, ImageResolver, RefOptions};
use super::error::BuildError;
use super::remote::RemoteBuild;
use crate::config::{Config, parse_kv_pairs};
use crate::deploy::DeployOptions;
use crate::diagnostics::Diagnostics;
use crate::types::{AppName, DeploymentImage};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

/// The producers an acquisition may delegate to.
pub struct ImageSources<'a> {
    pub remote: &'a dyn RemoteBuild,
    pub resolver: &'a dyn ImageResolver,
}

/// Produce exactly one deployment image for `app`.
///
/// Order: `--nix` uses the remote builder only; an image reference (flag, then
/// config) is resolved as-is; anything else is built from source.
pub async fn acquire_image(
    config: &Config,
    app: &AppName,
    options: &DeployOptions,
    sources: &ImageSources<'_>,
    cancel: &CancellationToken,
    diagnostics: &mut Diagnostics,
) -> Result<DeploymentImage, BuildError> {
    if options.nix {
        let image = sources
            .remote
            .build(&options.working_dir, app, cancel, diagnostics)
            .await?;
        return Ok(image);
    }

    if let Some(image_ref) = fetch_image_ref(options.image.as_deref(), config) {
        tracing::info!(%image_ref, "deploying pre-built image");
        let opts = RefOptions {
            app: app.clone(),
            working_dir: options.working_dir.clone(),
            image_ref: image_ref.to_string(),
            image_label: options.image_label.clone(),
            publish: options.publish(),
        };
        return sources
            .resolver
            .resolve_reference(&opts)
            .await?
            .ok_or(BuildError::NoImageProduced);
    }

    let build = config.build.clone().unwrap_or_default();

    let mut opts = ImageOptions::new(app.clone(), &options.working_dir);
    opts.build_args = merge_build_args(&build.args, &options.build_args)?;
    opts.dockerfile = resolve_dockerfile_path(options.dockerfile.as_deref(), config)?;
    opts.target = resolve_build_target(options.build_target.as_deref(), config);
    opts.image_label = options.image_label.clone();
    opts.no_cache = options.no_cache;
    opts.publish = options.publish();
    opts.builder = build.builder.filter(|b| !b.is_empty());
    opts.buildpacks = build.buildpacks;

    sources
        .resolver
        .build_image(&opts)
        .await?
        .ok_or(BuildError::NoImageProduced)
}

/// `--image` first, then `build.image` from the config.
pub fn fetch_image_ref<'a>(flag: Option<&'a str>, config: &'a Config) -> Option<&'a str> {
    flag.filter(|r| !r.is_empty())
        .or_else(|| config.build_image())
}

/// Config build args overlaid with `--build-arg` values.
pub fn merge_build_args(
    config_args: &HashMap<String, String>,
    cli_args: &[String],
) -> Result<BTreeMap<String, String>, BuildError> {
    let cli = parse_kv_pairs(cli_args).map_err(|e| BuildError::InvalidBuildArgs(e.to_string()))?;

    let mut merged: BTreeMap<String, String> = config_args.clone().into_iter().collect();
    merged.extend(cli);
    Ok(merged)
}

/// Absolute Dockerfile path if one was given.
///
/// `--dockerfile` is taken relative to the current directory; a config path is
/// relative to the directory holding the config file.
pub fn resolve_dockerfile_path(
    flag: Option<&Path>,
    config: &Config,
) -> Result<Option<PathBuf>, BuildError> {
    let path = match (flag, config.dockerfile()) {
        (Some(path), _) if !path.as_os_str().is_empty() => path.to_path_buf(),
        (_, Some(path)) => match config.base_dir() {
            Some(base) => base.join(path),
            None => PathBuf::from(path),
        },
        _ => return Ok(None),
    };

    std::path::absolute(&path)
        .map(Some)
        .map_err(|source| BuildError::DockerfilePath { path, source })
}

/// `--build-target` beats `build.build_target`.
pub fn resolve_build_target(flag: Option<&str>, config: &Config) -> Option<String> {
    flag.filter(|t| !t.is_empty())
        .or_else(|| config.docker_build_target())
        .map(str::to_string)
}
