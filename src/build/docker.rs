// ABOUTME: Docker-backed image resolution: reuse a pre-built reference or build from a Dockerfile.
// ABOUTME: Uses the daemon API for pulls and inspection, and the docker/pack CLIs for builds and pushes.

use super::error::ResolveError;
use crate::output::Output;
use crate::types::{AppName, DeploymentImage, ImageTag, TagFactory, format_size};
use async_trait::async_trait;
use bollard::Docker;
use bollard::query_parameters::CreateImageOptions;
use futures::StreamExt;
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::process::Command;

/// Options for deploying an image that already exists somewhere.
#[derive(Debug, Clone)]
pub struct RefOptions {
    pub app: AppName,
    pub working_dir: PathBuf,
    pub image_ref: String,
    pub image_label: Option<String>,
    /// Push under the deployment tag; false for build-only runs.
    pub publish: bool,
}

/// Options for building an image from source.
#[derive(Debug, Clone)]
pub struct ImageOptions {
    pub app: AppName,
    pub working_dir: PathBuf,
    pub dockerfile: Option<PathBuf>,
    pub target: Option<String>,
    pub image_label: Option<String>,
    pub no_cache: bool,
    pub publish: bool,
    pub build_args: BTreeMap<String, String>,
    pub builder: Option<String>,
    pub buildpacks: Vec<String>,
}

impl ImageOptions {
    pub fn new(app: AppName, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            app,
            working_dir: working_dir.into(),
            dockerfile: None,
            target: None,
            image_label: None,
            no_cache: false,
            publish: false,
            build_args: BTreeMap::new(),
            builder: None,
            buildpacks: Vec::new(),
        }
    }
}

/// Turns a reference or a source tree into a deployable image.
///
/// `Ok(None)` means the resolver had nothing it could build from.
#[async_trait]
pub trait ImageResolver: Send + Sync {
    async fn resolve_reference(
        &self,
        opts: &RefOptions,
    ) -> Result<Option<DeploymentImage>, ResolveError>;

    async fn build_image(&self, opts: &ImageOptions)
    -> Result<Option<DeploymentImage>, ResolveError>;
}

/// Which docker daemon builds run against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DaemonSelection {
    Local,
    Remote(String),
}

impl DaemonSelection {
    /// `--local-only` forces the local daemon; `--remote-only` requires a remote host.
    /// Otherwise a configured remote host is preferred.
    pub fn choose(
        local_only: bool,
        remote_only: bool,
        remote_host: Option<&str>,
    ) -> Result<Self, ResolveError> {
        match (local_only, remote_only, remote_host) {
            (true, true, _) => Err(ResolveError::NoDaemon(
                "--local-only and --remote-only exclude each other".to_string(),
            )),
            (true, false, _) => Ok(DaemonSelection::Local),
            (false, _, Some(host)) => Ok(DaemonSelection::Remote(host.to_string())),
            (false, true, None) => Err(ResolveError::NoDaemon(
                "--remote-only needs HOIST_DOCKER_HOST".to_string(),
            )),
            (false, false, None) => Ok(DaemonSelection::Local),
        }
    }

    fn connect(&self) -> Result<Docker, ResolveError> {
        let docker = match self {
            DaemonSelection::Local => Docker::connect_with_local_defaults()?,
            DaemonSelection::Remote(host) => match host.strip_prefix("unix://") {
                Some(socket) => {
                    Docker::connect_with_unix(socket, 120, bollard::API_DEFAULT_VERSION)?
                }
                None => Docker::connect_with_http(host, 120, bollard::API_DEFAULT_VERSION)?,
            },
        };
        Ok(docker)
    }
}

pub struct DockerResolver {
    docker: Docker,
    daemon: DaemonSelection,
    tags: TagFactory,
    output: Output,
}

impl DockerResolver {
    pub fn connect(
        daemon: DaemonSelection,
        tags: TagFactory,
        output: Output,
    ) -> Result<Self, ResolveError> {
        let docker = daemon.connect()?;
        Ok(Self {
            docker,
            daemon,
            tags,
            output,
        })
    }

    /// Image id and size, or `None` if the daemon does not have it.
    async fn inspect(&self, reference: &str) -> Result<Option<(String, u64)>, ResolveError> {
        match self.docker.inspect_image(reference).await {
            Ok(image) => Ok(Some((
                image.id.unwrap_or_else(|| reference.to_string()),
                image.size.and_then(|s| u64::try_from(s).ok()).unwrap_or(0),
            ))),
            Err(bollard::errors::Error::DockerResponseServerError {
                status_code: 404, ..
            }) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn pull(&self, reference: &str) -> Result<(), ResolveError> {
        let opts = CreateImageOptions {
            from_image: Some(reference.to_string()),
            ..Default::default()
        };

        // Pull returns a stream of progress updates - consume it
        let mut stream = self.docker.create_image(Some(opts), None, None);
        while let Some(result) = stream.next().await {
            result.map_err(|source| ResolveError::Pull {
                reference: reference.to_string(),
                source,
            })?;
        }
        Ok(())
    }

    async fn cli(&self, program: &str, args: Vec<OsString>) -> Result<(), ResolveError> {
        let rendered = format!(
            "{program} {}",
            args.iter()
                .map(|a| a.to_string_lossy())
                .collect::<Vec<_>>()
                .join(" ")
        );
        tracing::debug!(command = %rendered, "running");

        let mut command = Command::new(program);
        command.args(&args);
        if let DaemonSelection::Remote(host) = &self.daemon {
            command.env("DOCKER_HOST", host);
        }

        let status = command
            .status()
            .await
            .map_err(|source| ResolveError::Spawn {
                program: program.to_string(),
                source,
            })?;

        if status.success() {
            Ok(())
        } else {
            Err(ResolveError::CommandFailed {
                command: rendered,
                status,
            })
        }
    }

    async fn described(&self, tag: &str) -> Result<DeploymentImage, ResolveError> {
        let (id, size) = self
            .inspect(tag)
            .await?
            .ok_or_else(|| ResolveError::MissingImage(tag.to_string()))?;

        self.output.detail(&format!("image: {tag}"));
        self.output.detail(&format!("image size: {}", format_size(size)));

        Ok(DeploymentImage {
            tag: ImageTag::new(tag),
            id,
            size,
        })
    }
}

#[async_trait]
impl ImageResolver for DockerResolver {
    async fn resolve_reference(
        &self,
        opts: &RefOptions,
    ) -> Result<Option<DeploymentImage>, ResolveError> {
        self.output
            .progress(&format!("Searching for image '{}'", opts.image_ref));

        if self.inspect(&opts.image_ref).await?.is_none() {
            self.pull(&opts.image_ref).await?;
        }

        if !opts.publish {
            return self.described(&opts.image_ref).await.map(Some);
        }

        let tag = self.tags.tag(&opts.app, opts.image_label.as_deref());
        self.cli(
            "docker",
            vec!["tag".into(), opts.image_ref.clone().into(), tag.to_string().into()],
        )
        .await?;
        self.cli("docker", vec!["push".into(), tag.to_string().into()])
            .await?;

        self.described(tag.as_str()).await.map(Some)
    }

    async fn build_image(
        &self,
        opts: &ImageOptions,
    ) -> Result<Option<DeploymentImage>, ResolveError> {
        let tag = self.tags.tag(&opts.app, opts.image_label.as_deref());

        if let Some(builder) = &opts.builder {
            self.output
                .progress(&format!("Building image with buildpacks ({builder})"));
            self.cli("pack", pack_args(opts, builder, tag.as_str())).await?;
        } else {
            let Some(dockerfile) = dockerfile_for(opts) else {
                tracing::debug!(dir = %opts.working_dir.display(), "no Dockerfile found");
                return Ok(None);
            };
            self.output.progress("Building image with Docker");
            self.cli("docker", docker_build_args(opts, &dockerfile, tag.as_str()))
                .await?;
        }

        if opts.publish {
            self.output.progress(&format!("Pushing image {tag}"));
            self.cli("docker", vec!["push".into(), tag.to_string().into()])
                .await?;
        }

        self.described(tag.as_str()).await.map(Some)
    }
}

/// The explicit Dockerfile, or `Dockerfile` in the working directory if present.
fn dockerfile_for(opts: &ImageOptions) -> Option<PathBuf> {
    if let Some(path) = &opts.dockerfile {
        return Some(path.clone());
    }
    let default = opts.working_dir.join("Dockerfile");
    default.is_file().then_some(default)
}

pub fn docker_build_args(opts: &ImageOptions, dockerfile: &Path, tag: &str) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![
        "build".into(),
        "--tag".into(),
        tag.into(),
        "--file".into(),
        dockerfile.into(),
    ];

    if let Some(target) = &opts.target {
        args.push("--target".into());
        args.push(target.into());
    }
    if opts.no_cache {
        args.push("--no-cache".into());
    }
    for (name, value) in &opts.build_args {
        args.push("--build-arg".into());
        args.push(format!("{name}={value}").into());
    }

    args.push(opts.working_dir.as_os_str().to_owned());
    args
}

fn pack_args(opts: &ImageOptions, builder: &str, tag: &str) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![
        "build".into(),
        tag.into(),
        "--builder".into(),
        builder.into(),
        "--path".into(),
        opts.working_dir.as_os_str().to_owned(),
    ];
    for buildpack in &opts.buildpacks {
        args.push("--buildpack".into());
        args.push(buildpack.into());
    }
    for (name, value) in &opts.build_args {
        args.push("--env".into());
        args.push(format!("{name}={value}").into());
    }
    if opts.no_cache {
        args.push("--clear-cache".into());
    }
    args
}
