// ABOUTME: Drives a deploy run through every stage of the rollout pipeline.
// ABOUTME: Stops early for build-only and detached runs.

use tokio_util::sync::CancellationToken;

use crate::api::{Release, ReleaseApi};
use crate::build::ImageSources;
use crate::config::Config;
use crate::diagnostics::Diagnostics;
use crate::output::Output;
use crate::types::{AppName, DeploymentImage};
use crate::watch::ReleaseWatcher;

use super::error::DeployError;
use super::options::DeployOptions;
use super::rollout::Rollout;

/// Collaborators a deploy run talks to.
pub struct DeployContext<'a> {
    pub sources: ImageSources<'a>,
    pub releases: &'a dyn ReleaseApi,
    pub watcher: &'a dyn ReleaseWatcher,
    pub output: &'a Output,
}

/// How far a run went before it returned.
#[derive(Debug, Clone)]
pub enum DeployOutcome {
    /// Build-only run; no release was created.
    Built(DeploymentImage),
    /// Release created and left to the platform.
    Detached(Release),
    /// Release uses a strategy with nothing to monitor.
    Immediate(Release),
    /// Deployment was monitored until it succeeded.
    Watched(Release),
}

impl DeployOutcome {
    pub fn release(&self) -> Option<&Release> {
        match self {
            DeployOutcome::Built(_) => None,
            DeployOutcome::Detached(r) | DeployOutcome::Immediate(r) | DeployOutcome::Watched(r) => {
                Some(r)
            }
        }
    }
}

/// Build, release, and follow one deploy of `app`.
pub async fn run(
    app: AppName,
    config: Config,
    options: DeployOptions,
    ctx: &DeployContext<'_>,
    cancel: &CancellationToken,
    diagnostics: &mut Diagnostics,
) -> Result<DeployOutcome, DeployError> {
    let rollout = Rollout::new(app, config, options)
        .build_image(&ctx.sources, cancel, diagnostics)
        .await?;

    if rollout.options().build_only {
        return Ok(DeployOutcome::Built(rollout.finish_build()));
    }

    let rollout = rollout.submit(ctx.releases, ctx.output).await?;

    if rollout.options().detach {
        return Ok(DeployOutcome::Detached(rollout.detach()));
    }

    ctx.output
        .detail("You can detach the terminal anytime without stopping the deployment");

    let settled = rollout
        .await_release_command(ctx.releases, ctx.watcher, ctx.output)
        .await?
        .dispatch(ctx.watcher)
        .await?;

    if settled.was_watched() {
        Ok(DeployOutcome::Watched(settled.finish()))
    } else {
        Ok(DeployOutcome::Immediate(settled.finish()))
    }
}
