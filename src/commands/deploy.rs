// ABOUTME: Deploy command implementation.
// ABOUTME: Wires the platform API, tunnel, rsync, and docker into one deploy run.

use super::app::resolve_app;
use crate::cli::DeployArgs;
use chrono::Utc;
use hoist::api::ApiClient;
use hoist::build::{
    DaemonSelection, DockerResolver, ImageSources, RemoteBuilder, RsyncSync, SyncFailurePolicy,
};
use hoist::config::Settings;
use hoist::deploy::{self, DeployContext, DeployOptions, DeployOutcome};
use hoist::diagnostics::Diagnostics;
use hoist::error::{Error, Result};
use hoist::output::Output;
use hoist::tunnel::{GatewayConnector, SshShell};
use hoist::types::{TagFactory, format_size};
use hoist::watch::PollingWatcher;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub async fn deploy(args: DeployArgs, mut output: Output, cancel: CancellationToken) -> Result<()> {
    output.start_timer();

    let settings = Settings::from_env()?;
    let client = Arc::new(
        ApiClient::new(&settings.api_url, settings.api_token.clone()).map_err(Error::ApiClient)?,
    );

    let app = resolve_app(&args.app, client.as_ref()).await?;
    output.progress(&format!("Deploying {}", app.name));

    let tags = TagFactory::new(settings.registry.clone(), Utc::now())
        .with_override(settings.image_ref.clone());

    let remote = RemoteBuilder::new(
        client.clone(),
        Arc::new(GatewayConnector::from_settings(&settings)),
        Arc::new(RsyncSync::default()),
        Arc::new(SshShell::new(settings.ssh_key.clone())),
        tags.clone(),
        settings.api_token.clone(),
    )
    .sync_policy(SyncFailurePolicy::from_strict(args.strict_sync))
    .output(output.clone());

    // Docker is never touched on --nix runs, so daemon flags do not apply there
    let daemon = if args.nix {
        DaemonSelection::Local
    } else {
        DaemonSelection::choose(
            args.local_only,
            args.remote_only,
            settings.docker_host.as_deref(),
        )?
    };
    tracing::debug!(?daemon, "selected docker daemon");
    let resolver = DockerResolver::connect(daemon, tags, output.clone())?;

    let watcher = PollingWatcher::new(
        client.clone(),
        app.config.deploy.poll_interval,
        app.config.deploy.wait_timeout,
    )
    .output(output.clone());

    let ctx = DeployContext {
        sources: ImageSources {
            remote: &remote,
            resolver: &resolver,
        },
        releases: client.as_ref(),
        watcher: &watcher,
        output: &output,
    };

    let options = DeployOptions {
        working_dir: app.working_dir.clone(),
        image: args.image,
        image_label: args.image_label,
        nix: args.nix,
        build_only: args.build_only,
        detach: args.detach,
        strategy: args.strategy,
        dockerfile: args.dockerfile,
        build_args: args.build_args,
        build_target: args.build_target,
        no_cache: args.no_cache,
    };

    let mut diag = Diagnostics::default();
    let result = deploy::run(app.name.clone(), app.config, options, &ctx, &cancel, &mut diag).await;

    output.warnings(&diag);

    let outcome = result?;
    report(&outcome, &output);
    Ok(())
}

fn report(outcome: &DeployOutcome, output: &Output) {
    match outcome {
        DeployOutcome::Built(image) => {
            output.detail(&format!("image: {}", image.tag));
            output.detail(&format!("image size: {}", format_size(image.size)));
            output.success("Build complete");
        }
        DeployOutcome::Detached(release) => {
            output.success(&format!("Release v{} created, not waiting for it", release.version));
        }
        DeployOutcome::Immediate(release) | DeployOutcome::Watched(release) => {
            output.success(&format!("Release v{} deployed", release.version));
        }
    }
}
