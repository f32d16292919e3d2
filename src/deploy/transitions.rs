// ABOUTME: State transition methods for a deploy run.
// ABOUTME: Each method consumes self and returns the next state on success.

use snafu::ResultExt;
use tokio_util::sync::CancellationToken;

use crate::api::{DeployImageInput, ReleaseApi};
use crate::build::{ImageSources, acquire_image};
use crate::diagnostics::Diagnostics;
use crate::output::Output;
use crate::watch::ReleaseWatcher;

use super::error::{
    BuildFailedSnafu, DeployError, DeploymentWatchFailedSnafu, ReleaseCommandFailedSnafu,
    ReleaseFetchFailedSnafu, ReleaseSubmitFailedSnafu,
};
use super::rollout::Rollout;
use super::state::{ImageBuilt, Planned, Settled, Submitted};

impl Rollout<Planned> {
    /// Acquire the one image this run deploys.
    pub async fn build_image(
        self,
        sources: &ImageSources<'_>,
        cancel: &CancellationToken,
        diagnostics: &mut Diagnostics,
    ) -> Result<Rollout<ImageBuilt>, DeployError> {
        tracing::info!(app = %self.app, "acquiring image");
        let image = acquire_image(
            &self.config,
            &self.app,
            &self.options,
            sources,
            cancel,
            diagnostics,
        )
        .await
        .context(BuildFailedSnafu)?;

        tracing::info!(tag = %image.tag, "image ready");
        Ok(self.advance(|Planned| ImageBuilt { image }))
    }
}

impl Rollout<ImageBuilt> {
    /// The release request for this run's image.
    ///
    /// `--strategy` beats `deploy.strategy` and is sent uppercased; the config
    /// definition is attached only when it has content.
    pub fn release_input(&self) -> DeployImageInput {
        let strategy = self
            .options
            .strategy
            .as_deref()
            .or(self.config.deploy.strategy.as_deref())
            .filter(|s| !s.is_empty())
            .map(str::to_uppercase);

        let definition =
            (!self.config.definition.is_empty()).then(|| self.config.definition.clone());

        DeployImageInput {
            app: self.app.clone(),
            image: self.state.image.tag.clone(),
            strategy,
            definition,
        }
    }

    /// Create a release for the built image.
    pub async fn submit(
        self,
        api: &dyn ReleaseApi,
        output: &Output,
    ) -> Result<Rollout<Submitted>, DeployError> {
        output.progress("Creating release");
        let response = api
            .deploy_image(&self.release_input())
            .await
            .context(ReleaseSubmitFailedSnafu)?;

        output.detail(&format!("release v{} created", response.release.version));
        tracing::info!(release = %response.release.id, version = response.release.version, "release created");

        Ok(self.advance(|ImageBuilt { image }| Submitted {
            image,
            release: response.release,
            release_command: response.release_command,
        }))
    }
}

impl Rollout<Submitted> {
    /// Wait for the release command, if there is one, then re-read the release.
    ///
    /// The release is fetched again because the platform may change it once the
    /// command has run.
    pub async fn await_release_command(
        mut self,
        api: &dyn ReleaseApi,
        watcher: &dyn ReleaseWatcher,
        output: &Output,
    ) -> Result<Rollout<Submitted>, DeployError> {
        let Some(command) = self.state.release_command.take() else {
            return Ok(self);
        };

        output.progress(&format!("Release command detected: {}", command.command));
        output.detail("This release will not be available until the release command succeeds.");

        watcher
            .release_command(&command.id)
            .await
            .context(ReleaseCommandFailedSnafu)?;

        self.state.release = api
            .get_release(&self.app, &self.state.release.id)
            .await
            .context(ReleaseFetchFailedSnafu)?;

        Ok(self)
    }

    /// Watch the deployment unless the strategy leaves nothing to monitor.
    pub async fn dispatch(
        self,
        watcher: &dyn ReleaseWatcher,
    ) -> Result<Rollout<Settled>, DeployError> {
        let watched = self.state.release.deployment_strategy.has_rollout();

        if watched {
            watcher
                .deployment(&self.state.release.evaluation_id)
                .await
                .context(DeploymentWatchFailedSnafu)?;
        } else {
            tracing::debug!("immediate deployment strategy, nothing to monitor");
        }

        Ok(self.advance(|Submitted { image, release, .. }| Settled {
            image,
            release,
            watched,
        }))
    }
}
